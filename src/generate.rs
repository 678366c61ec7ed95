use std::{time::{SystemTime, UNIX_EPOCH}, collections::HashSet, fs::{self, File}, path::PathBuf};

use clap::Args;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rand_distr::{Uniform, Distribution};
use thiserror::Error;

use crate::formulation::{build_model, ModuleTable, Orientation};
use crate::instance::{distances, round_to, Commodity, NdpInstance};

/// Failures of the randomized instance construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Every topology attempt came out disconnected.
    #[error("no connected topology found after {attempts} attempts")]
    Exhausted { attempts: usize },
    /// More commodities requested than distinct ordered node pairs exist.
    #[error("{requested} commodities requested but only {available} distinct ordered pairs exist")]
    TooManyCommodities { requested: usize, available: usize },
}

/// Anything that can go wrong while generating and exporting one instance.
#[derive(Debug, Error)]
pub enum NdpError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize instance: {0}")]
    Json(#[from] serde_json::Error),
    #[error("capacities and costs must list one entry per module")]
    MismatchedModuleTable,
}

#[derive(Debug, Args)]
pub struct NdpGenerator {
    /// An optional seed to kickstart the instance generation
    #[clap(short='s', long)]
    pub seed: Option<u128>,
    /// The number of nodes
    #[clap(short='n', long, default_value="50")]
    pub nb_nodes: usize,
    /// The number of commodities, i.e. origin-destination demand pairs
    #[clap(short='c', long, default_value="50")]
    pub nb_commodities: usize,
    /// The side length of the square region nodes are placed in
    #[clap(short='r', long, default_value="100.0")]
    pub region_size: f64,
    /// The smallest volume a commodity may request
    #[clap(long, default_value="10")]
    pub demand_lb: u64,
    /// The largest volume a commodity may request
    #[clap(long, default_value="190")]
    pub demand_ub: u64,
    /// The number of decimals kept for coordinates and distances
    #[clap(long, default_value="2")]
    pub precision: u32,
    /// The number of topology attempts before giving up
    #[clap(long, default_value="1000")]
    pub max_attempts: usize,
    /// The capacity provided by each module size
    #[clap(short='u', long, value_delimiter=',', default_value="10000")]
    pub capacities: Vec<u64>,
    /// The installation cost of each module size
    #[clap(long, value_delimiter=',', default_value="130")]
    pub costs: Vec<u64>,
    /// The edge-orientation semantics of the formulation
    #[clap(short='m', long, value_enum, default_value="directed")]
    pub mode: Orientation,
    /// The cost-table index encoded in the instance name
    #[clap(long, default_value="0")]
    pub cost_index: usize,
    /// The capacity-table index encoded in the instance name
    #[clap(long, default_value="0")]
    pub capacity_index: usize,
    /// The replicate index encoded in the instance name
    #[clap(long, default_value="0")]
    pub replicate: usize,
    /// The directory under which the per-mode output directory is created
    #[clap(short='o', long, default_value=".")]
    pub output: PathBuf,
    /// If present, the path where to also dump the instance as JSON
    #[clap(long)]
    pub dump_instance: Option<PathBuf>,
}

impl NdpGenerator {

    /// Generates one instance, formulates it and writes the gzipped MPS
    /// file; returns the path of the written file.
    pub fn run(&self) -> Result<PathBuf, NdpError> {
        if self.capacities.len() != self.costs.len() {
            return Err(NdpError::MismatchedModuleTable);
        }
        let mut rng = self.rng();
        let instance = self.generate(&mut rng)?;

        if let Some(path) = self.dump_instance.as_ref() {
            serde_json::to_writer_pretty(File::create(path)?, &instance)?;
        }

        let modules = ModuleTable {
            capacities: self.capacities.clone(),
            costs: self.costs.clone(),
        };
        let name = format!(
            "ndp_{}_{}_{}_{}_{}",
            self.nb_nodes,
            modules.nb_modules(),
            self.cost_index,
            self.capacity_index,
            self.replicate,
        );
        let model = build_model(&instance, &modules, self.mode, &name);
        debug!(
            "{}: {} variables, {} constraints",
            model.name(),
            model.nb_vars(),
            model.nb_constraints(),
        );

        let dir = self.output.join(self.mode.dir_name());
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{name}.mps.gz"));
        model.write_mps_gz(&path)?;
        info!("wrote {}", path.display());
        Ok(path)
    }

    /// Draws connected topologies by rejection sampling, then samples the
    /// commodity demands.
    pub fn generate(&self, rng: &mut impl Rng) -> Result<NdpInstance, GenerationError> {
        let available = self.nb_nodes * self.nb_nodes.saturating_sub(1);
        if self.nb_commodities > available {
            return Err(GenerationError::TooManyCommodities {
                requested: self.nb_commodities,
                available,
            });
        }

        for attempt in 0..self.max_attempts {
            let mut instance = self.topology(rng);
            if !instance.connected_from(0) {
                debug!("attempt {}: topology disconnected, retrying", attempt + 1);
                continue;
            }
            let (commodities, total_demand) = self.demands(rng);
            instance.commodities = commodities;
            instance.total_demand = total_demand;
            return Ok(instance);
        }
        Err(GenerationError::Exhausted { attempts: self.max_attempts })
    }

    /// One topology attempt: random geometry plus greedy nearest-neighbor
    /// edges. The result may be disconnected; the caller decides.
    fn topology(&self, rng: &mut impl Rng) -> NdpInstance {
        let n = self.nb_nodes;
        let coord = Uniform::new_inclusive(0.0, self.region_size);
        let die = Uniform::new_inclusive(1, 10);

        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        let mut degree_target = Vec::with_capacity(n);
        for _ in 0..n {
            x.push(round_to(coord.sample(rng), self.precision));
            y.push(round_to(coord.sample(rng), self.precision));
            degree_target.push(match die.sample(rng) {
                1..=2 => 2,
                3..=5 => 3,
                6..=8 => 4,
                _ => 5,
            });
        }

        let distance = distances(&x, &y, self.precision);

        let mut adjacency = vec![vec![false; n]; n];
        let mut degree_actual = vec![0; n];
        let mut nb_arcs = 0;
        for i in 0..n {
            // candidates by ascending distance, ties by index
            let mut near: Vec<usize> = (0..n).collect();
            near.sort_by(|&a, &b| distance[i][a].total_cmp(&distance[i][b]));

            // a node only initiates edges until it has added its own target
            // number, whatever degree it already received from others
            let mut added = 0;
            for &j in near.iter() {
                if added == degree_target[i] {
                    break;
                }
                if j != i && !adjacency[i][j] {
                    adjacency[i][j] = true;
                    adjacency[j][i] = true;
                    degree_actual[i] += 1;
                    degree_actual[j] += 1;
                    nb_arcs += 1;
                    added += 1;
                }
            }
        }

        NdpInstance {
            nb_nodes: n,
            x,
            y,
            distance,
            adjacency,
            nb_arcs,
            degree_target,
            degree_actual,
            commodities: vec![],
            total_demand: 0,
        }
    }

    /// Draws distinct ordered origin-destination pairs by rejection until
    /// the requested commodity count is reached.
    fn demands(&self, rng: &mut impl Rng) -> (Vec<Commodity>, u64) {
        if self.nb_commodities == 0 {
            return (vec![], 0);
        }
        let node = Uniform::new(0, self.nb_nodes);
        let volume = Uniform::new_inclusive(self.demand_lb, self.demand_ub);

        let mut used = HashSet::new();
        let mut commodities = Vec::with_capacity(self.nb_commodities);
        let mut total_demand = 0;
        while commodities.len() < self.nb_commodities {
            let orig = node.sample(rng);
            let dest = node.sample(rng);
            if orig == dest || !used.insert((orig, dest)) {
                continue;
            }
            let volume = volume.sample(rng);
            total_demand += volume;
            commodities.push(Commodity { orig, dest, volume });
        }
        (commodities, total_demand)
    }

    pub fn rng(&self) -> impl Rng {
        let init = self.seed.unwrap_or_else(|| SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis());
        let mut seed = [0_u8; 32];
        seed.iter_mut().zip(init.to_be_bytes().into_iter()).for_each(|(s, i)| *s = i);
        seed.iter_mut().rev().zip(init.to_le_bytes().into_iter()).for_each(|(s, i)| *s = i);
        ChaChaRng::from_seed(seed)
    }

}
