//! The benchmark sweep: enumerates every combination of orientation mode,
//! graph size, module count, cost table, capacity table and replicate, and
//! generates one instance file per combination.

use std::path::PathBuf;

use clap::Args;
use log::info;

use crate::formulation::Orientation;
use crate::generate::{NdpError, NdpGenerator};

/// The built-in cost tables for a given module count, one row per table.
fn cost_tables(nb_modules: usize) -> [&'static [u64]; 3] {
    match nb_modules {
        1 => [&[130], &[170], &[200]],
        2 => [&[130, 50], &[170, 70], &[200, 80]],
        _ => [&[130, 50, 20], &[170, 70, 30], &[200, 80, 30]],
    }
}

/// The built-in capacity tables for a given module count.
fn capacity_tables(nb_modules: usize) -> [&'static [u64]; 3] {
    match nb_modules {
        1 => [&[10000], &[18000], &[25000]],
        2 => [&[10000, 5000], &[18000, 9000], &[25000, 13000]],
        _ => [&[10000, 5000, 2500], &[18000, 9000, 5000], &[25000, 13000, 9000]],
    }
}

#[derive(Debug, Args)]
pub struct Sweep {
    /// The base seed; each combination derives its own seed from it
    #[clap(short='s', long, default_value="0")]
    pub seed: u128,
    /// The graph sizes to sweep over
    #[clap(short='n', long, value_delimiter=',', default_value="50")]
    pub nodes: Vec<usize>,
    /// The number of commodities per instance
    #[clap(short='c', long, default_value="50")]
    pub nb_commodities: usize,
    /// The number of replicates per combination
    #[clap(long, default_value="3")]
    pub replicates: usize,
    /// The directory the per-mode output directories are created under
    #[clap(short='o', long, default_value="instances")]
    pub output: PathBuf,
}

impl Sweep {

    pub fn run(&self) -> Result<(), NdpError> {
        let modes = [Orientation::Directed, Orientation::Undirected, Orientation::Bidirected];
        let mut combination: u128 = 0;
        for mode in modes {
            info!("{}", mode.dir_name());
            for &nb_nodes in self.nodes.iter() {
                for nb_modules in 1..=3 {
                    let costs = cost_tables(nb_modules);
                    let capacities = capacity_tables(nb_modules);
                    for (cost_index, cost_row) in costs.iter().enumerate() {
                        for (capacity_index, capacity_row) in capacities.iter().enumerate() {
                            for replicate in 0..self.replicates {
                                info!(
                                    "graph size: {}, modules: {}, cost idx: {}, capacity idx: {}, replicate: {}",
                                    nb_nodes, nb_modules, cost_index, capacity_index, replicate,
                                );
                                let generator = NdpGenerator {
                                    seed: Some(self.seed.wrapping_add(combination)),
                                    nb_nodes,
                                    nb_commodities: self.nb_commodities,
                                    region_size: 100.0,
                                    demand_lb: 10,
                                    demand_ub: 190,
                                    precision: 2,
                                    max_attempts: 1000,
                                    capacities: capacity_row.to_vec(),
                                    costs: cost_row.to_vec(),
                                    mode,
                                    cost_index,
                                    capacity_index,
                                    replicate,
                                    output: self.output.clone(),
                                    dump_instance: None,
                                };
                                generator.run()?;
                                combination += 1;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

}
