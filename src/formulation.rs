//! MIP formulation of one MCMND instance: flow, module-installation and
//! aggregate-flow variables tied together by flow-conservation, capacity and
//! facility constraints under one of three edge-orientation modes.

use clap::ValueEnum;

use crate::instance::NdpInstance;
use crate::mps::{LinExpr, Model, Sense, Var};

/// Governs whether arc capacity is tracked per ordered pair, per unordered
/// pair, or per ordered pair sharing one installation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Orientation {
    Directed,
    Undirected,
    Bidirected,
}

impl Orientation {
    /// The directory instances of this mode are placed under.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Orientation::Directed => "directed",
            Orientation::Undirected => "undirected",
            Orientation::Bidirected => "bidirected",
        }
    }
}

/// The purchasable capacity modules for one formulation: module k provides
/// `capacities[k]` units of arc capacity at cost `costs[k]`.
#[derive(Debug, Clone)]
pub struct ModuleTable {
    pub capacities: Vec<u64>,
    pub costs: Vec<u64>,
}

impl ModuleTable {
    pub fn nb_modules(&self) -> usize {
        self.capacities.len()
    }
}

/// Builds the complete MIP for one generated instance.
///
/// Variables are only declared on adjacent arcs and commodities with
/// non-zero demand; variables on other index combinations would never be
/// referenced by a constraint and would be stripped from the exchange file
/// anyway.
pub fn build_model(
    instance: &NdpInstance,
    modules: &ModuleTable,
    orientation: Orientation,
    name: &str,
) -> Model {
    let n = instance.nb_nodes;
    let sd = instance.total_demand;
    let mut model = Model::new(name);

    // adjacent ordered pairs, and their positions for reverse lookup
    let mut arcs = vec![];
    let mut arc_index = vec![vec![usize::MAX; n]; n];
    for i in 0..n {
        for j in 0..n {
            if instance.adjacency[i][j] {
                arc_index[i][j] = arcs.len();
                arcs.push((i, j));
            }
        }
    }

    // module and aggregate-flow variables live on ordered arcs in directed
    // mode and on unordered edges otherwise
    let carriers: Vec<(usize, usize)> = match orientation {
        Orientation::Directed => arcs.clone(),
        _ => arcs.iter().copied().filter(|&(i, j)| i < j).collect(),
    };

    // f[c][a]: flow of commodity c on arc a
    let f: Vec<Vec<Var>> = instance
        .commodities
        .iter()
        .map(|c| {
            arcs.iter()
                .map(|&(i, j)| {
                    model.add_var(
                        0.0,
                        c.volume as f64,
                        format!("f_{}_{}_{}_{}", i, j, c.orig, c.dest),
                    )
                })
                .collect()
        })
        .collect();

    // y[e][k]: number of modules of size k installed on carrier e, bounded
    // by the module count needed to route every demand over one arc
    let y: Vec<Vec<Var>> = carriers
        .iter()
        .map(|&(i, j)| {
            (0..modules.nb_modules())
                .map(|k| {
                    let ub = sd.div_ceil(modules.capacities[k]);
                    model.add_int_var(0.0, ub as f64, format!("y_{}_{}_{}", i, j, k))
                })
                .collect()
        })
        .collect();

    // flow[e]: aggregate flow routed over carrier e
    let flow: Vec<Var> = carriers
        .iter()
        .map(|&(i, j)| model.add_var(0.0, sd as f64, format!("flow_{}_{}", i, j)))
        .collect();

    // objective: installation cost plus floor(distance) per unit of
    // aggregate flow, over adjacent carriers
    let mut objective = LinExpr::new();
    for (e, &(i, j)) in carriers.iter().enumerate() {
        for k in 0..modules.nb_modules() {
            objective.add(y[e][k], modules.costs[k] as f64);
        }
        objective.add(flow[e], instance.distance[i][j].floor());
    }
    model.minimize(objective);

    // flow conservation: net outflow is +volume at the origin, -volume at
    // the destination and 0 elsewhere
    for (c, commodity) in instance.commodities.iter().enumerate() {
        for i in 0..n {
            let mut balance = LinExpr::new();
            for j in 0..n {
                if instance.adjacency[i][j] {
                    balance.add(f[c][arc_index[i][j]], 1.0);
                    balance.add(f[c][arc_index[j][i]], -1.0);
                }
            }
            let rhs = if i == commodity.orig {
                commodity.volume as f64
            } else if i == commodity.dest {
                -(commodity.volume as f64)
            } else {
                0.0
            };
            let name = format!("node_{}_{}_{}", i, commodity.orig, commodity.dest);
            model.add_constr(balance, Sense::Eq, rhs, name);
        }
    }

    // capacity and facility constraints per carrier
    for (e, &(i, j)) in carriers.iter().enumerate() {
        match orientation {
            Orientation::Directed => {
                let mut capa = directed_load(&f, arc_index[i][j]);
                capa.add(flow[e], -1.0);
                model.add_constr(capa, Sense::Le, 0.0, format!("capa_{}_{}", i, j));
            }
            Orientation::Undirected => {
                let mut capa = directed_load(&f, arc_index[i][j]);
                for row in f.iter() {
                    capa.add(row[arc_index[j][i]], 1.0);
                }
                capa.add(flow[e], -1.0);
                model.add_constr(capa, Sense::Le, 0.0, format!("capa_{}_{}", i, j));
            }
            Orientation::Bidirected => {
                // both directions share the same aggregate variable
                let mut forward = directed_load(&f, arc_index[i][j]);
                forward.add(flow[e], -1.0);
                model.add_constr(forward, Sense::Le, 0.0, format!("capa_{}_{}", i, j));
                let mut backward = directed_load(&f, arc_index[j][i]);
                backward.add(flow[e], -1.0);
                model.add_constr(backward, Sense::Le, 0.0, format!("capa_{}_{}", j, i));
            }
        }
        let mut facility = LinExpr::new();
        facility.add(flow[e], 1.0);
        for k in 0..modules.nb_modules() {
            facility.add(y[e][k], -(modules.capacities[k] as f64));
        }
        model.add_constr(facility, Sense::Le, 0.0, format!("facility_{}_{}", i, j));
    }

    model
}

/// Sum of every commodity's flow on one arc.
fn directed_load(f: &[Vec<Var>], arc: usize) -> LinExpr {
    let mut load = LinExpr::new();
    for row in f.iter() {
        load.add(row[arc], 1.0);
    }
    load
}

#[cfg(test)]
mod tests {
    use crate::instance::{distances, Commodity, NdpInstance};

    use super::*;

    /// Four nodes chained 0-1-2-3 with one commodity of volume 50 from one
    /// endpoint to the other.
    fn chain_instance() -> NdpInstance {
        let n = 4;
        let x = vec![0.0, 10.5, 21.0, 31.5];
        let y = vec![0.0; n];
        let mut adjacency = vec![vec![false; n]; n];
        for i in 0..n - 1 {
            adjacency[i][i + 1] = true;
            adjacency[i + 1][i] = true;
        }
        NdpInstance {
            nb_nodes: n,
            distance: distances(&x, &y, 2),
            x,
            y,
            adjacency,
            nb_arcs: n - 1,
            degree_target: vec![2; n],
            degree_actual: vec![1, 2, 2, 1],
            commodities: vec![Commodity { orig: 0, dest: 3, volume: 50 }],
            total_demand: 50,
        }
    }

    fn single_module() -> ModuleTable {
        ModuleTable { capacities: vec![100], costs: vec![10] }
    }

    fn count_prefix(model: &Model, prefix: &str) -> usize {
        model.constraint_names().filter(|n| n.starts_with(prefix)).count()
    }

    #[test]
    fn conservation_count_is_commodities_times_nodes() {
        let instance = chain_instance();
        let model = build_model(&instance, &single_module(), Orientation::Directed, "t");
        assert_eq!(count_prefix(&model, "node_"), instance.commodities.len() * 4);
    }

    #[test]
    fn directed_chain_scenario() {
        let instance = chain_instance();
        let model = build_model(&instance, &single_module(), Orientation::Directed, "t");

        // one module of capacity 100 suffices for the whole demand of 50
        for (i, j) in [(0, 1), (1, 0), (1, 2), (2, 1), (2, 3), (3, 2)] {
            let y = model.var(&format!("y_{}_{}_0", i, j)).unwrap();
            assert!(model.is_integer(y));
            assert_eq!(model.bounds(y), (0.0, 1.0));
            assert_eq!(model.objective_coeff(y), 10.0);
        }

        // per-unit routing cost is the floored distance
        let flow = model.var("flow_0_1").unwrap();
        assert_eq!(model.objective_coeff(flow), 10.0);
        assert_eq!(model.bounds(flow), (0.0, 50.0));

        // flow variables are bounded by the commodity volume
        let f = model.var("f_0_1_0_3").unwrap();
        assert_eq!(model.bounds(f), (0.0, 50.0));

        // each ordered adjacent pair carries one capacity and one facility
        // constraint
        assert_eq!(count_prefix(&model, "capa_"), 6);
        assert_eq!(count_prefix(&model, "facility_"), 6);
    }

    #[test]
    fn routing_the_chain_satisfies_conservation() {
        let instance = chain_instance();
        let model = build_model(&instance, &single_module(), Orientation::Directed, "t");

        // 50 units on each forward arc of the chain, nothing elsewhere
        let value = |name: &str| -> f64 {
            match name {
                "f_0_1_0_3" | "f_1_2_0_3" | "f_2_3_0_3" => 50.0,
                _ => 0.0,
            }
        };
        for i in 0..4 {
            let name = format!("node_{}_0_3", i);
            let (terms, sense, rhs) = model.constraint(&name).unwrap();
            assert_eq!(sense, Sense::Eq);
            let lhs: f64 = terms
                .iter()
                .map(|(var, coeff)| coeff * value(model.var_name(*var)))
                .sum();
            assert_eq!(lhs, rhs, "conservation violated at node {i}");
        }
    }

    #[test]
    fn undirected_pair_gets_one_capacity_and_one_facility_constraint() {
        let instance = chain_instance();
        let model = build_model(&instance, &single_module(), Orientation::Undirected, "t");

        // 3 edges, one constraint of each kind per edge
        assert_eq!(count_prefix(&model, "capa_"), 3);
        assert_eq!(count_prefix(&model, "facility_"), 3);
        assert!(model.constraint("capa_0_1").is_some());
        assert!(model.constraint("capa_1_0").is_none());

        // both directions appear in the single capacity constraint
        let (terms, _, _) = model.constraint("capa_0_1").unwrap();
        let names: Vec<&str> = terms.iter().map(|(v, _)| model.var_name(*v)).collect();
        assert!(names.contains(&"f_0_1_0_3"));
        assert!(names.contains(&"f_1_0_0_3"));

        // module variables exist per edge, not per ordered pair
        assert!(model.var("y_0_1_0").is_some());
        assert!(model.var("y_1_0_0").is_none());
    }

    #[test]
    fn bidirected_pair_gets_two_capacity_constraints_sharing_one_facility() {
        let instance = chain_instance();
        let model = build_model(&instance, &single_module(), Orientation::Bidirected, "t");

        assert_eq!(count_prefix(&model, "capa_"), 6);
        assert_eq!(count_prefix(&model, "facility_"), 3);

        // the two directions are bounded by the same aggregate variable
        let flow = model.var("flow_0_1").unwrap();
        for name in ["capa_0_1", "capa_1_0"] {
            let (terms, _, _) = model.constraint(name).unwrap();
            assert!(terms.contains(&(flow, -1.0)), "{name} must bound flow_0_1");
        }
        assert!(model.var("flow_1_0").is_none());

        // the shared facility constraint links the aggregate to the modules
        let y = model.var("y_0_1_0").unwrap();
        let (terms, sense, rhs) = model.constraint("facility_0_1").unwrap();
        assert_eq!(sense, Sense::Le);
        assert_eq!(rhs, 0.0);
        assert!(terms.contains(&(flow, 1.0)));
        assert!(terms.contains(&(y, -100.0)));
    }
}
