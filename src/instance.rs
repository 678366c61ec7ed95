//! This module defines an abstract representation of a MCMND instance.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};

/// One origin-destination pair with its flow volume requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    pub orig: usize,
    pub dest: usize,
    pub volume: u64,
}

/// A generated network design instance: node geometry, topology and demands.
///
/// Populated by one generation run and consumed once by the formulation
/// builder; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdpInstance {
    pub nb_nodes: usize,
    /// The node coordinates, rounded to the configured precision
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Euclidean distance for every ordered pair, adjacent or not
    pub distance: Vec<Vec<f64>>,
    /// Symmetric adjacency with a zero diagonal
    pub adjacency: Vec<Vec<bool>>,
    /// The number of undirected edges
    pub nb_arcs: usize,
    /// The degree each node aims for while initiating edges
    pub degree_target: Vec<usize>,
    /// The degree each node ended up with, counting edges from both sides
    pub degree_actual: Vec<usize>,
    pub commodities: Vec<Commodity>,
    /// The sum of all commodity volumes
    pub total_demand: u64,
}

impl NdpInstance {
    /// Breadth-first traversal over the adjacency matrix; true iff every
    /// node is reachable from the given root.
    pub fn connected_from(&self, root: usize) -> bool {
        if self.nb_nodes == 0 {
            return true;
        }
        let mut reached = vec![false; self.nb_nodes];
        reached[root] = true;
        let mut nb_reached = 1;
        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            for next in 0..self.nb_nodes {
                if self.adjacency[node][next] && !reached[next] {
                    reached[next] = true;
                    nb_reached += 1;
                    queue.push_back(next);
                }
            }
        }
        nb_reached == self.nb_nodes
    }
}

/// Rounds to the given number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10_f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// The full pairwise Euclidean distance matrix, rounded to the given
/// precision.
pub fn distances(x: &[f64], y: &[f64], decimals: u32) -> Vec<Vec<f64>> {
    let n = x.len();
    let mut distance = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            let d = ((x[i] - x[j]).powi(2) + (y[i] - y[j]).powi(2)).sqrt();
            distance[i][j] = round_to(d, decimals);
        }
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_instance(n: usize) -> NdpInstance {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y = vec![0.0; n];
        let mut adjacency = vec![vec![false; n]; n];
        for i in 0..n.saturating_sub(1) {
            adjacency[i][i + 1] = true;
            adjacency[i + 1][i] = true;
        }
        NdpInstance {
            nb_nodes: n,
            distance: distances(&x, &y, 2),
            x,
            y,
            adjacency,
            nb_arcs: n.saturating_sub(1),
            degree_target: vec![2; n],
            degree_actual: vec![2; n],
            commodities: vec![],
            total_demand: 0,
        }
    }

    #[test]
    fn distance_of_known_pair() {
        let d = distances(&[0.0, 3.0], &[0.0, 4.0], 2);
        assert_eq!(d[0][1], 5.0);
        assert_eq!(d[1][0], 5.0);
        assert_eq!(d[0][0], 0.0);
    }

    #[test]
    fn distance_matrix_rebuild_matches() {
        let x = vec![12.34, 0.07, 99.9, 45.0];
        let y = vec![4.5, 88.88, 0.01, 45.0];
        let first = distances(&x, &y, 2);
        let second = distances(&x, &y, 2);
        for i in 0..4 {
            for j in 0..4 {
                assert!((first[i][j] - second[i][j]).abs() <= 1e-4);
            }
        }
    }

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(10.0, 2), 10.0);
        assert_eq!(round_to(0.005, 2), 0.01);
    }

    #[test]
    fn path_is_connected_from_every_root() {
        let instance = path_instance(5);
        for root in 0..5 {
            assert!(instance.connected_from(root));
        }
    }

    #[test]
    fn split_graph_is_not_connected() {
        let mut instance = path_instance(5);
        instance.adjacency[2][3] = false;
        instance.adjacency[3][2] = false;
        assert!(!instance.connected_from(0));
        assert!(!instance.connected_from(4));
    }
}
