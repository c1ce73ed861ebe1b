//! Example Graphs
//!
//! Small graph families used to test and benchmark the matching engine. These are not
//! optimized in any way; they exist to exercise known matching cardinalities (paths,
//! odd cycles, cliques, the Petersen graph) and to generate reproducible random inputs.

use super::csr_graph::*;
use super::util::*;
use crate::rand_xoshiro::rand_core::SeedableRng;

/// build a CSR graph from an undirected edge list; every edge is inserted in both directions
#[allow(clippy::unnecessary_cast)]
pub fn csr_from_edges(vertex_num: VertexNum, edges: &[(VertexIndex, VertexIndex)]) -> CsrGraph {
    let vertex_num = vertex_num as usize;
    let mut adjacency: Vec<Vec<VertexIndex>> = vec![Vec::new(); vertex_num];
    for &(left, right) in edges.iter() {
        assert!((left as usize) < vertex_num && (right as usize) < vertex_num, "edge ({}, {}) out of range", left, right);
        adjacency[left as usize].push(right);
        adjacency[right as usize].push(left);
    }
    let mut row_offsets = Vec::with_capacity(vertex_num + 1);
    let mut col_indices = Vec::with_capacity(2 * edges.len());
    row_offsets.push(0);
    for neighbors in adjacency.iter_mut() {
        neighbors.sort_unstable();
        col_indices.extend_from_slice(neighbors);
        row_offsets.push(col_indices.len() as EdgeIndex);
    }
    CsrGraph::new(row_offsets, col_indices).expect("edge list produced an invalid CSR")
}

pub fn edgeless_graph(vertex_num: VertexNum) -> CsrGraph {
    csr_from_edges(vertex_num, &[])
}

/// path 0 - 1 - ... - (n-1)
pub fn path_graph(vertex_num: VertexNum) -> CsrGraph {
    let edges: Vec<_> = (1..vertex_num).map(|vertex_index| (vertex_index - 1, vertex_index)).collect();
    csr_from_edges(vertex_num, &edges)
}

/// cycle 0 - 1 - ... - (n-1) - 0
pub fn cycle_graph(vertex_num: VertexNum) -> CsrGraph {
    assert!(vertex_num >= 3, "cycle requires at least 3 vertices");
    let edges: Vec<_> = (0..vertex_num)
        .map(|vertex_index| (vertex_index, (vertex_index + 1) % vertex_num))
        .collect();
    csr_from_edges(vertex_num, &edges)
}

pub fn complete_graph(vertex_num: VertexNum) -> CsrGraph {
    let mut edges = Vec::new();
    for left in 0..vertex_num {
        for right in left + 1..vertex_num {
            edges.push((left, right));
        }
    }
    csr_from_edges(vertex_num, &edges)
}

/// two disjoint triangles {0, 1, 2} and {3, 4, 5}
pub fn two_triangles() -> CsrGraph {
    csr_from_edges(6, &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)])
}

/// two triangles sharing the bridge 2 - 3
pub fn bowtie() -> CsrGraph {
    csr_from_edges(6, &[(0, 1), (1, 2), (0, 2), (2, 3), (3, 4), (4, 5), (3, 5)])
}

/// the Petersen graph: outer C5, inner pentagram, five spokes; it has a perfect matching
pub fn petersen_graph() -> CsrGraph {
    let mut edges = Vec::with_capacity(15);
    for vertex_index in 0..5 {
        edges.push((vertex_index, (vertex_index + 1) % 5));
        edges.push((vertex_index, vertex_index + 5));
        edges.push((vertex_index + 5, (vertex_index + 2) % 5 + 5));
    }
    csr_from_edges(10, &edges)
}

/// Erdos-Renyi style random graph with deterministic seeding
pub fn random_graph(vertex_num: VertexNum, edge_probability: f64, seed: u64) -> CsrGraph {
    let mut rng = DeterministicRng::seed_from_u64(seed);
    let mut edges = Vec::new();
    for left in 0..vertex_num {
        for right in left + 1..vertex_num {
            if rng.next_f64() < edge_probability {
                edges.push((left, right));
            }
        }
    }
    csr_from_edges(vertex_num, &edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_graphs_shapes() {  // cargo test example_graphs_shapes -- --nocapture
        let path = path_graph(4);
        assert_eq!(path.num_edges(), 3);
        path.sanity_check().unwrap();
        let cycle = cycle_graph(5);
        assert_eq!(cycle.num_edges(), 5);
        assert_eq!(cycle.neighbors(0), &[1, 4]);
        let complete = complete_graph(6);
        assert_eq!(complete.num_edges(), 15);
        let petersen = petersen_graph();
        assert_eq!(petersen.num_vertices(), 10);
        assert_eq!(petersen.num_edges(), 15);
        petersen.sanity_check().unwrap();
        // every Petersen vertex has degree 3
        for vertex_index in 0..10 {
            assert_eq!(petersen.neighbors(vertex_index).len(), 3);
        }
    }

    #[test]
    fn example_graphs_random_deterministic() {  // cargo test example_graphs_random_deterministic -- --nocapture
        let graph_1 = random_graph(50, 0.1, 7);
        let graph_2 = random_graph(50, 0.1, 7);
        assert_eq!(graph_1.col_indices, graph_2.col_indices);
        assert_eq!(graph_1.row_offsets, graph_2.row_offsets);
        graph_1.sanity_check().unwrap();
        let graph_3 = random_graph(50, 0.1, 8);
        assert!(graph_1.col_indices != graph_3.col_indices);
    }
}
