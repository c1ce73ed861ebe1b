//! Serial Reference Matching
//!
//! A sequential Edmonds blossom search used to verify the parallel solver: it finds one
//! augmenting path at a time from each exposed root, contracting odd cycles by remapping
//! their vertices onto a common base. O(V^3), intended for verification and small inputs.

use super::csr_graph::*;
use super::util::*;
use std::collections::VecDeque;

/// maximum-cardinality matching by the sequential blossom search
pub fn serial_maximum_matching(graph: &CsrGraph) -> Vec<VertexIndex> {
    SerialMatcher::new(graph).solve()
}

/// check symmetry and edge validity of a matching, returning its cardinality
#[allow(clippy::unnecessary_cast)]
pub fn verify_matching(graph: &CsrGraph, matching: &[VertexIndex]) -> Result<usize, String> {
    if matching.len() != graph.num_vertices() as usize {
        return Err(format!(
            "matching length {} disagrees with vertex count {}",
            matching.len(),
            graph.num_vertices()
        ));
    }
    for (vertex_index, &mate) in matching.iter().enumerate() {
        if mate == SENTINEL {
            continue;
        }
        if mate as usize >= matching.len() {
            return Err(format!("vertex {} matched out of range to {}", vertex_index, mate));
        }
        if matching[mate as usize] as usize != vertex_index {
            return Err(format!(
                "matching not symmetric: M[{}] = {} but M[{}] = {}",
                vertex_index, mate, mate, matching[mate as usize]
            ));
        }
        if !graph.neighbors(vertex_index as VertexIndex).contains(&mate) {
            return Err(format!("matched pair ({}, {}) is not an edge", vertex_index, mate));
        }
    }
    Ok(matching_cardinality(matching))
}

struct SerialMatcher<'a> {
    graph: &'a CsrGraph,
    vertex_num: usize,
    mate: Vec<usize>,
    /// tree predecessor along the unmatched edge used to reach an odd vertex
    parent: Vec<usize>,
    /// representative of the contracted blossom containing each vertex
    base: Vec<usize>,
    in_tree: Vec<bool>,
    in_blossom: Vec<bool>,
}

impl<'a> SerialMatcher<'a> {
    fn new(graph: &'a CsrGraph) -> Self {
        let vertex_num = graph.num_vertices() as usize;
        Self {
            graph,
            vertex_num,
            mate: vec![NO_VERTEX; vertex_num],
            parent: vec![NO_VERTEX; vertex_num],
            base: (0..vertex_num).collect(),
            in_tree: vec![false; vertex_num],
            in_blossom: vec![false; vertex_num],
        }
    }

    #[allow(clippy::unnecessary_cast)]
    fn solve(mut self) -> Vec<VertexIndex> {
        for root in 0..self.vertex_num {
            if self.mate[root] == NO_VERTEX {
                self.find_augmenting_path(root);
            }
        }
        self.mate
            .iter()
            .map(|&mate| if mate == NO_VERTEX { SENTINEL } else { mate as VertexIndex })
            .collect()
    }

    /// lowest common ancestor of two even vertices in the (contracted) alternating tree
    fn lowest_common_base(&self, mut left: usize, mut right: usize) -> usize {
        let mut seen = vec![false; self.vertex_num];
        loop {
            left = self.base[left];
            seen[left] = true;
            if self.mate[left] == NO_VERTEX {
                break;
            }
            left = self.parent[self.mate[left]];
        }
        loop {
            right = self.base[right];
            if seen[right] {
                return right;
            }
            right = self.parent[self.mate[right]];
        }
    }

    /// mark the blossom vertices on the path from `vertex` down to the base, re-rooting
    /// parent pointers so the cycle can be traversed in both directions later
    fn mark_blossom_path(&mut self, mut vertex: usize, blossom_base: usize, mut child: usize) {
        while self.base[vertex] != blossom_base {
            self.in_blossom[self.base[vertex]] = true;
            self.in_blossom[self.base[self.mate[vertex]]] = true;
            self.parent[vertex] = child;
            child = self.mate[vertex];
            vertex = self.parent[self.mate[vertex]];
        }
    }

    fn contract_blossom(&mut self, queue: &mut VecDeque<usize>, left: usize, right: usize) {
        let blossom_base = self.lowest_common_base(left, right);
        self.in_blossom.iter_mut().for_each(|flag| *flag = false);
        self.mark_blossom_path(left, blossom_base, right);
        self.mark_blossom_path(right, blossom_base, left);
        for vertex in 0..self.vertex_num {
            if self.in_blossom[self.base[vertex]] {
                self.base[vertex] = blossom_base;
                if !self.in_tree[vertex] {
                    self.in_tree[vertex] = true;
                    queue.push_back(vertex);
                }
            }
        }
    }

    /// grow an alternating tree from `root`; on reaching an exposed vertex, flip the
    /// matching along the path back to the root
    #[allow(clippy::unnecessary_cast)]
    fn find_augmenting_path(&mut self, root: usize) -> bool {
        self.in_tree.iter_mut().for_each(|flag| *flag = false);
        self.parent.iter_mut().for_each(|parent| *parent = NO_VERTEX);
        for vertex in 0..self.vertex_num {
            self.base[vertex] = vertex;
        }
        self.in_tree[root] = true;
        let mut queue = VecDeque::new();
        queue.push_back(root);
        while let Some(vertex) = queue.pop_front() {
            let neighbors: Vec<usize> = self.graph.neighbors(vertex as VertexIndex).iter().map(|&n| n as usize).collect();
            for neighbor in neighbors {
                if self.base[vertex] == self.base[neighbor] || self.mate[vertex] == neighbor {
                    continue;
                }
                if neighbor == root || (self.mate[neighbor] != NO_VERTEX && self.parent[self.mate[neighbor]] != NO_VERTEX) {
                    // an even-even edge inside the tree closes an odd cycle
                    self.contract_blossom(&mut queue, vertex, neighbor);
                } else if self.parent[neighbor] == NO_VERTEX {
                    self.parent[neighbor] = vertex;
                    if self.mate[neighbor] == NO_VERTEX {
                        self.augment_along(neighbor);
                        return true;
                    }
                    let next = self.mate[neighbor];
                    self.in_tree[next] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }

    fn augment_along(&mut self, mut vertex: usize) {
        while vertex != NO_VERTEX {
            let previous = self.parent[vertex];
            let next = self.mate[previous];
            self.mate[vertex] = previous;
            self.mate[previous] = vertex;
            vertex = next;
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::example_graphs::*;

    fn assert_cardinality(graph: &CsrGraph, expected: usize) {
        let matching = serial_maximum_matching(graph);
        assert_eq!(verify_matching(graph, &matching).unwrap(), expected);
    }

    #[test]
    fn matching_serial_boundary_cases() {  // cargo test matching_serial_boundary_cases -- --nocapture
        assert_cardinality(&CsrGraph::new(vec![0], vec![]).unwrap(), 0);
        assert_cardinality(&edgeless_graph(5), 0);
        let graph = path_graph(2);
        let matching = serial_maximum_matching(&graph);
        assert_eq!(matching, vec![1, 0]);
    }

    #[test]
    fn matching_serial_scenarios() {  // cargo test matching_serial_scenarios -- --nocapture
        assert_cardinality(&path_graph(4), 2);
        assert_cardinality(&cycle_graph(5), 2);
        assert_cardinality(&two_triangles(), 2);
        assert_cardinality(&bowtie(), 3);
        assert_cardinality(&complete_graph(6), 3);
        assert_cardinality(&petersen_graph(), 5);
    }

    #[test]
    fn matching_serial_odd_cycles() {  // cargo test matching_serial_odd_cycles -- --nocapture
        for length in [3, 5, 7, 9, 11] {
            assert_cardinality(&cycle_graph(length), length / 2);
        }
        for vertex_num in 2..=9 {
            assert_cardinality(&complete_graph(vertex_num), vertex_num / 2);
        }
    }

    #[test]
    fn matching_serial_verify_rejects_invalid() {  // cargo test matching_serial_verify_rejects_invalid -- --nocapture
        let graph = path_graph(4);
        // asymmetric
        assert!(verify_matching(&graph, &[1, 0, 3, 0]).is_err());
        // not an edge
        assert!(verify_matching(&graph, &[2, SENTINEL, 0, SENTINEL]).is_err());
        // wrong length
        assert!(verify_matching(&graph, &[SENTINEL; 3]).is_err());
        assert_eq!(verify_matching(&graph, &[1, 0, SENTINEL, SENTINEL]).unwrap(), 1);
    }

    /// cross-check the serial reference against petgraph on random graphs
    #[test]
    fn matching_serial_against_petgraph() {  // cargo test matching_serial_against_petgraph -- --nocapture
        use petgraph::algo::maximum_matching;
        use petgraph::prelude::*;
        for seed in 0..6 {
            let graph = random_graph(40, 0.1, seed);
            let matching = serial_maximum_matching(&graph);
            let cardinality = verify_matching(&graph, &matching).unwrap();
            let mut reference = UnGraph::<(), ()>::default();
            let nodes: Vec<_> = (0..graph.num_vertices()).map(|_| reference.add_node(())).collect();
            for vertex_index in 0..graph.num_vertices() {
                for &neighbor in graph.neighbors(vertex_index) {
                    if vertex_index < neighbor {
                        reference.add_edge(nodes[vertex_index as usize], nodes[neighbor as usize], ());
                    }
                }
            }
            let reference_matching = maximum_matching(&reference);
            assert_eq!(cardinality, reference_matching.edges().count(), "seed {}", seed);
        }
    }
}
