//! Maximum-Cardinality Matching Solver
//!
//! This module wires the parallel phase loop into a reusable solver object. Note that the
//! solver owns its thread pool and per-phase state, so repeated solves on the same graph
//! reuse all allocations; create one solver per graph and call [`SolverParallel::solve`].

use super::csr_graph::*;
use super::matching_parallel::*;
use super::phase_state::*;
use super::util::*;
use crate::derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// the number of worker threads; every kernel partitions its frontier across them
    #[serde(default = "solver_default_configs::num_threads")]
    pub num_threads: usize,
}

pub mod solver_default_configs {
    pub fn num_threads() -> usize {
        1
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        serde_json::from_value(json!({})).unwrap()
    }
}

impl SolverConfig {
    pub fn new(num_threads: usize) -> Self {
        Self { num_threads }
    }
}

/// a parallel solver; the graph is taken by reference and never mutated
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SolverParallel {
    config: SolverConfig,
    graph: CsrGraph,
    /// the current matching, `NO_VERTEX` encoding unmatched vertices
    #[derivative(Debug = "ignore")]
    mate: Vec<AtomicUsize>,
    /// per-phase search state, reset at the start of every phase
    #[derivative(Debug = "ignore")]
    state: PhaseState,
    #[derivative(Debug = "ignore")]
    thread_pool: rayon::ThreadPool,
}

impl SolverParallel {
    pub fn new(graph: &CsrGraph, config: SolverConfig) -> Result<Self, MatchingError> {
        if config.num_threads < 1 {
            return Err(MatchingError::InvalidThreadCount(config.num_threads));
        }
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
            .expect("creating thread pool failed");
        let vertex_num = graph.num_vertices() as usize;
        Ok(Self {
            config,
            graph: graph.clone(),
            mate: (0..vertex_num).map(|_| AtomicUsize::new(NO_VERTEX)).collect(),
            state: PhaseState::new(vertex_num),
            thread_pool,
        })
    }

    /// reset the matching so the next solve starts from scratch
    pub fn clear(&mut self) {
        for cell in self.mate.iter() {
            cell.store(NO_VERTEX, Ordering::Relaxed);
        }
    }

    /// compute a maximum-cardinality matching starting from the empty matching
    pub fn solve(&mut self) -> Vec<VertexIndex> {
        self.clear();
        self.run_to_fixpoint();
        self.snapshot()
    }

    /// compute a maximum-cardinality matching starting from an existing (symmetric) matching
    #[allow(clippy::unnecessary_cast)]
    pub fn solve_with_initial(&mut self, matching: &[VertexIndex]) -> Vec<VertexIndex> {
        assert_eq!(matching.len(), self.mate.len(), "initial matching must cover every vertex");
        for (cell, &mate) in self.mate.iter().zip(matching.iter()) {
            cell.store(if mate == SENTINEL { NO_VERTEX } else { mate as usize }, Ordering::Relaxed);
        }
        self.run_to_fixpoint();
        self.snapshot()
    }

    /// repeat phases until one finds no augmenting path; every applied batch strictly
    /// increases the matching cardinality, bounded by half the vertex count
    fn run_to_fixpoint(&mut self) {
        let runner = PhaseRunner {
            graph: &self.graph,
            mate: &self.mate,
            state: &self.state,
            num_threads: self.config.num_threads,
        };
        loop {
            let paths = runner.search(&self.thread_pool);
            if paths.is_empty() {
                break;
            }
            runner.apply_paths(&self.thread_pool, &paths);
        }
    }

    #[allow(clippy::unnecessary_cast)]
    fn snapshot(&self) -> Vec<VertexIndex> {
        self.mate
            .iter()
            .map(|cell| match cell.load(Ordering::Relaxed) {
                NO_VERTEX => SENTINEL,
                mate => mate as VertexIndex,
            })
            .collect()
    }
}

/// the library entry point: a maximum-cardinality matching of an undirected CSR graph
pub fn maximum_matching(graph: &CsrGraph, num_threads: usize) -> Result<Vec<VertexIndex>, MatchingError> {
    let mut solver = SolverParallel::new(graph, SolverConfig::new(num_threads))?;
    Ok(solver.solve())
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::example_graphs::*;
    use crate::matching_serial::*;

    pub fn solver_standard_cardinality(graph: &CsrGraph, num_threads: usize, expected: usize) {
        let matching = maximum_matching(graph, num_threads).unwrap();
        assert_eq!(
            verify_matching(graph, &matching).unwrap(),
            expected,
            "wrong cardinality with {} threads",
            num_threads
        );
    }

    #[test]
    fn mcm_solver_invalid_thread_count() {  // cargo test mcm_solver_invalid_thread_count -- --nocapture
        let graph = path_graph(4);
        assert!(matches!(
            maximum_matching(&graph, 0),
            Err(MatchingError::InvalidThreadCount(0))
        ));
    }

    #[test]
    fn mcm_solver_boundary_cases() {  // cargo test mcm_solver_boundary_cases -- --nocapture
        let empty = CsrGraph::new(vec![0], vec![]).unwrap();
        assert_eq!(maximum_matching(&empty, 2).unwrap(), Vec::<usize>::new());
        let edgeless = edgeless_graph(4);
        assert_eq!(maximum_matching(&edgeless, 2).unwrap(), vec![SENTINEL; 4]);
        let single = path_graph(2);
        assert_eq!(maximum_matching(&single, 1).unwrap(), vec![1, 0]);
    }

    #[test]
    fn mcm_solver_scenarios() {  // cargo test mcm_solver_scenarios -- --nocapture
        for num_threads in [1, 2, 4] {
            solver_standard_cardinality(&path_graph(4), num_threads, 2);
            solver_standard_cardinality(&cycle_graph(5), num_threads, 2);
            solver_standard_cardinality(&two_triangles(), num_threads, 2);
            solver_standard_cardinality(&bowtie(), num_threads, 3);
            solver_standard_cardinality(&complete_graph(6), num_threads, 3);
            solver_standard_cardinality(&petersen_graph(), num_threads, 5);
        }
    }

    #[test]
    fn mcm_solver_odd_cycles() {  // cargo test mcm_solver_odd_cycles -- --nocapture
        for length in [3, 5, 7, 9, 11, 13] {
            solver_standard_cardinality(&cycle_graph(length), 2, length as usize / 2);
        }
    }

    #[test]
    fn mcm_solver_complete_graphs() {  // cargo test mcm_solver_complete_graphs -- --nocapture
        for vertex_num in 2..=10 {
            solver_standard_cardinality(&complete_graph(vertex_num), 4, vertex_num as usize / 2);
        }
    }

    /// the cardinality must not depend on the thread count, only the matching itself may
    #[test]
    fn mcm_solver_thread_independence() {  // cargo test mcm_solver_thread_independence -- --nocapture
        for seed in 0..5 {
            let graph = random_graph(60, 0.08, seed);
            let expected = verify_matching(&graph, &serial_maximum_matching(&graph)).unwrap();
            for num_threads in [1, 2, 4, 8] {
                solver_standard_cardinality(&graph, num_threads, expected);
            }
        }
    }

    /// feeding a maximum matching back in must keep it maximum
    #[test]
    fn mcm_solver_idempotence() {  // cargo test mcm_solver_idempotence -- --nocapture
        for seed in 0..3 {
            let graph = random_graph(50, 0.1, seed);
            let mut solver = SolverParallel::new(&graph, SolverConfig::new(2)).unwrap();
            let first = solver.solve();
            let cardinality = verify_matching(&graph, &first).unwrap();
            let second = solver.solve_with_initial(&first);
            assert_eq!(verify_matching(&graph, &second).unwrap(), cardinality);
            assert_eq!(first, second);
        }
    }

    /// randomized comparison against the sequential reference
    #[test]
    fn mcm_solver_random_against_serial() {  // cargo test mcm_solver_random_against_serial -- --nocapture
        for seed in 0..8 {
            for (vertex_num, edge_probability) in [(30, 0.15), (100, 0.05), (200, 0.02)] {
                let graph = random_graph(vertex_num, edge_probability, seed * 31 + vertex_num as u64);
                let expected = verify_matching(&graph, &serial_maximum_matching(&graph)).unwrap();
                for num_threads in [1, 4] {
                    solver_standard_cardinality(&graph, num_threads, expected);
                }
            }
        }
    }
}
