//! Parallel Matching Kernels
//!
//! The phase loop of the X-Blossom search. Each phase grows alternating-tree forests rooted
//! at the exposed vertices and ends in one of two ways: the *Augment* kernel links two trees
//! through an even-even cross edge and the phase returns a batch of vertex-disjoint
//! augmenting paths, or the frontier empties without any link and the matching is maximum.
//!
//! All three kernels are fork-join dispatches over a frontier partitioned round-robin by
//! worker index. Workers never block inside their scan; they batch results thread-locally
//! and merge once under a mutex when they finish. Conflicting updates of the shared phase
//! state are serialized by the single-winner claim cells of [`PhaseState`]; a reader that
//! observes a half-applied update abandons the affected candidate, which is reconsidered in
//! a later phase.

use super::csr_graph::*;
use super::phase_state::*;
use super::util::*;
use crate::parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// one augmenting-path search over the shared graph and matching
pub struct PhaseRunner<'a> {
    pub graph: &'a CsrGraph,
    /// the current matching, read-only during the search, flipped by [`PhaseRunner::apply_paths`]
    pub mate: &'a [AtomicUsize],
    pub state: &'a PhaseState,
    pub num_threads: usize,
}

impl PhaseRunner<'_> {
    /// run kernels until either a batch of augmenting paths is found or the frontier dies out
    pub fn search(&self, thread_pool: &rayon::ThreadPool) -> Vec<Vec<usize>> {
        let mut frontier = self.state.clear(self.mate);
        loop {
            let paths = self.augment_kernel(thread_pool, &frontier);
            if !paths.is_empty() {
                return paths;
            }
            let grown = self.expand_kernel(thread_pool, &frontier);
            // blossoms are detected on the old frontier as well as the vertices just grown
            let mut scan = frontier;
            scan.extend_from_slice(&grown);
            let contracted = self.blossom_kernel(thread_pool, &scan);
            frontier = grown;
            frontier.extend_from_slice(&contracted);
            if frontier.is_empty() {
                return Vec::new();
            }
        }
    }

    /// flip the matching along a batch of vertex-disjoint augmenting paths
    pub fn apply_paths(&self, thread_pool: &rayon::ThreadPool, paths: &[Vec<usize>]) {
        thread_pool.scope(|scope| {
            for worker in 0..self.num_threads {
                scope.spawn(move |_| {
                    let mut index = worker;
                    while index < paths.len() {
                        let path = &paths[index];
                        debug_assert!(path.len() % 2 == 0, "augmenting path must have even vertex count");
                        for pair in path.chunks_exact(2) {
                            self.mate[pair[0]].store(pair[1], Ordering::Relaxed);
                            self.mate[pair[1]].store(pair[0], Ordering::Relaxed);
                        }
                        index += self.num_threads;
                    }
                });
            }
        });
    }

    fn augment_kernel(&self, thread_pool: &rayon::ThreadPool, frontier: &[usize]) -> Vec<Vec<usize>> {
        let collected = Mutex::new(Vec::new());
        thread_pool.scope(|scope| {
            for worker in 0..self.num_threads {
                let collected = &collected;
                scope.spawn(move |_| self.augment_worker(frontier, worker, collected));
            }
        });
        collected.into_inner()
    }

    /// detect even-even edges between two distinct trees; the winner of both tree claims
    /// materializes the augmenting path between the two roots
    #[allow(clippy::unnecessary_cast)]
    fn augment_worker(&self, frontier: &[usize], worker: usize, collected: &Mutex<Vec<Vec<usize>>>) {
        let mut local_paths = Vec::new();
        let mut index = worker;
        while index < frontier.len() {
            let vertex_index = frontier[index];
            index += self.num_threads;
            for &neighbor in self.graph.neighbors(vertex_index as VertexIndex) {
                let neighbor = neighbor as usize;
                if !self.state.is_even[neighbor].load(Ordering::Acquire) {
                    continue;
                }
                let tree_v = self.state.belongs[vertex_index].load(Ordering::Acquire);
                let tree_w = self.state.belongs[neighbor].load(Ordering::Acquire);
                if tree_v == tree_w || tree_v == NO_VERTEX || tree_w == NO_VERTEX {
                    continue;
                }
                let (tree_min, tree_max) = if tree_v < tree_w { (tree_v, tree_w) } else { (tree_w, tree_v) };
                if !acquire_claim(&self.state.select_tree[tree_min]) {
                    // another worker already captured the lower tree: abandon the rest of
                    // this neighbor scan instead of racing it
                    break;
                }
                if !acquire_claim(&self.state.select_tree[tree_max]) {
                    release_claim(&self.state.select_tree[tree_min]);
                    continue;
                }
                match (self.state.root_path(vertex_index), self.state.root_path(neighbor)) {
                    (Some(path_v), Some(path_w)) => {
                        let mut path = Vec::with_capacity(path_v.len() + path_w.len());
                        path.extend(path_v.iter().rev());
                        path.extend(path_w.iter());
                        local_paths.push(path);
                    }
                    _ => {
                        // stale chain observed, release both trees and retry next phase
                        release_claim(&self.state.select_tree[tree_max]);
                        release_claim(&self.state.select_tree[tree_min]);
                    }
                }
            }
        }
        if !local_paths.is_empty() {
            collected.lock().append(&mut local_paths);
        }
    }

    fn expand_kernel(&self, thread_pool: &rayon::ThreadPool, frontier: &[usize]) -> Vec<usize> {
        let grown = Mutex::new(Vec::new());
        thread_pool.scope(|scope| {
            for worker in 0..self.num_threads {
                let grown = &grown;
                scope.spawn(move |_| self.expand_worker(frontier, worker, grown));
            }
        });
        grown.into_inner()
    }

    /// grow a tree by two edges: the unmatched edge (v, w) and the matched edge (w, mate(w));
    /// the new even endpoint inherits the chain that reaches the root through w and v
    #[allow(clippy::unnecessary_cast)]
    fn expand_worker(&self, frontier: &[usize], worker: usize, grown: &Mutex<Vec<usize>>) {
        let mut local_grown = Vec::new();
        let mut index = worker;
        while index < frontier.len() {
            let vertex_index = frontier[index];
            index += self.num_threads;
            for &neighbor in self.graph.neighbors(vertex_index as VertexIndex) {
                let neighbor = neighbor as usize;
                if self.state.belongs[neighbor].load(Ordering::Acquire) != NO_VERTEX {
                    continue;
                }
                let outer = self.mate[neighbor].load(Ordering::Relaxed);
                if outer == NO_VERTEX {
                    // an exposed neighbor is an augment case, never a growth case
                    continue;
                }
                if !acquire_claim(&self.state.select_match[neighbor.min(outer)]) {
                    continue;
                }
                {
                    let mut chain = self.state.path_table[outer].write();
                    chain.push(neighbor);
                    chain.push(vertex_index);
                }
                self.state.is_even[neighbor].store(false, Ordering::Release);
                self.state.is_even[outer].store(true, Ordering::Release);
                let tree = self.state.belongs[vertex_index].load(Ordering::Acquire);
                self.state.belongs[neighbor].store(tree, Ordering::Release);
                self.state.belongs[outer].store(tree, Ordering::Release);
                local_grown.push(outer);
            }
        }
        if !local_grown.is_empty() {
            grown.lock().append(&mut local_grown);
        }
    }

    fn blossom_kernel(&self, thread_pool: &rayon::ThreadPool, scan: &[usize]) -> Vec<usize> {
        let contracted = Mutex::new(Vec::new());
        thread_pool.scope(|scope| {
            for worker in 0..self.num_threads {
                let contracted = &contracted;
                scope.spawn(move |_| self.blossom_worker(scan, worker, contracted));
            }
        });
        contracted.into_inner()
    }

    /// detect an even-even edge inside one tree and contract the odd cycle spanned by the
    /// two root paths; every interior odd vertex turns even and joins the next frontier
    #[allow(clippy::unnecessary_cast)]
    fn blossom_worker(&self, scan: &[usize], worker: usize, contracted: &Mutex<Vec<usize>>) {
        let mut local_contracted = Vec::new();
        let mut index = worker;
        while index < scan.len() {
            let vertex_index = scan[index];
            index += self.num_threads;
            for &neighbor in self.graph.neighbors(vertex_index as VertexIndex) {
                let neighbor = neighbor as usize;
                if !self.state.is_even[neighbor].load(Ordering::Acquire) {
                    continue;
                }
                let tree = self.state.belongs[vertex_index].load(Ordering::Acquire);
                if tree == NO_VERTEX || self.state.belongs[neighbor].load(Ordering::Acquire) != tree {
                    continue;
                }
                if self.mate[vertex_index].load(Ordering::Relaxed) == neighbor {
                    continue;
                }
                let base_v = self.state.blossom_to_base[vertex_index].load(Ordering::Acquire);
                if base_v != NO_VERTEX && self.state.blossom_to_base[neighbor].load(Ordering::Acquire) == base_v {
                    continue;
                }
                let path_v = match self.state.root_path_checked(vertex_index, None) {
                    Some(path_v) => path_v,
                    None => continue,
                };
                let path_w = match self.state.root_path_checked(neighbor, Some(tree)) {
                    Some(path_w) => path_w,
                    None => continue,
                };
                let cycle = match build_blossom_cycle(&path_v, &path_w) {
                    Some(cycle) => cycle,
                    None => continue,
                };
                self.contract_blossom(&cycle, &mut local_contracted);
            }
        }
        if !local_contracted.is_empty() {
            contracted.lock().append(&mut local_contracted);
        }
    }

    /// re-label the odd vertices of a discovered cycle. The cycle is scanned twice, once from
    /// each end, so that every interior vertex receives the chain along its even-length arc:
    /// the first pass serves one side of the cycle, the second pass the other.
    fn contract_blossom(&self, cycle: &[usize], local_contracted: &mut Vec<usize>) {
        let base = cycle[0];
        self.state.blossom_to_base[base].store(base, Ordering::Release);
        let mut position = cycle.len() as isize - 3;
        while position >= 0 {
            self.contract_vertex(cycle, position as usize, true, local_contracted);
            position -= 2;
        }
        let mut position = 2;
        while position + 1 < cycle.len() {
            self.contract_vertex(cycle, position, false, local_contracted);
            position += 2;
        }
    }

    fn contract_vertex(&self, cycle: &[usize], position: usize, toward_end: bool, local_contracted: &mut Vec<usize>) {
        let current = cycle[position];
        let base = cycle[0];
        if self.state.blossom_to_base[current].load(Ordering::Acquire) == NO_VERTEX {
            self.state.blossom_to_base[current].store(base, Ordering::Release);
        }
        if self.state.is_even[current].load(Ordering::Acquire) {
            return;
        }
        if !self.state.path_table[current].read_recursive().is_empty() {
            return;
        }
        if !acquire_claim(&self.state.select_blossom[current]) {
            return;
        }
        let duplicated = {
            let mut chain = self.state.path_table[current].write();
            if toward_end {
                chain.extend_from_slice(&cycle[position + 1..]);
            } else {
                chain.extend(cycle[..position].iter().rev());
            }
            let mut duplicated = false;
            'dedup: for left in 0..chain.len() {
                for right in left + 1..chain.len() {
                    if chain[left] == chain[right] {
                        duplicated = true;
                        break 'dedup;
                    }
                }
            }
            if duplicated {
                chain.clear();
            }
            duplicated
        };
        if duplicated {
            release_claim(&self.state.select_blossom[current]);
            return;
        }
        self.state.is_even[current].store(true, Ordering::Release);
        local_contracted.push(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_fixture(graph: &CsrGraph) -> (Vec<AtomicUsize>, PhaseState, rayon::ThreadPool) {
        let vertex_num = graph.num_vertices() as usize;
        let mate = (0..vertex_num).map(|_| AtomicUsize::new(NO_VERTEX)).collect();
        let state = PhaseState::new(vertex_num);
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .expect("creating thread pool failed");
        (mate, state, thread_pool)
    }

    fn mate_snapshot(mate: &[AtomicUsize]) -> Vec<usize> {
        mate.iter().map(|cell| cell.load(Ordering::Relaxed)).collect()
    }

    #[test]
    fn matching_parallel_augment_single_edge() {  // cargo test matching_parallel_augment_single_edge -- --nocapture
        let graph = crate::example_graphs::path_graph(2);
        let (mate, state, thread_pool) = runner_fixture(&graph);
        let runner = PhaseRunner { graph: &graph, mate: &mate, state: &state, num_threads: 2 };
        let paths = runner.search(&thread_pool);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 2);
        runner.apply_paths(&thread_pool, &paths);
        assert_eq!(mate_snapshot(&mate), vec![1, 0]);
    }

    #[test]
    fn matching_parallel_expand_grows_tree() {  // cargo test matching_parallel_expand_grows_tree -- --nocapture
        // path 0 - 1 - 2 - 3 with (1, 2) matched: expanding from either exposed root
        // turns the far endpoint of the matched edge even
        let graph = crate::example_graphs::path_graph(4);
        let (mate, state, thread_pool) = runner_fixture(&graph);
        mate[1].store(2, Ordering::Relaxed);
        mate[2].store(1, Ordering::Relaxed);
        let runner = PhaseRunner { graph: &graph, mate: &mate, state: &state, num_threads: 2 };
        let frontier = state.clear(&mate);
        assert_eq!(frontier, vec![0, 3]);
        let paths = runner.augment_kernel(&thread_pool, &frontier);
        assert!(paths.is_empty());
        let mut grown = runner.expand_kernel(&thread_pool, &frontier);
        grown.sort_unstable();
        // exactly one of the two roots wins the (1, 2) match claim
        assert_eq!(grown.len(), 1);
        let outer = grown[0];
        assert!(state.is_even[outer].load(Ordering::Acquire));
        assert_eq!(state.root_path(outer).unwrap().len(), 3);
    }

    #[test]
    fn matching_parallel_phase_finds_path_through_matched_edge() {  // cargo test matching_parallel_phase_finds_path_through_matched_edge -- --nocapture
        let graph = crate::example_graphs::path_graph(4);
        let (mate, state, thread_pool) = runner_fixture(&graph);
        mate[1].store(2, Ordering::Relaxed);
        mate[2].store(1, Ordering::Relaxed);
        let runner = PhaseRunner { graph: &graph, mate: &mate, state: &state, num_threads: 2 };
        let paths = runner.search(&thread_pool);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 4);
        runner.apply_paths(&thread_pool, &paths);
        let mates = mate_snapshot(&mate);
        assert_eq!(mates, vec![1, 0, 3, 2]);
    }

    #[test]
    fn matching_parallel_blossom_contracts_c5() {  // cargo test matching_parallel_blossom_contracts_c5 -- --nocapture
        // C5 with (0, 1) and (2, 3) matched: the phase rooted at 4 must contract the
        // blossom and end stable, every cycle vertex even
        let graph = crate::example_graphs::cycle_graph(5);
        let (mate, state, thread_pool) = runner_fixture(&graph);
        mate[0].store(1, Ordering::Relaxed);
        mate[1].store(0, Ordering::Relaxed);
        mate[2].store(3, Ordering::Relaxed);
        mate[3].store(2, Ordering::Relaxed);
        let runner = PhaseRunner { graph: &graph, mate: &mate, state: &state, num_threads: 1 };
        let paths = runner.search(&thread_pool);
        assert!(paths.is_empty());
        for vertex_index in 0..5 {
            assert!(state.is_even[vertex_index].load(Ordering::Acquire), "vertex {} must be even", vertex_index);
            assert_eq!(state.blossom_to_base[vertex_index].load(Ordering::Acquire), 4);
        }
    }

    #[test]
    fn matching_parallel_apply_paths_batch() {  // cargo test matching_parallel_apply_paths_batch -- --nocapture
        let graph = crate::example_graphs::path_graph(8);
        let (mate, state, thread_pool) = runner_fixture(&graph);
        let runner = PhaseRunner { graph: &graph, mate: &mate, state: &state, num_threads: 2 };
        let paths = vec![vec![0, 1, 2, 3], vec![4, 5], vec![6, 7]];
        runner.apply_paths(&thread_pool, &paths);
        assert_eq!(mate_snapshot(&mate), vec![1, 0, 3, 2, 5, 4, 7, 6]);
    }
}
