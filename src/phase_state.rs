//! Phase State
//!
//! Per-vertex state of one augmenting-path search: parity labels, tree membership, blossom
//! bases, predecessor chains and the single-winner claim cells that arbitrate concurrent
//! updates. The state is allocated once and reset at the start of every search.
//!
//! A predecessor chain `path_table[v]` is a list of hops from `v` toward the root of its
//! alternating tree. A full root path is assembled by walking chain blocks: emit the block,
//! then continue from the block's last vertex. Vertices absorbed into a contracted blossom
//! carry chains that route through the blossom base, so later walks traverse contracted
//! cycles without any extra bookkeeping.

use super::util::*;
use crate::parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct PhaseState {
    pub vertex_num: usize,
    /// even parity label: the vertex has even distance to the root of its tree
    pub is_even: Vec<AtomicBool>,
    /// the tree a vertex belongs to, named by the root vertex; `NO_VERTEX` if in no tree
    pub belongs: Vec<AtomicUsize>,
    /// the base vertex of the contracted blossom containing this vertex, `NO_VERTEX` if none
    pub blossom_to_base: Vec<AtomicUsize>,
    /// predecessor chains; only the winner of the matching claim cell writes, readers tolerate
    /// stale blocks and re-validate
    pub path_table: Vec<RwLock<Vec<usize>>>,
    /// one claim per tree: the winner may join this tree into an augmenting path
    pub select_tree: Vec<AtomicBool>,
    /// one claim per matched pair (indexed by the smaller endpoint): the winner grows a tree
    /// through that matched edge
    pub select_match: Vec<AtomicBool>,
    /// one claim per vertex: the winner re-labels it during blossom contraction
    pub select_blossom: Vec<AtomicBool>,
}

/// explicit claim rollback: store 0 through a compare-exchange expecting 1
pub fn release_claim(cell: &AtomicBool) {
    let _ = cell.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire);
}

/// single-winner claim: compare-exchange 0 to 1 with acquire-on-success semantics
pub fn acquire_claim(cell: &AtomicBool) -> bool {
    cell.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
}

impl PhaseState {
    pub fn new(vertex_num: usize) -> Self {
        Self {
            vertex_num,
            is_even: (0..vertex_num).map(|_| AtomicBool::new(false)).collect(),
            belongs: (0..vertex_num).map(|_| AtomicUsize::new(NO_VERTEX)).collect(),
            blossom_to_base: (0..vertex_num).map(|_| AtomicUsize::new(NO_VERTEX)).collect(),
            path_table: (0..vertex_num).map(|_| RwLock::new(Vec::new())).collect(),
            select_tree: (0..vertex_num).map(|_| AtomicBool::new(false)).collect(),
            select_match: (0..vertex_num).map(|_| AtomicBool::new(false)).collect(),
            select_blossom: (0..vertex_num).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// reset all per-phase cells, plant a single-vertex tree at every exposed vertex and
    /// return the exposed set: the initial frontier of the search
    pub fn clear(&self, mate: &[AtomicUsize]) -> Vec<usize> {
        let mut exposed = Vec::new();
        for vertex_index in 0..self.vertex_num {
            self.is_even[vertex_index].store(false, Ordering::Relaxed);
            self.belongs[vertex_index].store(NO_VERTEX, Ordering::Relaxed);
            self.blossom_to_base[vertex_index].store(NO_VERTEX, Ordering::Relaxed);
            self.path_table[vertex_index].write().clear();
            self.select_tree[vertex_index].store(false, Ordering::Relaxed);
            self.select_match[vertex_index].store(false, Ordering::Relaxed);
            self.select_blossom[vertex_index].store(false, Ordering::Relaxed);
            if mate[vertex_index].load(Ordering::Relaxed) == NO_VERTEX {
                exposed.push(vertex_index);
            }
        }
        for &root in exposed.iter() {
            self.is_even[root].store(true, Ordering::Release);
            self.belongs[root].store(root, Ordering::Release);
        }
        exposed
    }

    /// the root path of `v`: `[v, ...]` ending at the tree root; `None` if the walk exceeds
    /// the vertex count, which only happens on chains left behind by an abandoned contraction
    pub fn root_path(&self, vertex_index: usize) -> Option<Vec<usize>> {
        let mut path = vec![vertex_index];
        let mut cursor = vertex_index;
        loop {
            let chain = self.path_table[cursor].read_recursive();
            if chain.is_empty() {
                return Some(path);
            }
            path.extend_from_slice(&chain);
            cursor = *chain.last().unwrap();
            drop(chain);
            if path.len() > self.vertex_num {
                return None;
            }
        }
    }

    /// the root path of `v` for blossom detection; when `tree` is given, every visited vertex
    /// must belong to it, otherwise the walk observed an in-flight update and returns `None`
    pub fn root_path_checked(&self, vertex_index: usize, tree: Option<usize>) -> Option<Vec<usize>> {
        let mut path = vec![vertex_index];
        let mut cursor = vertex_index;
        loop {
            let chain = self.path_table[cursor].read_recursive().clone();
            if chain.is_empty() {
                return Some(path);
            }
            if let Some(tree) = tree {
                for &hop in chain.iter() {
                    if self.belongs[hop].load(Ordering::Acquire) != tree {
                        return None;
                    }
                }
            }
            path.extend_from_slice(&chain);
            cursor = *chain.last().unwrap();
            if path.len() > self.vertex_num {
                return None;
            }
        }
    }

    #[allow(dead_code)]
    pub fn blossom_base(&self, vertex_index: usize) -> Option<usize> {
        match self.blossom_to_base[vertex_index].load(Ordering::Acquire) {
            NO_VERTEX => None,
            base => Some(base),
        }
    }
}

/// the odd cycle spanned by two root paths that meet at their lowest common ancestor,
/// laid out `[base, ..., v, w, ..., base]` with the base repeated at the end;
/// `None` if the paths never meet, the cycle has even length, or an interior vertex repeats
/// (all symptoms of reading in-flight updates)
pub fn build_blossom_cycle(path_v: &[usize], path_w: &[usize]) -> Option<Vec<usize>> {
    let mut meet = None;
    'search: for (position_v, &vertex_v) in path_v.iter().enumerate() {
        for (position_w, &vertex_w) in path_w.iter().enumerate() {
            if vertex_v == vertex_w {
                meet = Some((position_v, position_w));
                break 'search;
            }
        }
    }
    let (position_v, position_w) = meet?;
    let mut cycle = Vec::with_capacity(position_v + position_w + 2);
    cycle.extend(path_v[..=position_v].iter().rev());
    cycle.extend(path_w[..=position_w].iter());
    // an odd cycle of length 2r+1 yields 2r+2 entries since the base appears twice
    if cycle.len() % 2 != 0 {
        return None;
    }
    for left in 0..cycle.len() - 1 {
        for right in left + 1..cycle.len() - 1 {
            if cycle[left] == cycle[right] {
                return None;
            }
        }
    }
    Some(cycle)
}
