//! CSR Graph Store
//!
//! Immutable adjacency in CSR format: `row_offsets` has one entry per vertex plus a final
//! total, `col_indices` stores every undirected edge twice (once per direction).
//! The store is shared read-only between all worker threads after construction.

use super::util::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrGraph {
    /// length `vertex_num + 1`, monotonic, `row_offsets[v]..row_offsets[v+1]` indexes `col_indices`
    pub row_offsets: Vec<EdgeIndex>,
    /// length `2 * edge_num`: the neighbor lists of all vertices, back to back
    pub col_indices: Vec<VertexIndex>,
}

impl CsrGraph {
    /// construct from already-parsed integer sequences, validating CSR consistency
    #[allow(clippy::unnecessary_cast)]
    pub fn new(row_offsets: Vec<EdgeIndex>, col_indices: Vec<VertexIndex>) -> Result<Self, MatchingError> {
        if row_offsets.is_empty() {
            return Err(MatchingError::InvalidCsr("row offsets must have at least one entry".to_string()));
        }
        if row_offsets[0] != 0 {
            return Err(MatchingError::InvalidCsr(format!(
                "row offsets must start at 0, found {}",
                row_offsets[0]
            )));
        }
        for window in row_offsets.windows(2) {
            if window[1] < window[0] {
                return Err(MatchingError::InvalidCsr(format!(
                    "row offsets must be non-decreasing, found {} after {}",
                    window[1], window[0]
                )));
            }
        }
        let vertex_num = row_offsets.len() - 1;
        if row_offsets[vertex_num] as usize != col_indices.len() {
            return Err(MatchingError::InvalidCsr(format!(
                "final row offset {} disagrees with arc count {}",
                row_offsets[vertex_num],
                col_indices.len()
            )));
        }
        for &neighbor in col_indices.iter() {
            if neighbor as usize >= vertex_num {
                return Err(MatchingError::InvalidCsr(format!(
                    "column index {} out of range for {} vertices",
                    neighbor, vertex_num
                )));
            }
        }
        Ok(Self { row_offsets, col_indices })
    }

    /// load the two whitespace-separated integer files of the external format
    pub fn from_files(
        row_offsets_path: impl AsRef<Path>,
        col_indices_path: impl AsRef<Path>,
    ) -> Result<Self, MatchingError> {
        let row_offsets = read_integer_file(row_offsets_path.as_ref())?;
        let col_indices = read_integer_file(col_indices_path.as_ref())?;
        Self::new(row_offsets, col_indices)
    }

    pub fn num_vertices(&self) -> VertexNum {
        (self.row_offsets.len() - 1) as VertexNum
    }

    /// the number of undirected edges; every edge is stored as two arcs
    pub fn num_edges(&self) -> usize {
        self.col_indices.len() / 2
    }

    #[allow(clippy::unnecessary_cast)]
    pub fn neighbors(&self, vertex_index: VertexIndex) -> &[VertexIndex] {
        let start = self.row_offsets[vertex_index as usize] as usize;
        let end = self.row_offsets[vertex_index as usize + 1] as usize;
        &self.col_indices[start..end]
    }

    /// check that every arc has its reverse, i.e. the graph is undirected;
    /// the search assumes this but the constructor does not require it
    #[allow(clippy::unnecessary_cast)]
    pub fn sanity_check(&self) -> Result<(), String> {
        let mut arcs: Vec<(VertexIndex, VertexIndex)> = Vec::with_capacity(self.col_indices.len());
        for vertex_index in 0..self.num_vertices() {
            for &neighbor in self.neighbors(vertex_index) {
                arcs.push((vertex_index, neighbor));
            }
        }
        arcs.sort_unstable();
        for &(vertex_index, neighbor) in arcs.iter() {
            if arcs.binary_search(&(neighbor, vertex_index)).is_err() {
                return Err(format!("arc {} -> {} has no reverse arc", vertex_index, neighbor));
            }
        }
        Ok(())
    }
}

/// read a whitespace-separated integer file into a vector
fn read_integer_file<IntType: std::str::FromStr>(path: &Path) -> Result<Vec<IntType>, MatchingError> {
    let file = File::open(path)?;
    let mut values = Vec::new();
    for line in BufReader::new(file).lines() {
        for token in line?.split_whitespace() {
            let value = token
                .parse::<IntType>()
                .map_err(|_| MatchingError::InvalidCsr(format!("invalid integer token {:?} in {}", token, path.display())))?;
            values.push(value);
        }
    }
    Ok(values)
}
