extern crate cfg_if;
extern crate derivative;
extern crate parking_lot;
#[cfg(test)]
extern crate petgraph;
#[cfg(feature = "python_binding")]
extern crate pyo3;
extern crate rand_xoshiro;
extern crate rayon;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate thiserror;

pub mod csr_graph;
pub mod example_graphs;
pub mod matching_parallel;
pub mod matching_serial;
pub mod mcm_solver;
pub mod phase_state;
pub mod util;

use csr_graph::*;
use util::*;
#[cfg(feature = "python_binding")]
use pyo3::prelude::*;

pub use mcm_solver::maximum_matching;

/// compute a maximum matching directly from the two CSR sequences
/// (to optimize repeated solves, consider reusing a [`mcm_solver::SolverParallel`] object)
pub fn x_blossom_maximum_matching(
    row_offsets: Vec<EdgeIndex>,
    col_indices: Vec<VertexIndex>,
    num_threads: usize,
) -> Result<Vec<VertexIndex>, MatchingError> {
    let graph = CsrGraph::new(row_offsets, col_indices)?;
    maximum_matching(&graph, num_threads)
}

/// compute a maximum matching on a general graph given in CSR format, returning the mate
/// array with `-1` for unmatched vertices
#[cfg(feature = "python_binding")]
#[pyfunction(num_threads = "8")]
#[allow(clippy::unnecessary_cast)]
fn max_matching_csr(row_offsets: Vec<usize>, column_indices: Vec<usize>, num_threads: usize) -> PyResult<Vec<i64>> {
    let row_offsets: Vec<EdgeIndex> = row_offsets.into_iter().map(|offset| offset as EdgeIndex).collect();
    let column_indices: Vec<VertexIndex> = column_indices.into_iter().map(|index| index as VertexIndex).collect();
    let matching = x_blossom_maximum_matching(row_offsets, column_indices, num_threads)
        .map_err(|error| pyo3::exceptions::PyValueError::new_err(error.to_string()))?;
    Ok(matching_to_signed(&matching))
}

#[cfg(feature = "python_binding")]
#[pymodule]
fn x_blossom(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(max_matching_csr, m)?)?;
    Ok(())
}
