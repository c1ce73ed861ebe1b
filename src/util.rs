use crate::rand_xoshiro::rand_core::RngCore;
use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(feature="u32_index")] {
        // use u32 to store index, for less memory usage
        pub type VertexIndex = u32;  // the vertex index in the input graph
        pub type EdgeIndex = u32;  // the position of an arc inside the CSR column array
    } else {
        pub type VertexIndex = usize;
        pub type EdgeIndex = usize;
    }
}

pub type VertexNum = VertexIndex;

/// "no vertex": the in-memory encoding of `-1` in the matching vector;
/// only the CLI and the Python binding translate it back to a signed `-1`
pub const SENTINEL: VertexIndex = VertexIndex::MAX;

/// the same sentinel for the `usize`-typed phase state cells, independent of the `u32_index` feature
pub const NO_VERTEX: usize = usize::MAX;

/// errors that terminate the caller; the search itself has no recoverable errors
#[derive(Error, Debug)]
pub enum MatchingError {
    /// offsets not monotonic, final offset disagreeing with the arc count, or column index out of range
    #[error("invalid CSR input: {0}")]
    InvalidCsr(String),
    /// the solver requires at least one worker thread
    #[error("invalid thread count: {0}, at least 1 required")]
    InvalidThreadCount(usize),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(dead_code)]
/// use Xoshiro256StarStar for deterministic random number generator
pub type DeterministicRng = rand_xoshiro::Xoshiro256StarStar;

pub trait F64Rng {
    fn next_f64(&mut self) -> f64;
}

impl F64Rng for DeterministicRng {
    fn next_f64(&mut self) -> f64 {
        f64::from_bits(0x3FF << 52 | self.next_u64() >> 12) - 1.
    }
}

/// the number of matched pairs in a matching vector
pub fn matching_cardinality(matching: &[VertexIndex]) -> usize {
    matching.iter().filter(|&&mate| mate != SENTINEL).count() / 2
}

/// convert a matching vector to the signed representation used at the CLI/FFI boundary
#[allow(clippy::unnecessary_cast)]
pub fn matching_to_signed(matching: &[VertexIndex]) -> Vec<i64> {
    matching
        .iter()
        .map(|&mate| if mate == SENTINEL { -1 } else { mate as i64 })
        .collect()
}
