//! Image statistics: per-channel histograms and their cumulative distributions.

pub mod cdf;
pub mod histogram;

pub use cdf::Cdf;
pub use histogram::{BINS, Histogram};
