//! Pairwise dissimilarity of sequences from their k-mer histograms.
//!
//! For each pair of sequences and each k of a sweep, the two histograms are
//! merged into one paired count table from which the presence/absence
//! contingency counts, fifteen binary dissimilarity coefficients, the D2
//! and Euclidean count distances and the per-sequence entropies are derived.
//! Optionally an external sketching tool (mash) is run alongside.

pub mod contingency;
pub mod distance;
pub mod entropy;
pub mod errors;
pub mod evaluate;
mod external;
pub mod histogram;
pub mod paired;
pub mod record;
pub mod sketch;
pub mod statistics;

pub use crate::errors::{KmerDistError, KmerDistResult};
pub use crate::evaluate::{
    compare_histograms, EvalParams, Evaluation, PairEvaluator, SequencePair,
};
pub use crate::histogram::{Histogram, HistogramSource};
pub use crate::record::DissimilarityRecord;
