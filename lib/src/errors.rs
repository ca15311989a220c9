use std::result::Result as StdResult;

use log::warn;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KmerDistError {
    #[error("failed to load/read/write file: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse the fasta/fastq file: {0}")]
    Needletail(#[from] needletail::errors::ParseError),
    #[error("failed to parse as integer")]
    IntError(#[from] core::num::ParseIntError),
    #[error("failed to parse as float")]
    FloatError(#[from] core::num::ParseFloatError),
    /// The input data contradicts itself (truncated histograms, impossible
    /// table entries, probabilities that don't sum to one).
    #[error("integrity error: {0}")]
    Integrity(String),
    /// A statistic is mathematically undefined for this input.
    #[error("domain error: {0}")]
    Domain(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{tool} failed: {message}")]
    External { tool: String, message: String },
    #[error("kmerdist error: {0}")]
    Message(String),
}

pub type KmerDistResult<T> = StdResult<T, KmerDistError>;

/// Keeps a statistic that may be undefined for the data at hand: a domain
/// error becomes `None` (and a warning), anything else is passed through.
pub fn undefined_as_none(result: KmerDistResult<f64>, what: &str) -> KmerDistResult<Option<f64>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(KmerDistError::Domain(message)) => {
            warn!("{} undefined: {}", what, message);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl KmerDistError {
    pub fn is_domain(&self) -> bool {
        matches!(self, KmerDistError::Domain(_))
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, KmerDistError::Integrity(_))
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::KmerDistError::Message($e.to_owned()));
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::KmerDistError::Message(format!($fmt, $($arg)*)))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! format_err {
    ($($arg:tt)*) => { $crate::errors::KmerDistError::Message(format!($($arg)*)) }
}

/// Shorthand for returning an `Integrity` error.
#[doc(hidden)]
#[macro_export]
macro_rules! integrity_err {
    ($($arg:tt)*) => { $crate::errors::KmerDistError::Integrity(format!($($arg)*)) }
}
