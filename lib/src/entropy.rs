use serde::{Deserialize, Serialize};

use crate::errors::{KmerDistError, KmerDistResult};
use crate::integrity_err;

/// Distinct k-mers, total k-mer occurrences and Shannon entropy (in bits) of
/// one sequence's k-mer distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntropyData {
    pub distinct: u64,
    pub total: u64,
    pub hk: f64,
}

impl EntropyData {
    /// δ = distinct / (2 · total)
    pub fn delta(&self) -> f64 {
        self.distinct as f64 / (2.0 * self.total as f64)
    }

    /// The sampling error bound δ / Hk.
    ///
    /// A sequence made of a single distinct k-mer has no entropy and the
    /// bound is undefined.
    pub fn error(&self) -> KmerDistResult<f64> {
        if self.hk == 0.0 {
            return Err(KmerDistError::Domain(format!(
                "entropy is 0 ({} distinct k-mers), error bound undefined",
                self.distinct
            )));
        }
        Ok(self.delta() / self.hk)
    }
}

/// Single-pass fold of one side's counts into its entropy.
///
/// Uses Hk = log2(T) − Σ c·log2(c) / T so the total T doesn't have to be
/// known before the counts are seen.
#[derive(Clone, Debug, Default)]
pub struct EntropyAccumulator {
    distinct: u64,
    nonzero: u64,
    total: u64,
    mass: f64,
    weighted_log: f64,
}

impl EntropyAccumulator {
    #[inline]
    pub fn push(&mut self, count: u64) {
        self.distinct += 1;
        if count == 0 {
            return;
        }
        let c = count as f64;
        self.nonzero += 1;
        self.total += count;
        self.mass += c;
        self.weighted_log += c * c.log2();
    }

    pub fn finish(self) -> KmerDistResult<EntropyData> {
        let total = self.total as f64;
        let probability_mass = self.mass / total;
        if probability_mass.round() != 1.0 {
            return Err(integrity_err!(
                "sum of k-mer probabilities is {}, must be 1.0",
                probability_mass
            ));
        }
        let hk = if self.nonzero <= 1 {
            0.0
        } else {
            f64::max(0.0, total.log2() - self.weighted_log / total)
        };
        Ok(EntropyData {
            distinct: self.distinct,
            total: self.total,
            hk,
        })
    }
}

/// Entropy of a whole count vector (e.g. one side of a paired table).
pub fn sequence_entropy<I>(counts: I) -> KmerDistResult<EntropyData>
where
    I: IntoIterator<Item = u64>,
{
    let mut acc = EntropyAccumulator::default();
    for count in counts {
        acc.push(count);
    }
    acc.finish()
}
