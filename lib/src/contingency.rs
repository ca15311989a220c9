use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{KmerDistError, KmerDistResult};
use crate::integrity_err;
use crate::paired::CountMatrix;

/// Number of possible k-mers over an alphabet of `alphabet_size` symbols.
pub fn universe_size(alphabet_size: u32, k: u8) -> KmerDistResult<u128> {
    if alphabet_size == 0 || k == 0 {
        return Err(KmerDistError::Config(format!(
            "alphabet size ({}) and k ({}) must be positive",
            alphabet_size, k
        )));
    }
    u128::from(alphabet_size)
        .checked_pow(u32::from(k))
        .ok_or_else(|| {
            KmerDistError::Config(format!(
                "{}^{} possible k-mers overflows 128 bits",
                alphabet_size, k
            ))
        })
}

/// The 2×2 presence/absence table of a sequence pair over the k-mer universe.
///
/// `a` counts k-mers present in both sequences, `b` those only in A, `c`
/// those only in B and `d` those in neither; `a + b + c + d == n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyCounts {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u128,
    pub n: u128,
}

impl ContingencyCounts {
    /// Derives `d` from the observed classes; the absent k-mers are never
    /// enumerated.
    pub fn new(a: u64, b: u64, c: u64, n: u128) -> KmerDistResult<Self> {
        let observed = u128::from(a) + u128::from(b) + u128::from(c);
        if observed > n {
            return Err(integrity_err!(
                "{} observed k-mers exceed the universe of {}",
                observed,
                n
            ));
        }
        Ok(ContingencyCounts {
            a,
            b,
            c,
            d: n - observed,
            n,
        })
    }

    /// Classifies every column of the paired counts.
    pub fn classify(matrix: &CountMatrix, n: u128) -> KmerDistResult<Self> {
        let (mut both, mut left, mut right) = (0u64, 0u64, 0u64);
        for (count_a, count_b) in matrix.pairs() {
            match (count_a > 0, count_b > 0) {
                (true, true) => both += 1,
                (true, false) => left += 1,
                (false, true) => right += 1,
                (false, false) => {
                    return Err(integrity_err!("double 0 in k-mer histogram"));
                }
            }
        }
        debug!("both: {}, left: {}, right: {}", both, left, right);
        ContingencyCounts::new(both, left, right, n)
    }

    pub fn observed(&self) -> u128 {
        u128::from(self.a) + u128::from(self.b) + u128::from(self.c)
    }
}
