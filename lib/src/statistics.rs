use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::errors::{undefined_as_none, KmerDistError, KmerDistResult};
use crate::paired::CountMatrix;

/// D2 statistic: Σ countA · countB over every k-mer.
pub fn d2(counts: &CountMatrix) -> u128 {
    counts
        .pairs()
        .map(|(a, b)| u128::from(a) * u128::from(b))
        .sum()
}

/// √(Σ (countA − countB)²)
pub fn euclidean(counts: &CountMatrix) -> f64 {
    let total: u128 = counts
        .pairs()
        .map(|(a, b)| {
            let diff = u128::from(a.max(b) - a.min(b));
            diff * diff
        })
        .sum();
    (total as f64).sqrt()
}

/// ½ · Var(countA − countB) / (Var(countA) + Var(countB)), with population
/// variances taken across the k-mers of the table.
///
/// Undefined when both count vectors are constant.
pub fn normalized_squared_euclidean(counts: &CountMatrix) -> KmerDistResult<f64> {
    if counts.is_empty() {
        return Err(KmerDistError::Domain(
            "no k-mers, variance undefined".to_string(),
        ));
    }
    let values = counts.as_array().mapv(|x| x as f64);
    let variances = values.var_axis(Axis(1), 0.);
    let diff = (&values.row(0) - &values.row(1)).insert_axis(Axis(0));
    let diff_variance = diff.var_axis(Axis(1), 0.)[0];

    let denominator = variances[0] + variances[1];
    if denominator == 0.0 {
        return Err(KmerDistError::Domain(
            "both count vectors have zero variance".to_string(),
        ));
    }
    Ok(0.5 * diff_variance / denominator)
}

/// The count-weighted measures of one paired table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountMeasures {
    pub d2: u128,
    pub euclidean: f64,
    /// `None` when the distance is undefined for these counts.
    pub normalized_squared_euclidean: Option<f64>,
}

impl CountMeasures {
    pub fn new(counts: &CountMatrix) -> KmerDistResult<Self> {
        Ok(CountMeasures {
            d2: d2(counts),
            euclidean: euclidean(counts),
            normalized_squared_euclidean: undefined_as_none(
                normalized_squared_euclidean(counts),
                "normalized squared euclidean distance",
            )?,
        })
    }
}
