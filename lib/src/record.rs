use serde::Serialize;

use crate::contingency::ContingencyCounts;
use crate::distance::{Coefficient, Dissimilarities};
use crate::entropy::EntropyData;
use crate::errors::{undefined_as_none, KmerDistResult};
use crate::sketch::SketchMeasure;
use crate::statistics::CountMeasures;

/// Entropy summary of one side of a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceEntropy {
    pub distinct: u64,
    pub double_total: u128,
    pub delta: f64,
    pub hk: f64,
    /// `None` when the sequence has zero entropy.
    pub error: Option<f64>,
}

impl SequenceEntropy {
    pub fn new(data: &EntropyData, name: &str) -> KmerDistResult<Self> {
        Ok(SequenceEntropy {
            distinct: data.distinct,
            double_total: 2 * u128::from(data.total),
            delta: data.delta(),
            hk: data.hk,
            error: undefined_as_none(data.error(), &format!("error bound of {}", name))?,
        })
    }

    /// Column names for `extend_row`, each ending in `suffix`.
    pub fn header(suffix: &str) -> Vec<String> {
        ["NKeys", "2*totalCnt", "delta", "Hk", "error"]
            .iter()
            .map(|column| format!("{}{}", column, suffix))
            .collect()
    }

    pub fn extend_row(&self, row: &mut Vec<String>) {
        row.push(self.distinct.to_string());
        row.push(self.double_total.to_string());
        row.push(self.delta.to_string());
        row.push(self.hk.to_string());
        row.push(optional(self.error));
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Everything computed for one sequence pair at one k.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DissimilarityRecord {
    pub seq_a: String,
    pub seq_b: String,
    pub k: u8,
    pub contingency: ContingencyCounts,
    pub dissimilarities: Dissimilarities,
    pub sketches: Vec<SketchMeasure>,
    pub counts: CountMeasures,
    pub entropy_a: SequenceEntropy,
    pub entropy_b: SequenceEntropy,
}

impl DissimilarityRecord {
    /// Column names of the tabular output, matching `to_row`.
    pub fn header(sketch_sizes: &[usize]) -> Vec<String> {
        let mut header: Vec<String> = ["seq1", "seq2", "k", "A", "B", "C", "D", "N"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(Coefficient::all().map(|c| c.name().to_string()));
        for size in sketch_sizes {
            header.push(format!("Mash Pv ({})", size));
            header.push(format!("Mash Distance({})", size));
            header.push(format!("A ({})", size));
            header.push(format!("N ({})", size));
        }
        header.extend(["D2", "Euclidean", "Euclid_norm"].iter().map(|s| s.to_string()));
        header.extend(SequenceEntropy::header("A"));
        header.extend(SequenceEntropy::header("B"));
        header
    }

    /// One row of the tabular output. Undefined values are left empty.
    pub fn to_row(&self) -> Vec<String> {
        let c = &self.contingency;
        let mut row = vec![
            self.seq_a.clone(),
            self.seq_b.clone(),
            self.k.to_string(),
            c.a.to_string(),
            c.b.to_string(),
            c.c.to_string(),
            c.d.to_string(),
            c.n.to_string(),
        ];
        row.extend(self.dissimilarities.values().iter().map(|v| v.to_string()));
        for sketch in &self.sketches {
            row.push(sketch.p_value.to_string());
            row.push(sketch.distance.to_string());
            row.push(sketch.common_hashes.to_string());
            row.push(sketch.total_hashes.to_string());
        }
        row.push(self.counts.d2.to_string());
        row.push(self.counts.euclidean.to_string());
        row.push(optional(self.counts.normalized_squared_euclidean));
        self.entropy_a.extend_row(&mut row);
        self.entropy_b.extend_row(&mut row);
        row
    }
}
