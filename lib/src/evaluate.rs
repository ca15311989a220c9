use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::contingency::{universe_size, ContingencyCounts};
use crate::distance::Dissimilarities;
use crate::entropy::EntropyData;
use crate::errors::{KmerDistError, KmerDistResult};
use crate::histogram::{Histogram, HistogramSource};
use crate::paired::{PairedCountTable, Side};
use crate::record::{DissimilarityRecord, SequenceEntropy};
use crate::sketch::{sketch_measures, SketchTool};
use crate::statistics::CountMeasures;

pub const DEFAULT_SKETCH_SIZES: [usize; 3] = [1000, 10000, 100000];

/// The sweep every sequence pair is evaluated over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalParams {
    pub alphabet_size: u32,
    pub min_k: u8,
    pub max_k: u8,
    pub step_k: u8,
    pub sketch_sizes: Vec<usize>,
}

impl Default for EvalParams {
    fn default() -> Self {
        EvalParams {
            alphabet_size: 4,
            min_k: 4,
            max_k: 32,
            step_k: 4,
            sketch_sizes: DEFAULT_SKETCH_SIZES.to_vec(),
        }
    }
}

impl EvalParams {
    /// The k-mer lengths to evaluate, smallest first.
    pub fn k_values(&self) -> KmerDistResult<Vec<u8>> {
        if self.min_k == 0 || self.step_k == 0 {
            return Err(KmerDistError::Config(
                "k and its step must be positive".to_string(),
            ));
        }
        if self.min_k > self.max_k {
            return Err(KmerDistError::Config(format!(
                "minimum k ({}) is larger than maximum k ({})",
                self.min_k, self.max_k
            )));
        }
        let ks: Vec<u8> = (self.min_k..=self.max_k)
            .step_by(usize::from(self.step_k))
            .collect();
        // fail up front rather than once per pair
        for k in &ks {
            universe_size(self.alphabet_size, *k)?;
        }
        Ok(ks)
    }
}

/// Two sequences to compare, named after their file stems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequencePair {
    pub name_a: String,
    pub name_b: String,
    pub path_a: PathBuf,
    pub path_b: PathBuf,
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_else(|| path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

impl SequencePair {
    pub fn new(path_a: &Path, path_b: &Path) -> Self {
        SequencePair {
            name_a: stem(path_a),
            name_b: stem(path_b),
            path_a: path_a.to_path_buf(),
            path_b: path_b.to_path_buf(),
        }
    }
}

/// Everything derived from the two histograms of a pair.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramComparison {
    pub contingency: ContingencyCounts,
    pub dissimilarities: Dissimilarities,
    pub counts: CountMeasures,
    pub entropy_a: EntropyData,
    pub entropy_b: EntropyData,
}

/// Merges both histograms into one paired table and computes every
/// histogram-derived measure from it.
///
/// The table and the count matrix built from it are dropped before this
/// returns; only the scalar results survive.
pub fn compare_histograms(
    hist_a: Histogram,
    hist_b: Histogram,
    alphabet_size: u32,
) -> KmerDistResult<HistogramComparison> {
    if hist_a.k != hist_b.k {
        return Err(KmerDistError::Config(format!(
            "can't compare a k={} histogram with a k={} histogram",
            hist_a.k, hist_b.k
        )));
    }
    let n = universe_size(alphabet_size, hist_a.k)?;

    let mut table = PairedCountTable::new(hist_a.k);
    let entropy_a = table.merge(Side::A, hist_a)?;
    let entropy_b = table.merge(Side::B, hist_b)?;
    debug!("paired table holds {} k-mers", table.len());
    let matrix = table.into_matrix()?;

    let counts = CountMeasures::new(&matrix)?;
    let contingency = ContingencyCounts::classify(&matrix, n)?;
    drop(matrix);

    Ok(HistogramComparison {
        dissimilarities: Dissimilarities::new(&contingency),
        contingency,
        counts,
        entropy_a,
        entropy_b,
    })
}

/// The outcome of one (pair, k) job of a batch.
#[derive(Debug)]
pub struct Evaluation {
    pub pair: SequencePair,
    pub k: u8,
    pub result: KmerDistResult<DissimilarityRecord>,
}

/// Evaluates sequence pairs with a histogram source and, optionally, an
/// external sketch estimator.
pub struct PairEvaluator<'a> {
    params: EvalParams,
    histograms: &'a dyn HistogramSource,
    sketcher: Option<&'a dyn SketchTool>,
}

impl<'a> PairEvaluator<'a> {
    pub fn new(params: EvalParams, histograms: &'a dyn HistogramSource) -> Self {
        PairEvaluator {
            params,
            histograms,
            sketcher: None,
        }
    }

    pub fn with_sketch_tool(mut self, sketcher: &'a dyn SketchTool) -> Self {
        self.sketcher = Some(sketcher);
        self
    }

    pub fn params(&self) -> &EvalParams {
        &self.params
    }

    /// The sketch sizes that end up in each record.
    pub fn sketch_sizes(&self) -> &[usize] {
        match self.sketcher {
            Some(_) => self.params.sketch_sizes.as_slice(),
            None => &[],
        }
    }

    pub fn evaluate(&self, pair: &SequencePair, k: u8) -> KmerDistResult<DissimilarityRecord> {
        info!("comparing {} and {} at k={}", pair.name_a, pair.name_b, k);
        let hist_a = self.histograms.histogram(&pair.path_a, k)?;
        let hist_b = self.histograms.histogram(&pair.path_b, k)?;
        let comparison = compare_histograms(hist_a, hist_b, self.params.alphabet_size)?;

        let sketches = match self.sketcher {
            Some(tool) => sketch_measures(
                tool,
                &pair.path_a,
                &pair.path_b,
                &self.params.sketch_sizes,
                k,
            )?,
            None => Vec::new(),
        };

        Ok(DissimilarityRecord {
            seq_a: pair.name_a.clone(),
            seq_b: pair.name_b.clone(),
            k,
            contingency: comparison.contingency,
            dissimilarities: comparison.dissimilarities,
            sketches,
            counts: comparison.counts,
            entropy_a: SequenceEntropy::new(&comparison.entropy_a, &pair.name_a)?,
            entropy_b: SequenceEntropy::new(&comparison.entropy_b, &pair.name_b)?,
        })
    }

    /// Runs every (pair, k) combination in parallel. A failing combination
    /// doesn't stop the others; results come back in pair-then-k order.
    pub fn evaluate_batch(&self, pairs: &[SequencePair]) -> KmerDistResult<Vec<Evaluation>> {
        let ks = self.params.k_values()?;
        let jobs: Vec<(&SequencePair, u8)> = pairs
            .iter()
            .flat_map(|pair| ks.iter().map(move |k| (pair, *k)))
            .collect();
        Ok(jobs
            .par_iter()
            .map(|(pair, k)| Evaluation {
                pair: (*pair).clone(),
                k: *k,
                result: self.evaluate(pair, *k),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Coefficient, UNDEFINED};
    use crate::sketch::SketchMeasure;
    use std::collections::HashMap;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn histogram(k: u8, records: &[(&str, u64)]) -> Histogram {
        Histogram::new(
            "test",
            k,
            records
                .iter()
                .map(|(kmer, count)| (kmer.as_bytes().to_vec(), *count))
                .collect(),
        )
    }

    /// Serves fixed histograms keyed by file name; k-mers are truncated to k.
    struct MemorySource {
        sequences: HashMap<PathBuf, Vec<(&'static str, u64)>>,
    }

    impl HistogramSource for MemorySource {
        fn histogram(&self, sequence: &Path, k: u8) -> KmerDistResult<Histogram> {
            let records = self.sequences.get(sequence).ok_or_else(|| {
                KmerDistError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{}", sequence.display()),
                ))
            })?;
            let mut merged: HashMap<Vec<u8>, u64> = HashMap::new();
            for (kmer, count) in records {
                let end = usize::from(k).min(kmer.len());
                *merged.entry(kmer.as_bytes()[..end].to_vec()).or_insert(0) += count;
            }
            let mut records: Vec<_> = merged.into_iter().collect();
            records.sort();
            Ok(Histogram::new(&sequence.to_string_lossy(), k, records))
        }
    }

    fn memory_source() -> MemorySource {
        let mut sequences = HashMap::new();
        sequences.insert(
            PathBuf::from("a.fa"),
            vec![("ACGTACGT", 2), ("CCCCAAAA", 1), ("GGGGTTTT", 3)],
        );
        sequences.insert(
            PathBuf::from("b.fa"),
            vec![("ACGTACGT", 1), ("TTTTGGGG", 5)],
        );
        MemorySource { sequences }
    }

    struct FixedTool;

    impl SketchTool for FixedTool {
        fn compare(&self, _: &Path, _: &Path, sketch_size: usize, _: u8) -> KmerDistResult<SketchMeasure> {
            Ok(SketchMeasure {
                sketch_size,
                p_value: 1e-10,
                distance: 0.2,
                common_hashes: 3,
                total_hashes: sketch_size as u64,
            })
        }
    }

    #[test]
    fn test_k_values() {
        assert_eq!(
            EvalParams::default().k_values().unwrap(),
            vec![4, 8, 12, 16, 20, 24, 28, 32]
        );
        let params = EvalParams {
            min_k: 3,
            max_k: 10,
            step_k: 3,
            ..EvalParams::default()
        };
        assert_eq!(params.k_values().unwrap(), vec![3, 6, 9]);

        let bad = EvalParams {
            min_k: 8,
            max_k: 4,
            ..EvalParams::default()
        };
        assert!(bad.k_values().is_err());
        let text = EvalParams {
            alphabet_size: 37,
            ..EvalParams::default()
        };
        assert!(text.k_values().is_err());
    }

    #[test]
    fn test_pair_names_from_stems() {
        let pair = SequencePair::new(Path::new("dir/first.fasta"), Path::new("second.fq"));
        assert_eq!(pair.name_a, "first");
        assert_eq!(pair.name_b, "second");
    }

    #[test]
    fn test_compare_identical_histograms() {
        init();
        let records = [("AAAA", 3), ("ACGT", 1), ("TTTT", 2)];
        let comparison =
            compare_histograms(histogram(4, &records), histogram(4, &records), 4).unwrap();
        let c = comparison.contingency;
        assert_eq!((c.a, c.b, c.c, c.d, c.n), (3, 0, 0, 253, 256));
        assert_eq!(comparison.dissimilarities.get(Coefficient::Jaccard), 0.0);
        assert_eq!(comparison.dissimilarities.get(Coefficient::Hamming), 0.0);
        assert_eq!(comparison.counts.d2, 14);
        assert_eq!(comparison.counts.euclidean, 0.0);
        assert_eq!(comparison.counts.normalized_squared_euclidean, Some(0.0));
        assert_eq!(comparison.entropy_a, comparison.entropy_b);
        assert_eq!(comparison.entropy_a.total, 6);
    }

    #[test]
    fn test_compare_mismatched_k() {
        let err = compare_histograms(
            histogram(4, &[("AAAA", 1)]),
            histogram(5, &[("AAAAA", 1)]),
            4,
        )
        .unwrap_err();
        assert!(matches!(err, KmerDistError::Config(_)));
    }

    #[test]
    fn test_truncated_histogram_is_integrity_error() {
        let truncated = histogram(4, &[("AAAA", 1), ("ACGT", 2)]).with_reported_distinct(3);
        let err = compare_histograms(histogram(4, &[("AAAA", 1)]), truncated, 4).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn test_evaluate_with_sketches() {
        init();
        let source = memory_source();
        let params = EvalParams {
            sketch_sizes: vec![10, 100],
            ..EvalParams::default()
        };
        let evaluator = PairEvaluator::new(params, &source).with_sketch_tool(&FixedTool);
        assert_eq!(evaluator.sketch_sizes(), &[10, 100]);
        let pair = SequencePair::new(Path::new("a.fa"), Path::new("b.fa"));
        let record = evaluator.evaluate(&pair, 8).unwrap();

        assert_eq!(record.seq_a, "a");
        assert_eq!(record.k, 8);
        let c = record.contingency;
        assert_eq!((c.a, c.b, c.c), (1, 2, 1));
        assert_eq!(c.n, 65536);
        assert_eq!(record.sketches.len(), 2);
        assert_eq!(record.sketches[1].total_hashes, 100);
        assert_eq!(record.to_row().len(), DissimilarityRecord::header(&[10, 100]).len());
    }

    #[test]
    fn test_single_kmer_sequence_keeps_record() {
        let records = [("AAAA", 3)];
        let mut sequences = HashMap::new();
        sequences.insert(PathBuf::from("x"), records.to_vec());
        sequences.insert(PathBuf::from("y"), records.to_vec());
        let source = MemorySource { sequences };
        let evaluator = PairEvaluator::new(EvalParams::default(), &source);
        let record = evaluator
            .evaluate(&SequencePair::new(Path::new("x"), Path::new("y")), 4)
            .unwrap();
        assert_eq!(record.entropy_a.hk, 0.0);
        assert_eq!(record.entropy_a.error, None);
        assert_eq!(record.counts.normalized_squared_euclidean, None);
        assert!(record.sketches.is_empty());
        assert_ne!(record.dissimilarities.get(Coefficient::Jaccard), UNDEFINED);
    }

    #[test]
    fn test_batch_isolates_failures() {
        init();
        let source = memory_source();
        let params = EvalParams {
            min_k: 4,
            max_k: 8,
            step_k: 4,
            ..EvalParams::default()
        };
        let evaluator = PairEvaluator::new(params, &source);
        let pairs = vec![
            SequencePair::new(Path::new("a.fa"), Path::new("b.fa")),
            SequencePair::new(Path::new("a.fa"), Path::new("missing.fa")),
        ];
        let results = evaluator.evaluate_batch(&pairs).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(
            results.iter().map(|e| e.k).collect::<Vec<_>>(),
            vec![4, 8, 4, 8]
        );
        assert!(results[0].result.is_ok());
        assert!(results[1].result.is_ok());
        assert!(results[2].result.is_err());
        assert_eq!(results[3].pair.name_b, "missing");
    }
}
