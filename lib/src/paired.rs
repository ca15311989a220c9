use std::collections::HashMap;
use std::fmt;

use log::debug;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::entropy::{EntropyAccumulator, EntropyData};
use crate::errors::KmerDistResult;
use crate::histogram::{Histogram, Kmer};
use crate::{format_err, integrity_err};

/// Which sequence of the pair a histogram belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// k-mer → (count in A, count in B) over the union of both histograms.
#[derive(Clone, Debug, Default)]
pub struct PairedCountTable {
    k: u8,
    counts: HashMap<Kmer, (u64, u64)>,
}

impl PairedCountTable {
    pub fn new(k: u8) -> Self {
        PairedCountTable {
            k,
            counts: HashMap::new(),
        }
    }

    pub fn k(&self) -> u8 {
        self.k
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn get(&self, kmer: &[u8]) -> Option<(u64, u64)> {
        self.counts.get(kmer).copied()
    }

    /// Adds a single entry; an entry absent from both sides can't exist.
    pub fn insert(&mut self, kmer: Kmer, counts: (u64, u64)) -> KmerDistResult<()> {
        if counts == (0, 0) {
            return Err(integrity_err!(
                "k-mer {} has a zero count on both sides",
                String::from_utf8_lossy(&kmer)
            ));
        }
        self.counts.insert(kmer, counts);
        Ok(())
    }

    /// Folds one side's histogram into the table in a single pass, computing
    /// that side's entropy on the way.
    ///
    /// Fails if the histogram disagrees with its own distinct k-mer count,
    /// has the wrong k, lists a k-mer twice or lists one with count 0.
    pub fn merge(&mut self, side: Side, histogram: Histogram) -> KmerDistResult<EntropyData> {
        if histogram.k != self.k {
            return Err(integrity_err!(
                "histogram {} has k={}, table has k={}",
                histogram.name,
                histogram.k,
                self.k
            ));
        }
        let name = histogram.name;
        let reported = histogram.reported_distinct;
        self.counts.reserve(histogram.records.len());

        let mut entropy = EntropyAccumulator::default();
        let mut iterated: u64 = 0;
        for (kmer, count) in histogram.records {
            // a zero slot below means "not seen yet"
            if count == 0 {
                return Err(integrity_err!(
                    "k-mer {} has count 0 in histogram {} ({})",
                    String::from_utf8_lossy(&kmer),
                    name,
                    side
                ));
            }
            iterated += 1;
            entropy.push(count);
            let entry = self.counts.entry(kmer).or_insert((0, 0));
            let slot = match side {
                Side::A => &mut entry.0,
                Side::B => &mut entry.1,
            };
            if *slot != 0 {
                return Err(integrity_err!(
                    "k-mer listed twice in histogram {} ({})",
                    name,
                    side
                ));
            }
            *slot = count;
        }

        if iterated != reported {
            return Err(integrity_err!(
                "loaded {} distinct k-mers from {} vs {} reported",
                iterated,
                name,
                reported
            ));
        }
        debug!(
            "merged {} k-mers from {} as side {}; table now has {} keys",
            iterated,
            name,
            side,
            self.counts.len()
        );
        entropy.finish()
    }

    /// Consumes the table into its dense two-row form; the hash table is
    /// released here.
    pub fn into_matrix(self) -> KmerDistResult<CountMatrix> {
        let n = self.counts.len();
        let mut data = Vec::with_capacity(2 * n);
        let mut right = Vec::with_capacity(n);
        for (_, (a, b)) in self.counts {
            data.push(a);
            right.push(b);
        }
        data.extend(right);
        let counts = Array2::from_shape_vec((2, n), data)
            .map_err(|e| format_err!("could not build count matrix: {}", e))?;
        Ok(CountMatrix { counts })
    }
}

/// The paired counts as a 2 × n matrix: row 0 is sequence A, row 1 is B, one
/// column per distinct k-mer.
#[derive(Clone, Debug, PartialEq)]
pub struct CountMatrix {
    counts: Array2<u64>,
}

impl CountMatrix {
    /// Builds a matrix straight from two count vectors. No check is made for
    /// columns that are zero on both sides; classifying the matrix will.
    pub fn from_columns(a: &[u64], b: &[u64]) -> KmerDistResult<Self> {
        if a.len() != b.len() {
            return Err(format_err!(
                "count vectors differ in length ({} vs {})",
                a.len(),
                b.len()
            ));
        }
        let mut data = Vec::with_capacity(a.len() * 2);
        data.extend_from_slice(a);
        data.extend_from_slice(b);
        let counts = Array2::from_shape_vec((2, a.len()), data)
            .map_err(|e| format_err!("could not build count matrix: {}", e))?;
        Ok(CountMatrix { counts })
    }

    pub fn len(&self) -> usize {
        self.counts.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.ncols() == 0
    }

    pub fn side(&self, side: Side) -> ArrayView1<u64> {
        self.counts.index_axis(Axis(0), side.index())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.side(Side::A)
            .into_iter()
            .zip(self.side(Side::B).into_iter())
            .map(|(a, b)| (*a, *b))
    }

    pub(crate) fn as_array(&self) -> &Array2<u64> {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(name: &str, records: &[(&str, u64)]) -> Histogram {
        Histogram::new(
            name,
            3,
            records
                .iter()
                .map(|(k, c)| (k.as_bytes().to_vec(), *c))
                .collect(),
        )
    }

    #[test]
    fn test_merge_two_sides() {
        let mut table = PairedCountTable::new(3);
        let entropy_a = table
            .merge(Side::A, hist("a", &[("ACG", 2), ("CGT", 3)]))
            .unwrap();
        let entropy_b = table
            .merge(Side::B, hist("b", &[("CGT", 4), ("GTA", 1)]))
            .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(b"ACG"), Some((2, 0)));
        assert_eq!(table.get(b"CGT"), Some((3, 4)));
        assert_eq!(table.get(b"GTA"), Some((0, 1)));
        assert_eq!(table.get(b"TTT"), None);

        assert_eq!((entropy_a.distinct, entropy_a.total), (2, 5));
        assert_eq!((entropy_b.distinct, entropy_b.total), (2, 5));
    }

    #[test]
    fn test_merge_reported_count_mismatch() {
        let mut table = PairedCountTable::new(3);
        let truncated = hist("a", &[("ACG", 2), ("CGT", 3)]).with_reported_distinct(3);
        let err = table.merge(Side::A, truncated).unwrap_err();
        assert!(err.is_integrity());
        assert!(err.to_string().contains("2 distinct k-mers"));
    }

    #[test]
    fn test_merge_rejects_wrong_k_and_duplicates() {
        let mut table = PairedCountTable::new(4);
        assert!(table
            .merge(Side::A, hist("a", &[("ACG", 2)]))
            .unwrap_err()
            .is_integrity());

        let mut table = PairedCountTable::new(3);
        assert!(table
            .merge(Side::B, hist("b", &[("ACG", 2), ("ACG", 1)]))
            .unwrap_err()
            .is_integrity());
    }

    #[test]
    fn test_merge_rejects_zero_counts() {
        // the zero must not hide the second ACG from the duplicate check
        let mut table = PairedCountTable::new(3);
        let err = table
            .merge(Side::A, hist("a", &[("ACG", 0), ("ACG", 5)]))
            .unwrap_err();
        assert!(err.is_integrity());
        assert!(err.to_string().contains("count 0"));

        let mut table = PairedCountTable::new(3);
        table.merge(Side::A, hist("a", &[("CGT", 1)])).unwrap();
        assert!(table
            .merge(Side::B, hist("b", &[("ACG", 0)]))
            .unwrap_err()
            .is_integrity());
        assert_eq!(table.get(b"ACG"), None);
    }

    #[test]
    fn test_insert_rejects_double_zero() {
        let mut table = PairedCountTable::new(3);
        assert!(table.insert(b"ACG".to_vec(), (0, 0)).is_err());
        table.insert(b"ACG".to_vec(), (0, 1)).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_into_matrix_keeps_pairs() {
        let mut table = PairedCountTable::new(3);
        table.merge(Side::A, hist("a", &[("ACG", 2), ("CGT", 3)])).unwrap();
        table.merge(Side::B, hist("b", &[("CGT", 4)])).unwrap();
        let matrix = table.into_matrix().unwrap();
        assert_eq!(matrix.len(), 2);
        let mut pairs: Vec<_> = matrix.pairs().collect();
        pairs.sort();
        assert_eq!(pairs, vec![(2, 0), (3, 4)]);
        assert_eq!(matrix.side(Side::A).sum(), 5);
        assert_eq!(matrix.side(Side::B).sum(), 4);
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        assert!(CountMatrix::from_columns(&[1, 2], &[1]).is_err());
        let matrix = CountMatrix::from_columns(&[], &[]).unwrap();
        assert!(matrix.is_empty());
    }
}
