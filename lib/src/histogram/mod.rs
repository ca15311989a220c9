pub mod counting;
pub mod kmc;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::debug;

use crate::bail;
use crate::errors::KmerDistResult;
pub use counting::{Alphabet, CountingSource};
pub use kmc::KmcSource;

pub type Kmer = Vec<u8>;

/// The k-mer counts of one sequence for one k-mer length.
///
/// `reported_distinct` is the number of distinct k-mers the producer of the
/// histogram claims to have written; it's checked against the records
/// actually iterated when the histogram is merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Histogram {
    pub name: String,
    pub k: u8,
    pub records: Vec<(Kmer, u64)>,
    pub reported_distinct: u64,
}

impl Histogram {
    pub fn new(name: &str, k: u8, records: Vec<(Kmer, u64)>) -> Self {
        let reported_distinct = records.len() as u64;
        Histogram {
            name: name.to_string(),
            k,
            records,
            reported_distinct,
        }
    }

    pub fn with_reported_distinct(mut self, reported_distinct: u64) -> Self {
        self.reported_distinct = reported_distinct;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        self.records.iter().map(|(_, count)| *count).sum()
    }
}

impl IntoIterator for Histogram {
    type Item = (Kmer, u64);
    type IntoIter = std::vec::IntoIter<(Kmer, u64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Anything that can produce the k-mer histogram of a sequence.
pub trait HistogramSource: Sync {
    fn histogram(&self, sequence: &Path, k: u8) -> KmerDistResult<Histogram>;
}

/// Parses a `kmc_dump`-style text histogram: one `KMER COUNT` pair per line.
///
/// If `k` is `None` it's taken from the first k-mer; every k-mer must have
/// the same length.
pub fn read_dump(reader: &mut dyn BufRead, name: &str, k: Option<u8>) -> KmerDistResult<Histogram> {
    let mut k = k;
    let mut records = Vec::new();
    for (ix, line) in reader.lines().enumerate() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            bail!(
                "{} line {}: malformed histogram record ({} tokens)",
                name,
                ix + 1,
                tokens.len()
            );
        }
        let kmer = tokens[0].as_bytes().to_vec();
        let count: u64 = tokens[1].parse()?;
        match k {
            None => {
                if kmer.len() > usize::from(u8::MAX) {
                    bail!("{}: k-mer of length {} is too long", name, kmer.len());
                }
                k = Some(kmer.len() as u8)
            }
            Some(k) if usize::from(k) != kmer.len() => bail!(
                "{} line {}: expected a k-mer of length {}, found {}",
                name,
                ix + 1,
                k,
                kmer.len()
            ),
            _ => {}
        }
        records.push((kmer, count));
    }
    debug!("read {} histogram records from {}", records.len(), name);
    Ok(Histogram::new(name, k.unwrap_or(0), records))
}

/// Reads pre-computed dump files.
///
/// A `{k}` in the sequence path is replaced by the k-mer length so a k sweep
/// can point at one file per k, e.g. `hist/k={k}-seqA.txt`.
#[derive(Clone, Debug, Default)]
pub struct DumpSource;

impl DumpSource {
    pub fn dump_path(sequence: &Path, k: u8) -> PathBuf {
        PathBuf::from(sequence.to_string_lossy().replace("{k}", &k.to_string()))
    }
}

impl HistogramSource for DumpSource {
    fn histogram(&self, sequence: &Path, k: u8) -> KmerDistResult<Histogram> {
        let path = DumpSource::dump_path(sequence, k);
        let name = path.to_string_lossy().to_string();
        let mut reader = BufReader::new(File::open(&path)?);
        read_dump(&mut reader, &name, Some(k))
    }
}
