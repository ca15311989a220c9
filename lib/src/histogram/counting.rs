use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;
use needletail::{parse_fastx_file, Sequence};

use crate::errors::{KmerDistError, KmerDistResult};
use crate::histogram::{Histogram, HistogramSource, Kmer};

const NUCLEOTIDES: &[u8] = b"ACGT";
const TEXT_SYMBOLS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

/// The symbol set k-mers are drawn from; its size fixes the universe of
/// possible k-mers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alphabet {
    Nucleotide,
    /// Upper-cased letters, digits and a single space.
    Text,
}

impl Alphabet {
    pub fn symbols(self) -> &'static [u8] {
        match self {
            Alphabet::Nucleotide => NUCLEOTIDES,
            Alphabet::Text => TEXT_SYMBOLS,
        }
    }

    pub fn size(self) -> u32 {
        self.symbols().len() as u32
    }

    #[inline]
    pub fn contains(self, symbol: u8) -> bool {
        match self {
            Alphabet::Nucleotide => matches!(symbol, b'A' | b'C' | b'G' | b'T'),
            Alphabet::Text => {
                symbol.is_ascii_uppercase() || symbol.is_ascii_digit() || symbol == b' '
            }
        }
    }
}

/// Normalizes one line of free text: upper-case it, turn punctuation into
/// spaces, squeeze whitespace runs into one space and drop non-ASCII bytes.
pub fn normalize_text(line: &[u8]) -> Vec<u8> {
    let mut end = line.len();
    while end > 0 && line[end - 1].is_ascii_whitespace() {
        end -= 1;
    }

    let mut normalized = Vec::with_capacity(end);
    let mut in_space = false;
    for &byte in &line[..end] {
        let byte = if byte.is_ascii_punctuation() || byte.is_ascii_whitespace() {
            b' '
        } else {
            byte.to_ascii_uppercase()
        };
        if byte == b' ' {
            if in_space {
                continue;
            }
            in_space = true;
        } else {
            in_space = false;
        }
        normalized.push(byte);
    }
    normalized.retain(|b| b.is_ascii());
    normalized
}

fn count_windows(counts: &mut HashMap<Kmer, u64>, seq: &[u8], k: usize, alphabet: Alphabet) {
    if k == 0 || seq.len() < k {
        return;
    }
    for window in seq.windows(k) {
        if window.iter().all(|b| alphabet.contains(*b)) {
            *counts.entry(window.to_vec()).or_insert(0) += 1;
        }
    }
}

/// Counts k-mers in-process instead of shelling out to a k-mer counter.
///
/// Nucleotide input is read as FASTA/FASTQ and k-mers never span two
/// records; text input is read as a whole file and concatenated line by
/// line after normalization.
#[derive(Clone, Debug)]
pub struct CountingSource {
    pub alphabet: Alphabet,
}

impl CountingSource {
    pub fn new(alphabet: Alphabet) -> Self {
        CountingSource { alphabet }
    }

    pub fn count_sequence(&self, seq: &[u8], name: &str, k: u8) -> Histogram {
        let mut counts = HashMap::new();
        count_windows(&mut counts, seq, usize::from(k), self.alphabet);
        Histogram::new(name, k, counts.into_iter().collect())
    }
}

impl HistogramSource for CountingSource {
    fn histogram(&self, sequence: &Path, k: u8) -> KmerDistResult<Histogram> {
        if k == 0 {
            return Err(KmerDistError::Config("k-mer length must be positive".to_string()));
        }
        let name = sequence.to_string_lossy().to_string();
        let mut counts: HashMap<Kmer, u64> = HashMap::new();
        match self.alphabet {
            Alphabet::Nucleotide => {
                let mut reader = parse_fastx_file(sequence)?;
                while let Some(record) = reader.next() {
                    let record = record?;
                    let seq = record.normalize(false);
                    count_windows(&mut counts, &seq, usize::from(k), self.alphabet);
                }
            }
            Alphabet::Text => {
                let raw = fs::read(sequence)?;
                let mut text = Vec::with_capacity(raw.len());
                for line in raw.split(|b| *b == b'\n') {
                    text.extend(normalize_text(line));
                }
                count_windows(&mut counts, &text, usize::from(k), self.alphabet);
            }
        }
        debug!("counted {} distinct {}-mers in {}", counts.len(), k, name);
        Ok(Histogram::new(&name, k, counts.into_iter().collect()))
    }
}
