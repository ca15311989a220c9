use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::errors::{KmerDistError, KmerDistResult};
use crate::external::{run_tool, scratch_dir};
use crate::histogram::{read_dump, Histogram, HistogramSource};

/// Counts k-mers with KMC and reads its output back through `kmc_dump`.
///
/// Every call works in its own temporary directory which is removed when
/// the call returns, whether it succeeded or not.
#[derive(Clone, Debug)]
pub struct KmcSource {
    pub kmc: PathBuf,
    pub kmc_dump: PathBuf,
    pub memory_gb: u32,
    /// Parent of the per-call directories; the system temp dir if `None`.
    pub temp_root: Option<PathBuf>,
}

impl Default for KmcSource {
    fn default() -> Self {
        KmcSource {
            kmc: PathBuf::from("kmc"),
            kmc_dump: PathBuf::from("kmc_dump"),
            memory_gb: 2,
            temp_root: None,
        }
    }
}

impl KmcSource {
    pub fn new(kmc: &Path, kmc_dump: &Path) -> Self {
        KmcSource {
            kmc: kmc.to_path_buf(),
            kmc_dump: kmc_dump.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_temp_root(mut self, root: &Path) -> Self {
        self.temp_root = Some(root.to_path_buf());
        self
    }
}

/// Pulls the distinct k-mer count out of the summary KMC prints on stdout.
pub fn parse_unique_count(report: &str) -> KmerDistResult<u64> {
    for line in report.lines() {
        if line.contains("unique counted k-mers") {
            if let Some(value) = line.rsplit(':').next() {
                return Ok(value.trim().parse()?);
            }
        }
    }
    Err(KmerDistError::External {
        tool: "kmc".to_string(),
        message: "no unique k-mer count in report".to_string(),
    })
}

impl HistogramSource for KmcSource {
    fn histogram(&self, sequence: &Path, k: u8) -> KmerDistResult<Histogram> {
        let workdir = scratch_dir("kmerdist-kmc", self.temp_root.as_deref())?;
        let db = workdir.path().join(format!("k={}", k));
        let dump = workdir.path().join(format!("k={}.txt", k));

        // non-canonical k-mers (-b), multi-fasta input, keep every count
        let output = run_tool(
            "kmc",
            Command::new(&self.kmc)
                .arg("-b")
                .arg("-hp")
                .arg(format!("-k{}", k))
                .arg(format!("-m{}", self.memory_gb))
                .arg("-fm")
                .arg("-ci0")
                .arg("-cs1048575")
                .arg("-cx1000000")
                .arg(sequence)
                .arg(&db)
                .arg(workdir.path()),
        )?;
        let reported = parse_unique_count(&String::from_utf8_lossy(&output.stdout))?;

        run_tool("kmc_dump", Command::new(&self.kmc_dump).arg(&db).arg(&dump))?;
        let name = sequence.to_string_lossy().to_string();
        let mut reader = BufReader::new(File::open(&dump)?);
        let histogram = read_dump(&mut reader, &name, Some(k))?;
        debug!(
            "kmc reported {} distinct {}-mers for {}",
            reported, k, name
        );
        Ok(histogram.with_reported_distinct(reported))
    }
}
