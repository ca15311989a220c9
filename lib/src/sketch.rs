use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{KmerDistError, KmerDistResult};
use crate::external::{run_tool, scratch_dir};

/// What the external sketching tool reports for one pair at one sketch size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchMeasure {
    pub sketch_size: usize,
    pub p_value: f64,
    pub distance: f64,
    pub common_hashes: u64,
    pub total_hashes: u64,
}

/// A sketch-based distance estimator living outside this crate.
pub trait SketchTool: Sync {
    fn compare(
        &self,
        seq_a: &Path,
        seq_b: &Path,
        sketch_size: usize,
        k: u8,
    ) -> KmerDistResult<SketchMeasure>;
}

/// Runs `compare` once per configured sketch size.
pub fn sketch_measures(
    tool: &dyn SketchTool,
    seq_a: &Path,
    seq_b: &Path,
    sketch_sizes: &[usize],
    k: u8,
) -> KmerDistResult<Vec<SketchMeasure>> {
    sketch_sizes
        .iter()
        .map(|size| tool.compare(seq_a, seq_b, *size, k))
        .collect()
}

fn malformed(message: String) -> KmerDistError {
    KmerDistError::External {
        tool: "mash".to_string(),
        message,
    }
}

/// Parses the first line of `mash dist` output:
/// `reference query distance p-value shared/total`.
pub fn parse_mash_dist(output: &str, sketch_size: usize) -> KmerDistResult<SketchMeasure> {
    let line = output
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| malformed("empty dist output".to_string()))?;
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 5 {
        return Err(malformed(format!(
            "expected 5 columns in dist output, got {}: {:?}",
            fields.len(),
            line
        )));
    }
    let distance: f64 = fields[2].trim().parse()?;
    let p_value: f64 = fields[3].trim().parse()?;
    let mut shared = fields[4].trim().splitn(2, '/');
    let (common, total): (u64, u64) = match (shared.next(), shared.next()) {
        (Some(common), Some(total)) => (common.parse()?, total.parse()?),
        _ => {
            return Err(malformed(format!(
                "bad shared-hashes column {:?}",
                fields[4]
            )))
        }
    };
    Ok(SketchMeasure {
        sketch_size,
        p_value,
        distance,
        common_hashes: common,
        total_hashes: total,
    })
}

/// Calls the `mash` binary; the two sketch files live in a temporary
/// directory that is removed on return.
#[derive(Clone, Debug)]
pub struct MashCommand {
    pub binary: PathBuf,
    /// Parent of the per-call directories; the system temp dir if `None`.
    pub temp_root: Option<PathBuf>,
}

impl Default for MashCommand {
    fn default() -> Self {
        MashCommand {
            binary: PathBuf::from("mash"),
            temp_root: None,
        }
    }
}

impl MashCommand {
    pub fn new(binary: &Path) -> Self {
        MashCommand {
            binary: binary.to_path_buf(),
            temp_root: None,
        }
    }

    pub fn with_temp_root(mut self, root: &Path) -> Self {
        self.temp_root = Some(root.to_path_buf());
        self
    }

    fn sketch(&self, seq: &Path, out: &Path, sketch_size: usize, k: u8) -> KmerDistResult<PathBuf> {
        run_tool(
            "mash",
            Command::new(&self.binary)
                .arg("sketch")
                .arg("-s")
                .arg(sketch_size.to_string())
                .arg("-k")
                .arg(k.to_string())
                .arg("-o")
                .arg(out)
                .arg(seq),
        )?;
        // mash appends the extension itself
        Ok(out.with_extension("msh"))
    }
}

impl SketchTool for MashCommand {
    fn compare(
        &self,
        seq_a: &Path,
        seq_b: &Path,
        sketch_size: usize,
        k: u8,
    ) -> KmerDistResult<SketchMeasure> {
        let workdir = scratch_dir("kmerdist-mash", self.temp_root.as_deref())?;
        let sketch_a = self.sketch(seq_a, &workdir.path().join("a"), sketch_size, k)?;
        let sketch_b = self.sketch(seq_b, &workdir.path().join("b"), sketch_size, k)?;
        let output = run_tool(
            "mash",
            Command::new(&self.binary)
                .arg("dist")
                .arg(&sketch_a)
                .arg(&sketch_b),
        )?;
        let measure = parse_mash_dist(&String::from_utf8_lossy(&output.stdout), sketch_size)?;
        debug!(
            "mash k={} s={}: distance {} ({}/{})",
            k, sketch_size, measure.distance, measure.common_hashes, measure.total_hashes
        );
        Ok(measure)
    }
}
