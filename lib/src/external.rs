use std::path::Path;
use std::process::{Command, Output};

use log::debug;
use tempfile::TempDir;

use crate::errors::{KmerDistError, KmerDistResult};

/// Runs an external tool to completion; a missing binary or a non-zero exit
/// status is an error for the calling evaluation.
pub(crate) fn run_tool(tool: &str, command: &mut Command) -> KmerDistResult<Output> {
    debug!("running {:?}", command);
    let output = command.output().map_err(|e| KmerDistError::External {
        tool: tool.to_string(),
        message: format!("could not start: {}", e),
    })?;
    if !output.status.success() {
        return Err(KmerDistError::External {
            tool: tool.to_string(),
            message: format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output)
}

/// Working directory for one tool run, removed when dropped. Created under
/// `root` if one is given, else under the system temp dir.
pub(crate) fn scratch_dir(prefix: &str, root: Option<&Path>) -> KmerDistResult<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    Ok(match root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    })
}

/// Writes an executable shell script standing in for an external tool.
#[cfg(all(test, unix))]
pub(crate) fn write_stub(dir: &Path, name: &str, script: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", script)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
