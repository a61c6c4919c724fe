//! Output Files - Target Paths, Digests, Writing
//!
//! Every generated file gets its own target. Two inputs that would land on
//! the same `<stem>.php` are rejected before anything is written.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{first} and {second} would both be written to {target}")]
    DuplicateTarget {
        target: String,
        first: String,
        second: String,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where one input's generated source goes, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub source: PathBuf,
    pub target: Option<PathBuf>,
}

/// Manifest entry for one generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub source: String,
    pub output: Option<String>,
    /// SHA-256 of the generated source, hex encoded.
    pub hash: String,
    /// False when the target already held identical content.
    pub written: bool,
}

/// Map each input to `<out_dir>/<stem>.php`, in input order.
pub fn plan_outputs(files: &[PathBuf], out_dir: Option<&Path>) -> Result<Vec<PlannedOutput>, OutputError> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut plan = Vec::with_capacity(files.len());

    for source in files {
        let target = out_dir.map(|dir| dir.join(php_file_name(source)));
        if let Some(target) = &target {
            if let Some(first) = claimed.insert(target.clone(), source.as_path()) {
                return Err(OutputError::DuplicateTarget {
                    target: target.display().to_string(),
                    first: first.display().to_string(),
                    second: source.display().to_string(),
                });
            }
        }
        plan.push(PlannedOutput { source: source.clone(), target });
    }
    Ok(plan)
}

pub fn php_file_name(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    format!("{}.php", stem)
}

pub fn source_digest(source: &str) -> String {
    hex::encode(Sha256::digest(source.as_bytes()))
}

/// Write `source` unless `target` already holds exactly that. Returns whether
/// the file was written.
pub fn write_if_changed(target: &Path, source: &str) -> Result<bool, OutputError> {
    if let Ok(existing) = fs::read(target) {
        if existing == source.as_bytes() {
            tracing::debug!(path = %target.display(), "output unchanged");
            return Ok(false);
        }
    }
    fs::write(target, source).map_err(|source| OutputError::Write {
        path: target.display().to_string(),
        source,
    })?;
    Ok(true)
}

/// Write every planned output and describe the result.
pub fn write_outputs(plan: &[PlannedOutput], sources: &[String]) -> Result<Vec<OutputRecord>, OutputError> {
    plan.iter()
        .zip(sources)
        .map(|(planned, source)| -> Result<OutputRecord, OutputError> {
            let written = match &planned.target {
                Some(target) => write_if_changed(target, source)?,
                None => false,
            };
            Ok(OutputRecord {
                source: planned.source.display().to_string(),
                output: planned.target.as_ref().map(|p| p.display().to_string()),
                hash: source_digest(source),
                written,
            })
        })
        .collect()
}
