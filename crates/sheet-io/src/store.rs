//! Typed table files replaced atomically.
//!
//! Rows are serialized to a temp file in the destination directory and only
//! renamed over the target once fully flushed, so a reader sees either the
//! previous table or the new one, never a truncated file.

use analysis_core::AnalysisError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A fully written table waiting to be moved into place.
pub struct StagedTable {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedTable {
    /// Atomically replace the target file.
    pub fn commit(self) -> Result<(), AnalysisError> {
        self.temp
            .persist(&self.target)
            .map_err(|e| AnalysisError::Io(e.error))?;
        Ok(())
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Serialize `rows` next to `target` without touching the target yet.
pub fn stage_table<T: Serialize>(target: &Path, rows: &[T]) -> Result<StagedTable, AnalysisError> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    temp.as_file_mut().flush()?;
    temp.as_file().sync_all()?;

    Ok(StagedTable {
        temp,
        target: target.to_path_buf(),
    })
}

/// Write-to-temp-then-rename in one step.
pub fn write_table<T: Serialize>(target: &Path, rows: &[T]) -> Result<(), AnalysisError> {
    stage_table(target, rows)?.commit()
}

/// Read a table written by `write_table`.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AnalysisError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
