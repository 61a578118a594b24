//! Local what-if draft
//!
//! The scenario being explored outlives a single command, so it is kept in
//! `whatif.json` in the data directory until it is promoted or discarded.
//! Uses file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::Scenario;

pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current draft, if any
    pub fn load(&self) -> Result<Option<Scenario>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open what-if draft: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on what-if draft")?;

        let scenario = serde_json::from_reader(BufReader::new(&file))
            .with_context(|| format!("Failed to parse what-if draft: {}", self.path.display()))?;

        Ok(Some(scenario))
    }

    /// Reads the current draft or starts a new one
    pub fn load_or_else<F>(&self, start: F) -> Result<Scenario>
    where
        F: FnOnce() -> Scenario,
    {
        Ok(self.load()?.unwrap_or_else(start))
    }

    /// Replaces the draft atomically
    pub fn save(&self, scenario: &Scenario) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on what-if draft")?;

            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, scenario)
                .context("Failed to serialize what-if draft")?;
            writer.flush().context("Failed to flush what-if draft")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        tracing::debug!(path = %self.path.display(), modifications = scenario.modifications.len(), "saved what-if draft");
        Ok(())
    }

    /// Removes the draft; returns false when there was none
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove what-if draft: {}", self.path.display()))?;
        Ok(true)
    }
}
