//! Writing task results to disk.
//!
//! Tables become header-first CSV files, text blobs plain files. In
//! aggregate mode nothing is written and the caller gets the rows back in a
//! [`TaskReport`].

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::{OutputDestination, Table};
use crate::scrapers::error::{Result, ScrapeError};

/// Writes into a task's destination directory, or nowhere in aggregate mode.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: Option<PathBuf>,
}

impl OutputWriter {
    pub fn new(destination: &OutputDestination) -> Self {
        Self {
            dir: destination.directory().map(Path::to_path_buf),
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// `name` under the destination; `None` in aggregate mode.
    pub fn subdir(&self, name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(name))
    }

    /// Write `table` as `{name}.csv`. Returns the path written, if any.
    pub async fn write_table(&self, table: &Table) -> Result<Option<PathBuf>> {
        let Some(ref dir) = self.dir else {
            return Ok(None);
        };
        let path = dir.join(table.file_name());
        write_csv(&path, table).await?;
        info!("Saved {} rows to {}", table.len(), path.display());
        Ok(Some(path))
    }

    pub async fn write_text(&self, file_name: &str, text: &str) -> Result<Option<PathBuf>> {
        let Some(ref dir) = self.dir else {
            return Ok(None);
        };
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, text).await?;
        info!("Saved {}", path.display());
        Ok(Some(path))
    }
}

/// Serialize `table` with its header row to `path`, creating parents.
pub async fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut bytes = Vec::new();
    write_csv_to(&mut bytes, table)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Serialize `table` with its header row to any writer.
pub fn write_csv_to<W: std::io::Write>(out: W, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.fields())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `bytes` to `dir/name` through a temporary file in `dir`, so the
/// target is either absent or complete.
///
/// An existing `dir/name` is never replaced; its path is returned as is.
pub async fn persist_file(dir: &Path, name: &str, bytes: Vec<u8>) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let dir = dir.to_path_buf();
    let target = dir.join(name);
    let destination = target.clone();

    let created = tokio::task::spawn_blocking(move || -> std::io::Result<bool> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        match tmp.persist_noclobber(&destination) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error),
        }
    })
    .await
    .map_err(|e| ScrapeError::Io(std::io::Error::other(e.to_string())))??;

    if !created {
        info!("Kept existing {}", target.display());
    }
    Ok(target)
}

/// Everything a task produced, whether or not it was written.
#[derive(Debug, Clone, Default)]
pub struct TaskReport {
    pub tables: Vec<Table>,
    /// (file name, contents) of text outputs.
    pub texts: Vec<(String, String)>,
    /// Binary files now present on disk (downloaded or already there).
    pub files: Vec<PathBuf>,
    /// Every path this run wrote.
    pub written: Vec<PathBuf>,
}

impl TaskReport {
    pub async fn add_table(&mut self, out: &OutputWriter, table: Table) -> Result<()> {
        if let Some(path) = out.write_table(&table).await? {
            self.written.push(path);
        }
        self.tables.push(table);
        Ok(())
    }

    pub async fn add_text(&mut self, out: &OutputWriter, file_name: &str, text: String) -> Result<()> {
        if let Some(path) = out.write_text(file_name, &text).await? {
            self.written.push(path);
        }
        self.texts.push((file_name.to_string(), text));
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Take the named table out of the report.
    pub fn take_table(&mut self, name: &str) -> Option<Table> {
        let idx = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(idx))
    }

    pub fn text(&self, file_name: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, text)| text.as_str())
    }
}
