//! JSON Lines sinks
//!
//! One JSON object per line, appended to a file opened in append mode. Each
//! line is serialized in full and written with a single `write_all`, so a
//! reader never observes a partial record followed by another record.

use crate::storage::traits::{RecordSink, SinkResult};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub const AGGREGATES_FILE: &str = "product_data.jsonl";
pub const DETAILS_FILE: &str = "listings.jsonl";
pub const SELLERS_FILE: &str = "sellers.jsonl";

/// Appends serialized records of type `R` to a `.jsonl` file
pub struct JsonlSink<R> {
    file: File,
    path: PathBuf,
    _record: PhantomData<fn(&R)>,
}

impl<R: Serialize> JsonlSink<R> {
    /// Opens (or creates) the file in append mode
    pub fn open(path: &Path) -> SinkResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::debug!("Opened JSONL sink {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Serialize> RecordSink<R> for JsonlSink<R> {
    fn append(&mut self, record: &R) -> SinkResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}
