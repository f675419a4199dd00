//! Append-only, `;`-delimited log of enriched records.
//!
//! Each `append` opens the destination in append mode, writes one line,
//! flushes (and by default fsyncs) and closes it before returning. A crash
//! after `append` returns never loses that record; earlier content is never
//! rewritten or truncated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::error::{ProcessingError, Result};
use crate::models::EnrichedRecord;
use crate::utils::constants::{OUTPUT_DELIMITER, OUTPUT_FIELD_COUNT};

/// How far a record is pushed toward stable storage before `append` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Flush userspace buffers to the OS.
    Flush,
    /// Flush and fsync the file data.
    #[default]
    Fsync,
}

/// Destination for enriched records, one at a time.
pub trait RecordSink {
    fn append(&mut self, record: &EnrichedRecord) -> Result<()>;
}

impl RecordSink for Vec<EnrichedRecord> {
    fn append(&mut self, record: &EnrichedRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

pub struct IncrementalWriter {
    path: PathBuf,
    sync_mode: SyncMode,
    appended: u64,
    tail_checked: bool,
}

impl IncrementalWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_mode: SyncMode::default(),
            appended: 0,
            tail_checked: false,
        }
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this writer (not the file's total).
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Create the parent directory so the first `append` cannot fail on it.
    pub fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ProcessingError::durable_write(&self.path, e))?;
        }
        Ok(())
    }

    fn write_line(&mut self, record: &EnrichedRecord) -> std::result::Result<(), String> {
        // Serialise first so a bad record never leaves a partial line behind
        let mut line = csv::WriterBuilder::new()
            .delimiter(OUTPUT_DELIMITER)
            .has_headers(false)
            .from_writer(Vec::new());
        line.write_record(record.to_fields()).map_err(|e| e.to_string())?;
        let mut line = line.into_inner().map_err(|e| e.to_string())?;

        // A torn tail from an interrupted run gets its own line
        if !self.tail_checked && has_unterminated_tail(&self.path).map_err(|e| e.to_string())? {
            warn!(path = %self.path.display(), "Output ends with a partial line; terminating it");
            line.insert(0, b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| e.to_string())?;
        file.write_all(&line).map_err(|e| e.to_string())?;
        file.flush().map_err(|e| e.to_string())?;
        if self.sync_mode == SyncMode::Fsync {
            file.sync_data().map_err(|e| e.to_string())?;
        }
        self.tail_checked = true;
        Ok(())
    }
}

/// Whether a non-empty file lacks its final newline.
fn has_unterminated_tail(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl RecordSink for IncrementalWriter {
    fn append(&mut self, record: &EnrichedRecord) -> Result<()> {
        self.write_line(record)
            .map_err(|message| ProcessingError::DurableWrite {
                path: self.path.clone(),
                message,
            })?;
        self.appended += 1;
        trace!(latlon = %record.latlon, "Record appended");
        Ok(())
    }
}

fn open_log(path: &Path) -> Result<Option<csv::Reader<File>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(
        csv::ReaderBuilder::new()
            .delimiter(OUTPUT_DELIMITER)
            .has_headers(false)
            .flexible(true)
            .from_reader(file),
    ))
}

/// Read every record in an output log; a missing file reads as empty.
///
/// Lines with the wrong number of fields are torn writes and are skipped.
pub fn read_records(path: &Path) -> Result<Vec<EnrichedRecord>> {
    let Some(mut reader) = open_log(path)? else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        if row.len() != OUTPUT_FIELD_COUNT {
            warn!(
                path = %path.display(),
                line = index + 1,
                fields = row.len(),
                "Skipping incomplete line"
            );
            continue;
        }
        let fields: Vec<&str> = row.iter().collect();
        let record = EnrichedRecord::from_fields(&fields).map_err(|e| {
            ProcessingError::InvalidFormat(format!("{} line {}: {}", path.display(), index + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Coordinates already present in an output log, for resuming a run.
///
/// Incomplete lines are not counted, so a cell whose write was torn is
/// geocoded again.
pub fn completed_keys(path: &Path) -> Result<HashSet<String>> {
    let Some(mut reader) = open_log(path)? else {
        return Ok(HashSet::new());
    };

    let mut keys = HashSet::new();
    for row in reader.records() {
        let row = row?;
        if row.len() != OUTPUT_FIELD_COUNT {
            continue;
        }
        if let Some(latlon) = row.get(0).map(str::trim).filter(|k| !k.is_empty()) {
            keys.insert(latlon.to_string());
        }
    }
    debug!(path = %path.display(), completed = keys.len(), "Loaded completed coordinates");
    Ok(keys)
}
