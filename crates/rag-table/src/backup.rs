//! Backup artifact encoding.
//!
//! An artifact is an ordered sequence of flat record objects, either as one
//! JSON array (`.json`) or one object per line (`.jsonl`). Vectors are
//! numeric arrays written with shortest round-trip float formatting.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use rag_core::{RagError, Record, Result};

/// Serialization of a backup artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    /// A single JSON array of objects.
    Json,
    /// One JSON object per line.
    JsonLines,
}

impl BackupFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("jsonl") | Some("ndjson") => Ok(Self::JsonLines),
            _ => Err(RagError::backup_format(format!(
                "unsupported backup file {:?}; expected a .json or .jsonl extension",
                path
            ))),
        }
    }

    /// Write records in this format.
    pub fn encode<W: Write>(&self, records: &[Record], mut writer: W) -> Result<()> {
        match self {
            Self::Json => {
                serde_json::to_writer(&mut writer, records)?;
                writer.write_all(b"\n")?;
            }
            Self::JsonLines => {
                for record in records {
                    serde_json::to_writer(&mut writer, record)?;
                    writer.write_all(b"\n")?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Read records in this format. Blank lines are ignored in JSON Lines.
    pub fn decode<R: Read>(&self, reader: R) -> Result<Vec<Record>> {
        match self {
            Self::Json => serde_json::from_reader(reader)
                .map_err(|e| RagError::backup_format(format!("invalid backup: {}", e))),
            Self::JsonLines => {
                let mut records = Vec::new();
                for (index, line) in BufReader::new(reader).lines().enumerate() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record = serde_json::from_str(&line).map_err(|e| {
                        RagError::backup_format(format!("invalid backup line {}: {}", index + 1, e))
                    })?;
                    records.push(record);
                }
                Ok(records)
            }
        }
    }
}

/// Write a backup artifact, returning the record count.
pub fn write_backup(path: &Path, records: &[Record]) -> Result<usize> {
    let format = BackupFormat::from_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    format.encode(records, BufWriter::new(file))?;

    debug!("Wrote {} records to {:?}", records.len(), path);
    Ok(records.len())
}

/// Read a backup artifact.
pub fn read_backup(path: &Path) -> Result<Vec<Record>> {
    let format = BackupFormat::from_path(path)?;
    let file = File::open(path)?;
    let records = format.decode(BufReader::new(file))?;

    debug!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}
