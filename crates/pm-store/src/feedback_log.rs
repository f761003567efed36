// feedback_log.rs - Append-only, hash-chained JSONL feedback history.
//
// One JSON object per line. Each entry records the SHA-256 of the previous
// raw line in `previous_hash`, so inserting, deleting, or editing history
// breaks the chain and `verify_chain` reports where.
//
// The chain head is read from the file on every append, never cached, so
// any number of handles can share one log. Callers serialize appends
// (`JsonFileRepository` holds the store lock around them).

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pm_goal::Feedback;

use crate::error::StoreError;
use crate::hasher;

/// One line of the log: the feedback plus its chain link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    #[serde(flatten)]
    pub feedback: Feedback,

    /// Hash of the previous line. None for the first entry.
    pub previous_hash: Option<String>,
}

/// An append-only feedback log backed by a JSONL file.
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    /// Open (or create) a log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::io(&path, source))?;
        Ok(Self { path })
    }

    /// Append one feedback record, linked to the current last line.
    ///
    /// The line goes out in a single write on a fresh append-mode handle,
    /// so a failed append leaves no buffered bytes behind for the next one.
    pub fn append(&self, feedback: &Feedback) -> Result<(), StoreError> {
        let entry = FeedbackEntry {
            feedback: feedback.clone(),
            previous_hash: Self::chain_head(&self.path)?,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::io(&self.path, source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| StoreError::io(&self.path, source))?;
        Ok(())
    }

    /// Read all entries, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<FeedbackEntry>, StoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StoreError::io(path, source))?;
        let mut entries = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| StoreError::io(path, source))?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }

    /// Verify that every entry links to the hash of the line before it.
    ///
    /// Returns the number of entries checked, or an `IntegrityViolation`.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StoreError::io(path, source))?;
        let mut previous_hash: Option<String> = None;
        let mut count = 0;

        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| StoreError::io(path, source))?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: FeedbackEntry = serde_json::from_str(&line)?;
            if entry.previous_hash != previous_hash {
                return Err(StoreError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: entry.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }

            // Hash the raw line; re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
            count += 1;
        }

        Ok(count)
    }

    /// Hash of the last non-blank line, or None for an empty log.
    fn chain_head(path: &Path) -> Result<Option<String>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path).map_err(|source| StoreError::io(path, source))?;
        let mut last_line: Option<String> = None;

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| StoreError::io(path, source))?;
            if !line.trim().is_empty() {
                last_line = Some(line);
            }
        }

        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}
