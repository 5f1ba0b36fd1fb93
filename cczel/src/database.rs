//! Persisted modification-time database
//!
//! Format, one record per line:
//!
//! ```text
//! 01d9abcd12345678 src/main.c
//! 01d9abcd0000ffff src/util.h
//! #cczel-complete
//! ```
//!
//! Each record starts with 16 hex digits (high and low 32-bit halves of the
//! modification time), one space, then the canonical path. The completion
//! marker is always written last; a file without it was truncated and is
//! discarded as a whole.

use crate::state::{BuildState, ModTime};
use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Last line of a complete database
pub const COMPLETION_MARKER: &str = "#cczel-complete";

const TIME_DIGITS: usize = 16;

/// Reasons a database could not be used (never fatal for a run)
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Database file could not be read
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The completion marker is missing (interrupted write)
    #[error("database is truncated (no completion marker)")]
    MissingMarker,

    /// A record could not be parsed
    #[error("malformed record on line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

/// Path → modification time as of the last run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDatabase {
    records: BTreeMap<String, ModTime>,
}

impl BuildDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse database text.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed record or when the completion marker is
    /// missing.
    pub fn parse(text: &str) -> Result<Self, DatabaseError> {
        let mut records = BTreeMap::new();

        for (index, line) in text.lines().enumerate() {
            if line == COMPLETION_MARKER {
                return Ok(Self { records });
            }

            let (path, time) = parse_record(line).ok_or_else(|| DatabaseError::Malformed {
                line: index + 1,
                content: line.to_string(),
            })?;
            let _ = records.insert(path.to_string(), time);
        }

        Err(DatabaseError::MissingMarker)
    }

    /// Render the database, completion marker last
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (path, time) in &self.records {
            out.push_str(&format!("{time} {path}\n"));
        }
        out.push_str(COMPLETION_MARKER);
        out.push('\n');
        out
    }

    /// Read a database file.
    ///
    /// # Errors
    ///
    /// Returns the IO or format problem that made the file unusable.
    pub fn try_load(path: &Path) -> Result<Self, DatabaseError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Read a database file, falling back to an empty database.
    ///
    /// An empty database makes every tracked file look modified, which
    /// forces a full rebuild.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(database) => {
                debug!("Loaded {} records from {}", database.len(), path.display());
                database
            }
            Err(DatabaseError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("No build database at {}, building everything", path.display());
                Self::new()
            }
            Err(e) => {
                warn!(
                    "Ignoring build database {}: {} (full rebuild)",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    /// Write the database, creating the parent directory if needed.
    ///
    /// The data goes to a sibling temporary file which is then renamed over
    /// the old database.
    ///
    /// # Errors
    ///
    /// Returns any IO error; the previous database is left in place.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("db.tmp");
        {
            let mut writer = BufWriter::new(std::fs::File::create(&temp_path)?);
            writer.write_all(self.render().as_bytes())?;
            writer.flush()?;
        }
        std::fs::rename(&temp_path, path)?;

        debug!("Saved {} records to {}", self.len(), path.display());
        Ok(())
    }

    /// Snapshot the recorded modification times of every tracked file.
    ///
    /// Files with no recorded time (never built successfully) are omitted.
    pub fn from_state(state: &BuildState) -> Self {
        let records = state
            .files()
            .filter_map(|(_, file)| file.recorded_mod_time.map(|time| (file.path.clone(), time)))
            .collect();
        Self { records }
    }

    /// Copy recorded times into the tracked files of `state`.
    ///
    /// Returns the number of stale records (paths no longer tracked).
    pub fn apply(&self, state: &mut BuildState) -> crate::Result<usize> {
        let mut stale = 0;
        for (path, time) in &self.records {
            match state.lookup(path) {
                Some(id) => state.file_mut(id)?.recorded_mod_time = Some(*time),
                None => {
                    debug!("Stale database record for {}", path);
                    stale += 1;
                }
            }
        }
        if stale > 0 {
            info!("Ignored {} stale database records", stale);
        }
        Ok(stale)
    }

    /// Recorded time of a path
    pub fn get(&self, path: &str) -> Option<ModTime> {
        self.records.get(path).copied()
    }

    /// Set the recorded time of a path
    pub fn insert(&mut self, path: impl Into<String>, time: ModTime) {
        let _ = self.records.insert(path.into(), time);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the database has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_record(line: &str) -> Option<(&str, ModTime)> {
    if !line.is_char_boundary(TIME_DIGITS) {
        return None;
    }
    let (digits, rest) = line.split_at(TIME_DIGITS);
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let high = u32::from_str_radix(&digits[..8], 16).ok()?;
    let low = u32::from_str_radix(&digits[8..], 16).ok()?;

    let path = rest.strip_prefix(' ')?;
    if path.is_empty() {
        return None;
    }
    Some((path, ModTime::from_parts(high, low)))
}
