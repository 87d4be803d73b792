//! Migration file discovery.
//!
//! Migration scripts are SQL files in a directory, one per migration, named
//! `<seq>_<description>.sql` with a zero-padded numeric prefix of at least
//! three digits. The prefix is parsed into an integer and establishes the
//! order in which scripts are applied, so a sequence number past 999 still
//! sorts after 999 even though lexical comparison would put it first.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A migration script discovered on disk. The SQL text is not read until
/// the runner is about to apply the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    /// Parsed numeric prefix, e.g. 1 for `001_initial_schema.sql`.
    pub seq: u32,
    /// Full file name, used as the ledger key.
    pub filename: String,
    /// Path the SQL text is read from.
    pub path: PathBuf,
}

impl MigrationScript {
    /// Reads the full SQL text of this script.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::FileUnreadable`] if the file vanished or
    /// cannot be read.
    pub fn read_sql(&self) -> Result<String, DiscoveryError> {
        std::fs::read_to_string(&self.path).map_err(|source| DiscoveryError::FileUnreadable {
            path: self.path.clone(),
            source,
        })
    }
}

/// Errors that can occur while enumerating the migration file store.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The migrations directory could not be read.
    #[error("failed to read migrations directory '{path}': {source}")]
    DirUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A migration file could not be read.
    #[error("failed to read migration file '{path}': {source}")]
    FileUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file in the migrations directory does not match
    /// `<seq>_<description>.sql` with a zero-padded prefix of >= 3 digits.
    #[error("migration file name '{0}' does not match '<seq>_<description>.sql'")]
    BadFileName(String),

    /// Two files carry the same sequence number, so there is no total order.
    #[error("duplicate migration sequence number {seq}: '{first}' and '{second}'")]
    DuplicateSeq {
        seq: u32,
        first: String,
        second: String,
    },
}

/// Enumerates the migration scripts in `dir`, sorted ascending by their
/// parsed sequence number.
///
/// Subdirectories are skipped. Every regular file must match the
/// `<seq>_<description>.sql` pattern; anything else fails discovery rather
/// than being silently ignored.
///
/// # Errors
///
/// Returns [`DiscoveryError`] if the directory is unreadable, a filename
/// does not match the pattern, or two files share a sequence number.
pub fn discover_migrations(dir: &Path) -> Result<Vec<MigrationScript>, DiscoveryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::DirUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::DirUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().into_owned();
        let seq =
            parse_seq(&filename).ok_or_else(|| DiscoveryError::BadFileName(filename.clone()))?;
        scripts.push(MigrationScript {
            seq,
            filename,
            path,
        });
    }

    scripts.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.filename.cmp(&b.filename)));

    for pair in scripts.windows(2) {
        if pair[0].seq == pair[1].seq {
            return Err(DiscoveryError::DuplicateSeq {
                seq: pair[0].seq,
                first: pair[0].filename.clone(),
                second: pair[1].filename.clone(),
            });
        }
    }

    Ok(scripts)
}

/// Parses the numeric prefix out of `<seq>_<description>.sql`.
///
/// Requires at least three digits before the first underscore and a
/// non-empty description. Returns `None` for anything else.
fn parse_seq(filename: &str) -> Option<u32> {
    let stem = filename.strip_suffix(".sql")?;
    let (digits, description) = stem.split_once('_')?;
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if description.is_empty() {
        return None;
    }
    digits.parse().ok()
}
