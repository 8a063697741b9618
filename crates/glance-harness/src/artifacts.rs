//! Screenshot persistence.
//!
//! Files are named `<scenario-slug>-<seq>-<label>.png` with a zero-padded,
//! run-wide sequence number. On open the store scans its directory and
//! continues after the highest number already present, so repeated runs
//! into the same directory never overwrite each other.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::Result;

/// Writes screenshots into one directory.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    next_seq: AtomicU32,
}

impl ArtifactStore {
    /// Opens (creating if needed) `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created or listed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let highest = fs::read_dir(&dir)?
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| entry.file_name().to_str().and_then(sequence_of))
            .max();

        Ok(Self {
            dir,
            next_seq: AtomicU32::new(highest.map_or(1, |n| n + 1)),
        })
    }

    /// Directory the store writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `png` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&self, scenario: &str, label: &str, png: &[u8]) -> Result<PathBuf> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let path = self
            .dir
            .join(format!("{}-{seq:04}-{}.png", slugify(scenario), slugify(label)));
        fs::write(&path, png)?;
        tracing::debug!("Saved screenshot {}", path.display());
        Ok(path)
    }
}

/// Lowercase ASCII alphanumerics separated by single dashes.
#[must_use]
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug.to_string()
    }
}

/// Highest sequence-looking segment of a screenshot file name.
///
/// Any dash-separated run of four or more digits counts, so a slug that
/// happens to contain digits can only push the next number higher.
fn sequence_of(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(".png")?;
    stem.split('-')
        .filter(|part| part.len() >= 4 && part.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|part| part.parse().ok())
        .max()
}
