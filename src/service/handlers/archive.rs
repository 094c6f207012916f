//! ZIP and hashing helpers shared by the archive-based handlers

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use zip::ZipArchive;

use super::HandlerError;

/// A regular file read out of an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated
    pub name: String,
    pub data: Vec<u8>,
    /// Uncompressed size as recorded in the archive
    pub size: u64,
    /// Modification time as recorded in the archive (local, no zone)
    pub modified: Option<NaiveDateTime>,
}

impl ArchiveEntry {
    /// Final path component
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        let lower = self.name.to_lowercase();
        extensions
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }
}

pub fn open(path: &Path) -> Result<ZipArchive<File>, HandlerError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

/// Read every non-directory entry, in archive order
pub fn read_entries(path: &Path) -> Result<Vec<ArchiveEntry>, HandlerError> {
    let mut archive = open(path)?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let modified = file.last_modified().and_then(|dt| {
            NaiveDate::from_ymd_opt(dt.year() as i32, dt.month() as u32, dt.day() as u32)?
                .and_hms_opt(dt.hour() as u32, dt.minute() as u32, dt.second() as u32)
        });

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;

        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            size: file.size(),
            modified,
            data,
        });
    }

    tracing::debug!(
        path = %path.display(),
        entries = entries.len(),
        "Read archive entries"
    );

    Ok(entries)
}

/// Extract the whole archive below `dest`, rejecting entries that escape it
pub fn extract_to(path: &Path, dest: &Path) -> Result<(), HandlerError> {
    let mut archive = open(path)?;
    archive.extract(dest)?;
    Ok(())
}

/// Every regular file below `root`, as paths relative to it, sorted
pub fn files_under(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                let path = entry.path();
                if let Ok(relative) = path.strip_prefix(root) {
                    found.push(relative.to_path_buf());
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
