//! Per-request scratch storage for uploaded files
//!
//! Every upload lands in its own `TempDir`; dropping the `UploadedFile` removes it.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "assignment-upload-";
const FALLBACK_FILE_NAME: &str = "upload.bin";

/// Factory for scratch directories under a configured root
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root: root.unwrap_or_else(std::env::temp_dir),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh empty scratch directory
    pub fn create_dir(&self, prefix: &str) -> std::io::Result<TempDir> {
        std::fs::create_dir_all(&self.root)?;
        tempfile::Builder::new().prefix(prefix).tempdir_in(&self.root)
    }

    /// Persist uploaded bytes under their (sanitised) original name
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<UploadedFile> {
        let dir = self.create_dir(SCRATCH_PREFIX)?;
        let safe_name = sanitize_file_name(file_name);
        let path = dir.path().join(&safe_name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(
            file_name = %safe_name,
            size = bytes.len(),
            path = %path.display(),
            "Saved upload to scratch directory"
        );

        Ok(UploadedFile {
            file_name: safe_name,
            path,
            size: bytes.len() as u64,
            _dir: dir,
        })
    }
}

/// An uploaded file living in its own scratch directory
#[derive(Debug)]
pub struct UploadedFile {
    file_name: String,
    path: PathBuf,
    size: u64,
    _dir: TempDir,
}

impl UploadedFile {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Case-insensitive extension check, e.g. `has_extension("zip")`
    pub fn has_extension(&self, extension: &str) -> bool {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false)
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Keep only the final path component and drop characters that are unsafe in file names
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("q-extract-csv-zip.zip"), "q-extract-csv-zip.zip");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\README.md"), "README.md");
        assert_eq!(sanitize_file_name("..."), "upload.bin");
        assert_eq!(sanitize_file_name(""), "upload.bin");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }

    #[tokio::test]
    async fn test_scratch_directory_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchSpace::new(Some(root.path().to_path_buf()));

        let upload = scratch.save("data.ZIP", b"PK\x03\x04").await.unwrap();
        let dir = upload.path().parent().unwrap().to_path_buf();

        assert!(upload.path().exists());
        assert!(upload.has_extension("zip"));
        assert!(!upload.has_extension("csv"));
        assert_eq!(upload.size(), 4);
        assert_eq!(upload.read().await.unwrap(), b"PK\x03\x04");

        drop(upload);
        assert!(!dir.exists());
    }
}
