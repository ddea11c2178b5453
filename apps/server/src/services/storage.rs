// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk storage of uploaded models.
//!
//! Layout: `<root>/<history id>/<sanitized filename>`, with chunk staging in
//! `<root>/<history id>/.chunks/<upload id>/<n>.part`.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Fallback when sanitizing leaves nothing usable
pub const DEFAULT_FILENAME: &str = "model.ifc";

/// File store rooted at the upload directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// A model written to its final location.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
    pub hash: String,
}

impl FileStore {
    /// Create a store in the specified directory.
    pub async fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();

        if let Err(e) = tokio::fs::create_dir_all(&root).await {
            tracing::warn!(
                error = %e,
                path = %root.display(),
                "Failed to create upload directory"
            );
        }

        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// SHA-256 of file content, hex encoded.
    pub fn generate_key(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    fn history_dir(&self, history_id: i64) -> PathBuf {
        self.root.join(history_id.to_string())
    }

    /// Final path of a history row's model.
    pub fn file_path(&self, history_id: i64, filename: &str) -> PathBuf {
        self.history_dir(history_id).join(sanitize_filename(filename))
    }

    fn chunk_dir(&self, history_id: i64, upload_id: &str) -> PathBuf {
        self.history_dir(history_id).join(".chunks").join(upload_id)
    }

    /// Write a complete upload.
    pub async fn store(
        &self,
        history_id: i64,
        filename: &str,
        data: &[u8],
    ) -> io::Result<StoredFile> {
        let path = self.file_path(history_id, filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        tracing::debug!(path = %path.display(), size = data.len(), "Stored upload");
        Ok(StoredFile {
            path,
            size: data.len() as u64,
            hash: Self::generate_key(data),
        })
    }

    /// Stage one chunk. A re-sent chunk overwrites the earlier copy.
    pub async fn store_chunk(
        &self,
        history_id: i64,
        upload_id: &str,
        chunk_number: i64,
        data: &[u8],
    ) -> io::Result<()> {
        let dir = self.chunk_dir(history_id, upload_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(format!("{}.part", chunk_number)), data).await
    }

    /// Concatenate staged chunks `0..chunks_total` in order into the final
    /// file, then remove the staging directory.
    pub async fn assemble(
        &self,
        history_id: i64,
        upload_id: &str,
        chunks_total: i64,
        filename: &str,
    ) -> io::Result<StoredFile> {
        let dir = self.chunk_dir(history_id, upload_id);
        let path = self.file_path(history_id, filename);

        let mut out = tokio::fs::File::create(&path).await?;
        let mut hasher = Sha256::new();
        let mut size = 0u64;

        for n in 0..chunks_total {
            let chunk = tokio::fs::read(dir.join(format!("{}.part", n))).await?;
            hasher.update(&chunk);
            out.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        out.flush().await?;
        drop(out);

        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::warn!(error = %e, path = %dir.display(), "Failed to remove chunk staging");
        }

        tracing::debug!(path = %path.display(), size, chunks = chunks_total, "Assembled upload");
        Ok(StoredFile {
            path,
            size,
            hash: hex::encode(hasher.finalize()),
        })
    }

    /// Remove everything stored for a history row.
    pub async fn remove_history(&self, history_id: i64) -> io::Result<()> {
        match tokio::fs::remove_dir_all(self.history_dir(history_id)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Filesystem-safe version of a client-supplied name.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`, maps whitespace to `_`,
/// drops everything else and strips leading dots.
pub fn sanitize_filename(name: &str) -> String {
    // Browsers on Windows may send a full path
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// `true` when the name ends in `.ifc`, ignoring case
pub fn is_ifc_filename(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".ifc")
}

/// Download name for a model's CSV export
pub fn csv_filename(original: &str) -> String {
    let safe = sanitize_filename(original);
    let stem = Path::new(&safe)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("model");
    format!("{}.csv", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("two_members.ifc"), "two_members.ifc");
        assert_eq!(sanitize_filename("my model v2.IFC"), "my_model_v2.IFC");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\models\\tower.ifc"), "tower.ifc");
        assert_eq!(sanitize_filename("...hidden.ifc"), "hidden.ifc");
        assert_eq!(sanitize_filename("構造モデル.ifc"), "ifc");
        assert_eq!(sanitize_filename("構造"), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename(""), DEFAULT_FILENAME);
    }

    #[test]
    fn test_is_ifc_filename() {
        assert!(is_ifc_filename("a.ifc"));
        assert!(is_ifc_filename("A.IFC"));
        assert!(!is_ifc_filename("a.ifczip"));
        assert!(!is_ifc_filename("a.txt"));
    }

    #[test]
    fn test_csv_filename() {
        assert_eq!(csv_filename("two_members.ifc"), "two_members.csv");
        assert_eq!(csv_filename("tower.v2.IFC"), "tower.v2.csv");
    }

    #[tokio::test]
    async fn test_assemble_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).await;

        store.store_chunk(7, "u1", 2, b"ghi").await.unwrap();
        store.store_chunk(7, "u1", 0, b"abc").await.unwrap();
        store.store_chunk(7, "u1", 1, b"def").await.unwrap();

        let stored = store.assemble(7, "u1", 3, "m.ifc").await.unwrap();
        assert_eq!(stored.size, 9);
        assert_eq!(stored.hash, FileStore::generate_key(b"abcdefghi"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"abcdefghi");
        assert!(!dir.path().join("7/.chunks/u1").exists());

        store.remove_history(7).await.unwrap();
        assert!(!stored.path.exists());
        store.remove_history(7).await.unwrap();
    }
}
