//! Filesystem helpers for whole-file table writes.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::StorageResult;

/// Write `contents` to `path` atomically.
///
/// The bytes go to a sibling `.tmp` file which is then renamed over the
/// destination, so readers observe either the old or the new table, never a
/// truncated one. Parent directories are created on demand.
pub async fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> StorageResult<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, contents).await?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        tracing::error!(
            "Failed to move temp file into place: {} -> {}: {}",
            tmp.display(),
            path.display(),
            e
        );
        return Err(e.into());
    }

    Ok(())
}

/// Read a file, mapping "does not exist" to `None`.
pub async fn read_optional(path: impl AsRef<Path>) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path.as_ref()).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
