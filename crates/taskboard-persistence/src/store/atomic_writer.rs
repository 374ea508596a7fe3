use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use taskboard_core::TaskboardResult;
use tokio::fs;

/// Writes whole files through a sibling temp file and a rename, so readers
/// never observe a half-written store.
pub struct AtomicWriter;

impl AtomicWriter {
    pub async fn write_atomic(path: &Path, data: &[u8]) -> TaskboardResult<()> {
        // Temp file must live on the same filesystem for the rename to be atomic
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).await?;

        let temp_file = tempfile::NamedTempFile::new_in(&parent)?;
        fs::write(temp_file.path(), data).await?;
        temp_file.persist(path).map_err(|e| e.error)?;

        tracing::debug!(
            "Atomically wrote {} bytes to {}",
            data.len(),
            path.display()
        );
        Ok(())
    }

    pub async fn read_all(path: &Path) -> TaskboardResult<Vec<u8>> {
        let data = fs::read(path).await?;
        tracing::debug!("Read {} bytes from {}", data.len(), path.display());
        Ok(data)
    }

    /// Like [`read_all`](Self::read_all), but a missing file is `None`.
    pub async fn read_optional(path: &Path) -> TaskboardResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
