// Filesystem capability used by the credentials store
//
// The store only needs four operations. Keeping them behind a trait lets the
// merge logic run against an in-memory filesystem in tests.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

/// Minimal filesystem surface for reading and writing the credentials file
#[async_trait]
pub trait ConfigFs: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the whole content of `path`
    async fn write(&self, path: &Path, content: &str) -> io::Result<()>;
}

/// Local filesystem backed by tokio.
///
/// Writes go to a temporary file in the target directory which is then
/// renamed over the target. A symlinked target is resolved first so the link
/// survives.
#[derive(Debug, Clone, Default)]
pub struct TokioFs;

#[async_trait]
impl ConfigFs for TokioFs {
    async fn exists(&self, path: &Path) -> bool {
        async_fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        async_fs::create_dir_all(path).await
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        async_fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        let target: PathBuf = path.to_path_buf();
        let content = content.to_owned();

        tokio::task::spawn_blocking(move || persist_atomically(&target, &content))
            .await
            .map_err(io::Error::other)?
    }
}

fn persist_atomically(target: &Path, content: &str) -> io::Result<()> {
    use std::io::Write;

    // Write through symlinks instead of replacing the link itself
    let resolved = match std::fs::canonicalize(target) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == io::ErrorKind::NotFound => target.to_path_buf(),
        Err(e) => return Err(e),
    };
    let target = resolved.as_path();

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;

    // Keep the permissions of the file being replaced
    if let Ok(metadata) = std::fs::metadata(target) {
        std::fs::set_permissions(file.path(), metadata.permissions())?;
    }

    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}
