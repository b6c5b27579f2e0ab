//! Storage backend with atomic filesystem writes.
//!
//! Paths handed to a backend are relative to its root and always use `/`
//! separators. Every write goes to `<name>.tmp`, is synced, then renamed over
//! the target, so a reader never sees a torn file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use memoria_core::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Suffix used for in-flight writes.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Storage backend trait.
///
/// Abstracts the handful of filesystem operations the repository needs so
/// tests can inject failures.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Atomically replace the data at `path`.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete the file at `path`. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Atomically move `from` over `to`.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// File names directly inside `dir`. A missing directory lists as empty.
    async fn list_files(&self, dir: &str) -> Result<Vec<String>>;

    /// Subdirectory names directly inside `dir`.
    async fn list_dirs(&self, dir: &str) -> Result<Vec<String>>;

    /// Create `dir` and its parents.
    async fn create_dir(&self, dir: &str) -> Result<()>;

    /// Remove `dir` recursively. Missing directories are not an error.
    async fn remove_dir(&self, dir: &str) -> Result<()>;
}

/// Filesystem storage backend rooted at the journal data directory.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Validate that the data directory can be written, read and cleaned.
    ///
    /// Performs a round trip at startup so permission problems surface when
    /// the journal opens rather than on the first save.
    pub async fn validate(&self) -> Result<()> {
        let check_path = ".health-check";
        let data = b"memoria-health-check";

        self.write(check_path, data).await?;
        let read_back = self.read(check_path).await?;
        self.delete(check_path).await?;

        if read_back != data {
            return Err(memoria_core::Error::Internal(
                "data directory read-back mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flush directory metadata so a completed rename survives power loss.
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        fs::File::open(dir).await?.sync_all().await?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

async fn list_entries(dir: &Path, want_dirs: bool) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e),
    };
    while let Some(entry) = read_dir.next_entry().await? {
        if entry.file_type().await?.is_dir() != want_dirs {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        debug!(storage_path = %path, byte_len = data.len(), "backend: write");

        let parent = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_path.clone());
        fs::create_dir_all(&parent).await.map_err(|e| {
            warn!(parent = %parent.display(), error = %e, "backend: create_dir_all failed");
            e
        })?;

        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "backend: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "backend: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        // Journal data is private to the owner
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "backend: rename failed");
            e
        })?;
        sync_dir(&parent).await?;

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        Ok(fs::read(full_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);
        match fs::remove_file(&full_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        if let Some(parent) = full_path.parent() {
            sync_dir(parent).await?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path);
        Ok(fs::try_exists(full_path).await?)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.full_path(from);
        let to_path = self.full_path(to);
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&from_path, &to_path).await.map_err(|e| {
            warn!(from = %from, to = %to, error = %e, "backend: rename failed");
            e
        })?;
        if let Some(parent) = to_path.parent() {
            sync_dir(parent).await?;
        }
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        Ok(list_entries(&self.full_path(dir), false).await?)
    }

    async fn list_dirs(&self, dir: &str) -> Result<Vec<String>> {
        Ok(list_entries(&self.full_path(dir), true).await?)
    }

    async fn create_dir(&self, dir: &str) -> Result<()> {
        Ok(fs::create_dir_all(self.full_path(dir)).await?)
    }

    async fn remove_dir(&self, dir: &str) -> Result<()> {
        match fs::remove_dir_all(self.full_path(dir)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
