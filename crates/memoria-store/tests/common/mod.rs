//! Shared helpers for memoria-store integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use memoria_core::{Error, JournalConfig, Result};
use memoria_crypto::KdfParams;
use memoria_store::{FilesystemBackend, Journal, StorageBackend};

pub const PASSWORD: &str = "Tr0ub4dor&3";
pub const NEW_PASSWORD: &str = "C0rrect&Horse!Battery";

pub fn config(dir: &Path) -> JournalConfig {
    JournalConfig::new(dir).with_kdf_params(KdfParams::new(1024, 1, 1))
}

pub async fn open(dir: &Path) -> Journal {
    Journal::open(config(dir)).await.unwrap()
}

/// Which backend call should simulate a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// `write` to a path starting with the prefix
    WritePrefix(&'static str),
    /// `rename` from a path starting with the prefix
    RenameFrom(&'static str),
}

/// Filesystem backend that simulates a process crash at one chosen call.
///
/// For writes it leaves a torn `<path>.tmp` behind, as a killed process would.
pub struct CrashingBackend {
    inner: FilesystemBackend,
    fail_on: FailOn,
    armed: AtomicBool,
}

impl CrashingBackend {
    pub fn new(dir: &Path, fail_on: FailOn) -> Arc<Self> {
        Arc::new(Self {
            inner: FilesystemBackend::new(dir),
            fail_on,
            armed: AtomicBool::new(false),
        })
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn crash() -> Error {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "simulated crash",
        ))
    }
}

#[async_trait]
impl StorageBackend for CrashingBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        if let FailOn::WritePrefix(prefix) = self.fail_on {
            if self.armed.load(Ordering::SeqCst) && path.starts_with(prefix) {
                let torn = self.inner.base_path().join(format!("{path}.tmp"));
                if let Some(parent) = torn.parent() {
                    std::fs::create_dir_all(parent).map_err(Error::Io)?;
                }
                std::fs::write(&torn, &data[..data.len() / 2]).map_err(Error::Io)?;
                return Err(Self::crash());
            }
        }
        self.inner.write(path, data).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        if let FailOn::RenameFrom(prefix) = self.fail_on {
            if self.armed.load(Ordering::SeqCst) && from.starts_with(prefix) {
                return Err(Self::crash());
            }
        }
        self.inner.rename(from, to).await
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        self.inner.list_files(dir).await
    }

    async fn list_dirs(&self, dir: &str) -> Result<Vec<String>> {
        self.inner.list_dirs(dir).await
    }

    async fn create_dir(&self, dir: &str) -> Result<()> {
        self.inner.create_dir(dir).await
    }

    async fn remove_dir(&self, dir: &str) -> Result<()> {
        self.inner.remove_dir(dir).await
    }
}
