//! Journal configuration.

use std::path::PathBuf;

use memoria_crypto::KdfParams;

use crate::defaults;

/// Settings for opening a journal.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Directory holding the keyring, records and attachments.
    pub data_dir: PathBuf,
    /// Minimum strength score for new master passwords.
    pub min_password_score: u8,
    /// Capacity of the recall history.
    pub recall_history: usize,
    /// Argon2id costs for new keys and verifiers.
    pub kdf_params: KdfParams,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            min_password_score: defaults::MIN_PASSWORD_SCORE,
            recall_history: defaults::RECALL_HISTORY_CAPACITY,
            kdf_params: KdfParams::default(),
        }
    }
}

impl JournalConfig {
    /// Config rooted at `data_dir` with default settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MEMORIA_DATA_DIR` | `<data dir>/memoria` | Store directory |
    /// | `MEMORIA_MIN_PASSWORD_SCORE` | `60` | Password strength threshold (0-100) |
    /// | `MEMORIA_RECALL_HISTORY` | `10` | Recall repeat-avoidance window |
    /// | `MEMORIA_KDF_MEMORY_KIB` | `65536` | Argon2id memory cost |
    /// | `MEMORIA_KDF_ITERATIONS` | `3` | Argon2id time cost |
    /// | `MEMORIA_KDF_PARALLELISM` | `4` | Argon2id lanes |
    pub fn from_env() -> Self {
        let base = Self::default();

        let data_dir = std::env::var("MEMORIA_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(base.data_dir);

        let min_password_score = env_parse("MEMORIA_MIN_PASSWORD_SCORE")
            .unwrap_or(base.min_password_score)
            .min(100);

        let recall_history = env_parse("MEMORIA_RECALL_HISTORY")
            .unwrap_or(base.recall_history)
            .max(1);

        let kdf_params = KdfParams::new(
            env_parse("MEMORIA_KDF_MEMORY_KIB").unwrap_or(base.kdf_params.memory_kib),
            env_parse("MEMORIA_KDF_ITERATIONS").unwrap_or(base.kdf_params.iterations),
            env_parse("MEMORIA_KDF_PARALLELISM").unwrap_or(base.kdf_params.parallelism),
        );

        Self {
            data_dir,
            min_password_score,
            recall_history,
            kdf_params,
        }
    }

    /// Set the store directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the password strength threshold.
    pub fn with_min_password_score(mut self, score: u8) -> Self {
        self.min_password_score = score.min(100);
        self
    }

    /// Set the recall history capacity.
    pub fn with_recall_history(mut self, capacity: usize) -> Self {
        self.recall_history = capacity.max(1);
        self
    }

    /// Set the Argon2id costs.
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = params;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Platform data directory for memoria, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(defaults::DATA_DIR_NAME)
}
