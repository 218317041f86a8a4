//! Configuration
//!
//! Loads batching thresholds and signer settings from an optional TOML file
//! overlaid with `LEDGER_SEAL__*` environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batcher::BatchConfig;
use crate::crypto::SoftwareSigner;
use crate::error::{Result, SealError};
use crate::store::JsonlRootStore;

pub const ENV_PREFIX: &str = "LEDGER_SEAL";
pub const DEFAULT_PASSPHRASE_ENV: &str = "LEDGER_SEAL_KEY_PASSPHRASE";
pub const DEFAULT_BATCH_SIZE_LIMIT: i64 = 1000;
pub const DEFAULT_BATCH_TIMEOUT_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    pub size_limit: i64,
    pub timeout_seconds: i64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_BATCH_SIZE_LIMIT,
            timeout_seconds: DEFAULT_BATCH_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSettings {
    /// PEM private key file.
    pub key_path: Option<PathBuf>,
    /// Name of the environment variable that holds the key passphrase.
    pub passphrase_env: String,
    /// Optional JSONL log receiving every signed root.
    pub record_store: Option<PathBuf>,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self {
            key_path: None,
            passphrase_env: DEFAULT_PASSPHRASE_ENV.to_string(),
            record_store: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealConfig {
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub signer: SignerSettings,
}

impl SealConfig {
    /// Load from `path` (if given) and the `LEDGER_SEAL__` environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    pub fn load_with_env_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("batch.size_limit", DEFAULT_BATCH_SIZE_LIMIT)?
            .set_default("batch.timeout_seconds", DEFAULT_BATCH_TIMEOUT_SECONDS)?
            .set_default("signer.passphrase_env", DEFAULT_PASSPHRASE_ENV)?;

        if let Some(path) = path {
            if !path.exists() {
                return Err(SealError::InvalidConfiguration(format!(
                    "Configuration file not found: {:?}",
                    path
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SealConfig = settings.try_deserialize()?;
        config.validate()?;

        info!(
            "Configuration loaded: batch size_limit={}, timeout_seconds={}",
            config.batch.size_limit, config.batch.timeout_seconds
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.size_limit < 1 {
            return Err(SealError::InvalidConfiguration(format!(
                "batch.size_limit must be at least 1, got {}",
                self.batch.size_limit
            )));
        }
        if self.batch.timeout_seconds < 1 {
            return Err(SealError::InvalidConfiguration(format!(
                "batch.timeout_seconds must be at least 1, got {}",
                self.batch.timeout_seconds
            )));
        }
        if self.signer.passphrase_env.trim().is_empty() {
            return Err(SealError::InvalidConfiguration(
                "signer.passphrase_env must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn batch_config(&self) -> Result<BatchConfig> {
        self.validate()?;
        let size_limit = usize::try_from(self.batch.size_limit).map_err(|_| {
            SealError::InvalidConfiguration(format!(
                "batch.size_limit out of range: {}",
                self.batch.size_limit
            ))
        })?;
        BatchConfig::new(size_limit, self.batch.timeout_seconds as u64)
    }

    /// Key passphrase from the configured environment variable, if set.
    pub fn passphrase(&self) -> Option<String> {
        env::var(&self.signer.passphrase_env).ok()
    }

    /// Load the configured key and attach the record store, if any.
    pub fn build_signer(&self) -> Result<SoftwareSigner> {
        let key_path = self.signer.key_path.as_deref().ok_or_else(|| {
            SealError::InvalidConfiguration("signer.key_path is not set".to_string())
        })?;

        let passphrase = self.passphrase();
        let signer = SoftwareSigner::from_key_file(key_path, passphrase.as_deref())?;

        match &self.signer.record_store {
            Some(path) => Ok(signer.with_store(Arc::new(JsonlRootStore::open(path)?))),
            None => Ok(signer),
        }
    }
}
