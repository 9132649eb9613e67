//! # Credential Providers
//!
//! Lookup of the API key used by the proximity geolocation service.
//!
//! ## Fallback Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      CredentialChain                                    │
//! │                                                                         │
//! │  1. EnvCredentialProvider           $GOOGLE_API_KEY                    │
//! │       │ miss                                                            │
//! │       ▼                                                                 │
//! │  2. FileCredentialProvider          credentials.toml [api]             │
//! │       │ miss                                                            │
//! │       ▼                                                                 │
//! │  3. EncryptedFileCredentialProvider encrypted_api_key.bin + $ENCRYPTION_KEY │
//! │       │ miss                                                            │
//! │       ▼                                                                 │
//! │  CredentialUnavailable → resolver skips proximity, uses address lookup │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The key is looked up on every proximity attempt, so rotating it on disk
//! takes effect on the next cycle.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use crate::config::CredentialSettings;
use crate::error::{SyncError, SyncResult};

/// A source of the proximity-lookup API key.
pub trait CredentialProvider: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Returns the key, or `CredentialUnavailable` describing the miss.
    fn api_key(&self) -> SyncResult<String>;
}

fn non_empty(key: String, source: &str) -> SyncResult<String> {
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(SyncError::CredentialUnavailable(format!("{} is empty", source)));
    }
    Ok(key)
}

// =============================================================================
// Environment
// =============================================================================

/// Reads the key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        EnvCredentialProvider { var: var.into() }
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn name(&self) -> &'static str {
        "env"
    }

    fn api_key(&self) -> SyncResult<String> {
        let key = std::env::var(&self.var)
            .map_err(|_| SyncError::CredentialUnavailable(format!("${} not set", self.var)))?;
        non_empty(key, &format!("${}", self.var))
    }
}

// =============================================================================
// Plain File
// =============================================================================

#[derive(Debug, Deserialize)]
struct CredentialFile {
    api: ApiSection,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
    google_api_key: Option<String>,
}

/// Reads `[api] google_api_key` from a TOML file.
#[derive(Debug, Clone)]
pub struct FileCredentialProvider {
    path: PathBuf,
}

impl FileCredentialProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialProvider { path: path.into() }
    }
}

impl CredentialProvider for FileCredentialProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    fn api_key(&self) -> SyncResult<String> {
        let unavailable =
            |reason: String| SyncError::CredentialUnavailable(format!("{}: {}", self.path.display(), reason));

        let contents = std::fs::read_to_string(&self.path).map_err(|e| unavailable(e.to_string()))?;
        let file: CredentialFile = toml::from_str(&contents).map_err(|e| unavailable(e.to_string()))?;

        let key = file
            .api
            .google_api_key
            .ok_or_else(|| unavailable("[api] google_api_key missing".to_string()))?;
        non_empty(key, &self.path.display().to_string())
    }
}

// =============================================================================
// Encrypted File
// =============================================================================

/// Decrypts a Fernet token file with a key taken from the environment.
#[derive(Debug, Clone)]
pub struct EncryptedFileCredentialProvider {
    path: PathBuf,
    key_var: String,
}

impl EncryptedFileCredentialProvider {
    pub fn new(path: impl Into<PathBuf>, key_var: impl Into<String>) -> Self {
        EncryptedFileCredentialProvider {
            path: path.into(),
            key_var: key_var.into(),
        }
    }
}

impl CredentialProvider for EncryptedFileCredentialProvider {
    fn name(&self) -> &'static str {
        "encrypted_file"
    }

    fn api_key(&self) -> SyncResult<String> {
        let secret = std::env::var(&self.key_var).map_err(|_| {
            SyncError::CredentialUnavailable(format!("${} not set", self.key_var))
        })?;

        let cipher = fernet::Fernet::new(secret.trim()).ok_or_else(|| {
            SyncError::CredentialUnavailable(format!("${} is not a valid Fernet key", self.key_var))
        })?;

        let token = std::fs::read_to_string(&self.path).map_err(|e| {
            SyncError::CredentialUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let plain = cipher.decrypt(token.trim()).map_err(|_| {
            SyncError::CredentialUnavailable(format!("{}: decryption failed", self.path.display()))
        })?;

        let key = String::from_utf8(plain).map_err(|_| {
            SyncError::CredentialUnavailable(format!("{}: key is not UTF-8", self.path.display()))
        })?;
        non_empty(key, &self.path.display().to_string())
    }
}

// =============================================================================
// Chain
// =============================================================================

/// Ordered list of providers; the first hit wins.
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        CredentialChain { providers }
    }

    /// Builds the env → file → encrypted file chain.
    pub fn from_settings(settings: &CredentialSettings) -> Self {
        CredentialChain::new(vec![
            Box::new(EnvCredentialProvider::new(&settings.env_var)),
            Box::new(FileCredentialProvider::new(&settings.config_file)),
            Box::new(EncryptedFileCredentialProvider::new(
                &settings.encrypted_file,
                &settings.encryption_key_env,
            )),
        ])
    }
}

impl CredentialProvider for CredentialChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn api_key(&self) -> SyncResult<String> {
        let mut misses = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.api_key() {
                Ok(key) => {
                    debug!(provider = provider.name(), "API key found");
                    return Ok(key);
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "API key not found");
                    misses.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(SyncError::CredentialUnavailable(if misses.is_empty() {
            "no credential providers configured".to_string()
        } else {
            misses.join("; ")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_provider() {
        std::env::set_var("GEOLEDGER_TEST_KEY_PRESENT", "  abc123 \n");
        let provider = EnvCredentialProvider::new("GEOLEDGER_TEST_KEY_PRESENT");
        assert_eq!(provider.api_key().unwrap(), "abc123");

        let missing = EnvCredentialProvider::new("GEOLEDGER_TEST_KEY_NEVER_SET");
        assert!(matches!(missing.api_key(), Err(SyncError::CredentialUnavailable(_))));
    }

    #[test]
    fn test_file_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "[api]\ngoogle_api_key = \"from-file\"\n").unwrap();

        assert_eq!(FileCredentialProvider::new(&path).api_key().unwrap(), "from-file");

        std::fs::write(&path, "[api]\n").unwrap();
        assert!(FileCredentialProvider::new(&path).api_key().is_err());

        assert!(FileCredentialProvider::new(dir.path().join("absent.toml"))
            .api_key()
            .is_err());
    }

    #[test]
    fn test_encrypted_file_provider() {
        let secret = fernet::Fernet::generate_key();
        let token = fernet::Fernet::new(&secret).unwrap().encrypt(b"decrypted-key");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encrypted_api_key.bin");
        std::fs::write(&path, token).unwrap();

        std::env::set_var("GEOLEDGER_TEST_FERNET_GOOD", &secret);
        let provider = EncryptedFileCredentialProvider::new(&path, "GEOLEDGER_TEST_FERNET_GOOD");
        assert_eq!(provider.api_key().unwrap(), "decrypted-key");

        std::env::set_var("GEOLEDGER_TEST_FERNET_WRONG", fernet::Fernet::generate_key());
        let wrong = EncryptedFileCredentialProvider::new(&path, "GEOLEDGER_TEST_FERNET_WRONG");
        assert!(wrong.api_key().is_err());
    }

    #[test]
    fn test_chain_falls_through_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "[api]\ngoogle_api_key = \"second\"\n").unwrap();

        let chain = CredentialChain::new(vec![
            Box::new(EnvCredentialProvider::new("GEOLEDGER_TEST_CHAIN_UNSET")),
            Box::new(FileCredentialProvider::new(&path)),
        ]);
        assert_eq!(chain.api_key().unwrap(), "second");
    }

    #[test]
    fn test_chain_reports_every_miss() {
        let chain = CredentialChain::new(vec![
            Box::new(EnvCredentialProvider::new("GEOLEDGER_TEST_CHAIN_MISS_A")),
            Box::new(EnvCredentialProvider::new("GEOLEDGER_TEST_CHAIN_MISS_B")),
        ]);

        let err = chain.api_key().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("GEOLEDGER_TEST_CHAIN_MISS_A"));
        assert!(message.contains("GEOLEDGER_TEST_CHAIN_MISS_B"));
    }
}
