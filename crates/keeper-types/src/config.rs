//! Configuration types for Bookmarks Keeper.
//!
//! `KeeperConfig` represents the top-level `config.toml`: which blob backend
//! to use, the bucket and object key layout, and the write policy applied by
//! the bookmark store. All fields have defaults so an empty file is valid.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Which `BlobStore` implementation backs the bookmark store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    S3,
    Filesystem,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::S3 => write!(f, "s3"),
            BackendKind::Filesystem => write!(f, "filesystem"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeeperConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Per-request timeout for the HTTP storage client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub bucket: BucketConfig,

    #[serde(default)]
    pub writes: WritePolicy,

    #[serde(default)]
    pub filesystem: FilesystemConfig,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            request_timeout_secs: default_request_timeout_secs(),
            bucket: BucketConfig::default(),
            writes: WritePolicy::default(),
            filesystem: FilesystemConfig::default(),
        }
    }
}

/// Bucket, object key layout and credentials.
///
/// Object keys are `{user_id}{separator}{key}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: Option<String>,

    /// Fixed suffix of every per-user object key (e.g. `bookmarks.json`).
    pub key: Option<String>,

    #[serde(default = "default_separator")]
    pub separator: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    pub endpoint: Option<String>,

    /// Address the bucket as `{endpoint}/{bucket}` instead of `{bucket}.{endpoint}`.
    #[serde(default)]
    pub path_style: bool,

    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing, deserialize_with = "deserialize_secret")]
    pub secret_access_key: Option<SecretString>,
}

fn default_separator() -> String {
    "-".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: None,
            key: None,
            separator: default_separator(),
            region: default_region(),
            endpoint: None,
            path_style: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl BucketConfig {
    /// The bucket name, if present and non-blank.
    pub fn bucket_name(&self) -> Result<&str, ConfigError> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ConfigError::MissingBucketName),
        }
    }

    /// The per-user key suffix, if present and non-blank.
    pub fn key_suffix(&self) -> Result<&str, ConfigError> {
        match self.key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::MissingBucketKey),
        }
    }

    /// Both halves of the access key pair; fails if either is missing.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() => Ok(Credentials {
                access_key_id: id.clone(),
                secret_access_key: SecretString::from(secret.expose_secret().to_string()),
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}

/// Storage access key pair. The secret half is never printed.
#[derive(Debug)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

/// How the bookmark store writes documents back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePolicy {
    /// Make writes conditional on the version observed at load time.
    #[serde(default = "default_conditional")]
    pub conditional: bool,

    /// Read-modify-write attempts before giving up on a conflicting write.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_conditional() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            conditional: default_conditional(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Settings for the local filesystem backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Directory holding one file per object key. Defaults to `{data_dir}/objects`.
    pub root: Option<PathBuf>,
}
