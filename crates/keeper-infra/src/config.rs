//! Configuration loader for Bookmarks Keeper.
//!
//! Reads `config.toml` from the data directory (`~/.bookmarks-keeper/` by
//! default) and deserializes it into [`KeeperConfig`]. Falls back to defaults
//! when the file is missing or malformed. Environment variables then override
//! bucket settings and credentials, using the variable names the bot
//! deployment exports (`bucket_name`, `bookmarks_key`, `aws_access_key_id`,
//! `aws_secret_access_key`).

use std::path::{Path, PathBuf};

use keeper_types::config::KeeperConfig;
use secrecy::SecretString;

/// Environment variable that relocates the data directory.
pub const DATA_DIR_ENV: &str = "BOOKMARKS_KEEPER_HOME";

/// Resolve the data directory: `$BOOKMARKS_KEEPER_HOME`, else `~/.bookmarks-keeper`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".bookmarks-keeper");
    }

    // Last resort: current directory
    PathBuf::from(".bookmarks-keeper")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`KeeperConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> KeeperConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return KeeperConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return KeeperConfig::default();
        }
    };

    match toml::from_str::<KeeperConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            KeeperConfig::default()
        }
    }
}

/// Read a process environment variable, treating non-Unicode values as unset.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Override bucket settings from the environment.
///
/// `lookup` is usually [`process_env`]; tests pass a map. Empty values are
/// ignored so an exported-but-blank variable does not erase the file setting.
pub fn apply_env_overrides<F>(config: &mut KeeperConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
    let bucket = &mut config.bucket;

    if let Some(name) = get("bucket_name") {
        bucket.name = Some(name);
    }
    if let Some(key) = get("bookmarks_key") {
        bucket.key = Some(key);
    }
    if let Some(region) = get("aws_region") {
        bucket.region = region;
    }
    if let Some(endpoint) = get("s3_endpoint") {
        bucket.endpoint = Some(endpoint);
    }
    if let Some(id) = get("aws_access_key_id") {
        bucket.access_key_id = Some(id);
    }
    if let Some(secret) = get("aws_secret_access_key") {
        bucket.secret_access_key = Some(SecretString::from(secret));
    }
}

/// Load `config.toml` and apply process environment overrides.
pub async fn load_effective_config(data_dir: &Path) -> KeeperConfig {
    let mut config = load_config(data_dir).await;
    apply_env_overrides(&mut config, process_env);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_types::config::BackendKind;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.backend, BackendKind::S3);
        assert!(config.bucket.name.is_none());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
backend = "memory"

[bucket]
name = "bookmarks"
key = "bookmarks.json"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.bucket.name.as_deref(), Some("bookmarks"));
        assert_eq!(config.bucket.key.as_deref(), Some("bookmarks.json"));
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.backend, BackendKind::S3);
        assert!(config.bucket.key.is_none());
    }

    #[test]
    fn env_overrides_bucket_and_credentials() {
        let vars = env(&[
            ("bucket_name", "env-bucket"),
            ("bookmarks_key", "bm.json"),
            ("aws_region", "eu-central-1"),
            ("s3_endpoint", "http://localhost:9000"),
            ("aws_access_key_id", "AKIDENV"),
            ("aws_secret_access_key", "env-secret"),
        ]);
        let mut config = KeeperConfig::default();
        config.bucket.name = Some("file-bucket".to_string());

        apply_env_overrides(&mut config, |name| vars.get(name).cloned());

        assert_eq!(config.bucket.name.as_deref(), Some("env-bucket"));
        assert_eq!(config.bucket.key.as_deref(), Some("bm.json"));
        assert_eq!(config.bucket.region, "eu-central-1");
        assert_eq!(config.bucket.endpoint.as_deref(), Some("http://localhost:9000"));
        let creds = config.bucket.credentials().unwrap();
        assert_eq!(creds.access_key_id, "AKIDENV");
        assert_eq!(creds.secret_access_key.expose_secret(), "env-secret");
    }

    #[test]
    fn env_blank_values_do_not_override() {
        let vars = env(&[("bucket_name", "")]);
        let mut config = KeeperConfig::default();
        config.bucket.name = Some("file-bucket".to_string());

        apply_env_overrides(&mut config, |name| vars.get(name).cloned());

        assert_eq!(config.bucket.name.as_deref(), Some("file-bucket"));
    }

    #[test]
    fn env_absent_leaves_config_untouched() {
        let mut config = KeeperConfig::default();
        apply_env_overrides(&mut config, |_| None);
        assert!(config.bucket.name.is_none());
        assert!(config.bucket.credentials().is_err());
        assert_eq!(config.bucket.region, "us-east-1");
    }
}
