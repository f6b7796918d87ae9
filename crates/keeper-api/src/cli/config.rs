//! `bmk config`: show the effective configuration.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use secrecy::ExposeSecret;

use keeper_infra::config::load_effective_config;
use keeper_types::config::KeeperConfig;

/// Mask a secret for display, keeping only its last 4 characters.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        "****".to_string()
    } else {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

fn or_unset(value: Option<&str>) -> String {
    value.unwrap_or("(unset)").to_string()
}

/// Flatten the config into display rows. Secrets are masked.
fn config_rows(config: &KeeperConfig, data_dir: &Path) -> Vec<(&'static str, String)> {
    let bucket = &config.bucket;
    vec![
        ("data_dir", data_dir.display().to_string()),
        ("backend", config.backend.to_string()),
        ("request_timeout_secs", config.request_timeout_secs.to_string()),
        ("bucket.name", or_unset(bucket.name.as_deref())),
        ("bucket.key", or_unset(bucket.key.as_deref())),
        ("bucket.separator", bucket.separator.clone()),
        ("bucket.region", bucket.region.clone()),
        ("bucket.endpoint", or_unset(bucket.endpoint.as_deref())),
        ("bucket.path_style", bucket.path_style.to_string()),
        ("bucket.access_key_id", or_unset(bucket.access_key_id.as_deref())),
        (
            "bucket.secret_access_key",
            bucket
                .secret_access_key
                .as_ref()
                .map(|s| mask_secret(s.expose_secret()))
                .unwrap_or_else(|| "(unset)".to_string()),
        ),
        ("writes.conditional", config.writes.conditional.to_string()),
        ("writes.max_attempts", config.writes.max_attempts.to_string()),
        (
            "filesystem.root",
            config
                .filesystem
                .root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| data_dir.join("objects").display().to_string()),
        ),
    ]
}

/// Load config the same way every other command does and print it.
pub async fn show_config(data_dir: &Path, json: bool) -> Result<()> {
    let config = load_effective_config(data_dir).await;
    let rows = config_rows(&config, data_dir);

    if json {
        let map: serde_json::Map<String, serde_json::Value> = rows
            .into_iter()
            .map(|(key, value)| (key.to_string(), serde_json::Value::String(value)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!();
    println!(
        "  Configuration ({})",
        style(data_dir.join("config.toml").display()).dim()
    );
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key).fg(Color::Cyan), Cell::new(value)]);
    }
    println!("{table}");
    println!();

    Ok(())
}
