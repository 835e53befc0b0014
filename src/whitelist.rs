//! The per-world player whitelist document.
//!
//! Canonical form is `{"enabled": bool, "list": [uuid, ...]}`. Two legacy
//! shapes are still accepted on read - a bare UUID array, and a `"players"`
//! key instead of `"list"` - but saving always rewrites the canonical form.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

const WHITELIST_FILE: &str = "whitelist.json";

/// Immutable whitelist snapshot: enabled flag plus players in insertion
/// order, deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistConfig {
    pub enabled: bool,
    pub players: Vec<String>,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            players: Vec::new(),
        }
    }
}

impl WhitelistConfig {
    pub fn new(enabled: bool, players: impl IntoIterator<Item = String>) -> Self {
        Self {
            enabled,
            players: dedup_preserving_order(players),
        }
    }
}

/// Load a world's whitelist; a missing file means "enabled, nobody listed".
pub fn load(world_dir: &Path) -> Result<WhitelistConfig> {
    let path = whitelist_file(world_dir);
    if !path.exists() {
        return Ok(WhitelistConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(parse(&content))
}

/// Write the canonical whitelist document, creating the world directory if
/// needed.
pub fn save(world_dir: &Path, config: &WhitelistConfig) -> Result<()> {
    std::fs::create_dir_all(world_dir)
        .with_context(|| format!("create {}", world_dir.display()))?;
    let path = whitelist_file(world_dir);

    let document = serde_json::json!({
        "enabled": config.enabled,
        "list": config.players,
    });
    let mut rendered = serde_json::to_string_pretty(&document).context("render whitelist")?;
    rendered.push('\n');
    std::fs::write(&path, rendered).with_context(|| format!("write {}", path.display()))
}

/// Parse any of the accepted document shapes. Unreadable content degrades to
/// the default rather than failing a listing.
pub fn parse(content: &str) -> WhitelistConfig {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(_) => return WhitelistConfig::default(),
    };

    match value {
        // Legacy: a bare array of UUIDs.
        Value::Array(entries) => WhitelistConfig::new(true, string_entries(&entries)),
        Value::Object(ref object) => {
            let enabled = object
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            let players = object
                .get("list")
                .or_else(|| object.get("players"))
                .and_then(Value::as_array)
                .map(|entries| string_entries(entries))
                .unwrap_or_default();
            WhitelistConfig::new(enabled, players)
        }
        _ => WhitelistConfig::default(),
    }
}

fn string_entries(entries: &[Value]) -> Vec<String> {
    entries
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

fn dedup_preserving_order(players: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    players
        .into_iter()
        .filter(|player| seen.insert(player.clone()))
        .collect()
}

fn whitelist_file(world_dir: &Path) -> PathBuf {
    world_dir.join(WHITELIST_FILE)
}
