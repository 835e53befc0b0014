//! World discovery: listing local and remote save directories and reading
//! the identity metadata embedded in them.

pub mod local;
pub mod preview;
pub mod remote;

use serde_json::Value;

pub use local::list_local_worlds;
pub use preview::{PreviewFetch, PreviewFetcher};
pub use remote::list_remote_worlds;

/// Identity fields read from `universe/worlds/default/config.json`.
#[derive(Debug, Clone, Default)]
pub struct WorldIdentity {
    pub display_name: Option<String>,
    pub game_mode: Option<String>,
    pub uuid_binary: Option<String>,
    pub game_time_iso: Option<String>,
}

/// Pull the identity fields out of a world config document. Tolerant by
/// design: a malformed document yields an empty identity, not an error.
pub fn identity_from_config(bytes: &[u8]) -> WorldIdentity {
    let value: Value = serde_json::from_slice(bytes).unwrap_or(Value::Null);
    WorldIdentity {
        display_name: string_field(&value, "DisplayName"),
        game_mode: string_field(&value, "GameMode"),
        uuid_binary: value
            .get("UUID")
            .and_then(|uuid| uuid.get("$binary"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from),
        game_time_iso: string_field(&value, "GameTime"),
    }
}

/// `CreatedWithPatchline` from `client_metadata.json`.
pub fn patch_line_from_metadata(bytes: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    string_field(&value, "CreatedWithPatchline")
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Newest-first ordering for world listings; undated entries sink.
pub fn sort_newest_first(worlds: &mut [crate::model::WorldEntry]) {
    worlds.sort_by(|left, right| right.last_modified.cmp(&left.last_modified));
}
