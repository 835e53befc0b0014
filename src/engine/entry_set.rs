//! The fixed set of world entries that participate in transfer and backup.
//!
//! Everything else under a world root (logs, crash dumps, editor droppings)
//! is excluded by construction: no operation ever reads, writes or archives
//! a path outside these sets.

/// Files copied at the world root during upload/download/sync.
pub const ROOT_FILES: &[&str] = &[
    "bans.json",
    "client_metadata.json",
    "config.json",
    "permissions.json",
    "preview.png",
    "whitelist.json",
];

/// Directories copied recursively at the world root.
pub const ROOT_DIRS: &[&str] = &["mods", "universe"];

/// Files captured by a universe backup.
pub const UNIVERSE_FILES: &[&str] = &["memories.json", "memories.json.bak"];

/// Directories captured recursively by a universe backup.
pub const UNIVERSE_DIRS: &[&str] = &["players", "worlds"];

/// Name of the mutable sub-tree under a world root.
pub const UNIVERSE_DIR: &str = "universe";

/// Where backup archives land under a world root.
pub const BACKUP_DIR: &str = "backup";

/// Relative path of the world config carrying identity metadata.
pub const WORLD_CONFIG_RELATIVE: &str = "universe/worlds/default/config.json";

/// Relative path of the client metadata file.
pub const CLIENT_METADATA_FILE: &str = "client_metadata.json";

/// Relative path of the preview image.
pub const PREVIEW_FILE: &str = "preview.png";
