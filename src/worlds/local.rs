//! Listing world directories on the local disk.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::engine::entry_set;
use crate::model::WorldEntry;
use crate::worlds::{identity_from_config, patch_line_from_metadata, sort_newest_first};

/// Scan the local worlds root and build entries for every subdirectory that
/// carries a world config. I/O trouble degrades to an empty listing - the
/// caller shows "no worlds", not an error page.
pub fn list_local_worlds(worlds_root: &Path) -> Vec<WorldEntry> {
    if !worlds_root.is_dir() {
        return Vec::new();
    }
    let entries = match std::fs::read_dir(worlds_root) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(root = %worlds_root.display(), %error, "cannot list local worlds");
            return Vec::new();
        }
    };

    let mut worlds: Vec<WorldEntry> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| to_world_entry(&entry.path()))
        .collect();
    sort_newest_first(&mut worlds);
    worlds
}

fn to_world_entry(world_dir: &Path) -> Option<WorldEntry> {
    let config_path = world_dir.join(entry_set::WORLD_CONFIG_RELATIVE);
    if !config_path.is_file() {
        // Not a world save; skip quietly.
        return None;
    }

    let folder_name = world_dir.file_name()?.to_string_lossy().into_owned();
    let identity = std::fs::read(&config_path)
        .map(|bytes| identity_from_config(&bytes))
        .unwrap_or_default();

    let patch_line = std::fs::read(world_dir.join(entry_set::CLIENT_METADATA_FILE))
        .ok()
        .and_then(|bytes| patch_line_from_metadata(&bytes));

    let preview_path = world_dir.join(entry_set::PREVIEW_FILE);
    let preview_image_path = preview_path
        .is_file()
        .then(|| preview_path.to_string_lossy().into_owned());

    Some(WorldEntry {
        id: folder_name,
        name: identity.display_name,
        path: world_dir.to_string_lossy().into_owned(),
        preview_image_path,
        game_mode: identity.game_mode,
        patch_line,
        uuid_binary: identity.uuid_binary,
        game_time_iso: identity.game_time_iso,
        last_modified: config_mtime(&config_path),
        same_world_refs: Vec::new(),
    })
}

fn config_mtime(config_path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(config_path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}
