//! Listing world directories on the remote host.

use anyhow::Result;
use chrono::DateTime;

use crate::engine::entry_set;
use crate::model::WorldEntry;
use crate::remote::fs::{RemoteFs, rpath};
use crate::worlds::{identity_from_config, patch_line_from_metadata, sort_newest_first};

/// List the world directories under the remote base path.
///
/// Per-world metadata reads degrade to defaults (a half-provisioned world
/// still shows up); only the base listing itself can fail.
pub fn list_remote_worlds(fs: &dyn RemoteFs, remote_base: &str) -> Result<Vec<WorldEntry>> {
    let base = rpath::normalize(remote_base);
    let mut worlds: Vec<WorldEntry> = fs
        .list(&base)?
        .into_iter()
        .filter(|entry| entry.stat.is_dir)
        .map(|entry| {
            let world_path = rpath::join(&base, &entry.name);
            to_world_entry(fs, &entry.name, &world_path, entry.stat.mtime)
        })
        .collect();
    sort_newest_first(&mut worlds);
    Ok(worlds)
}

fn to_world_entry(
    fs: &dyn RemoteFs,
    folder_name: &str,
    world_path: &str,
    dir_mtime: Option<i64>,
) -> WorldEntry {
    let config_path = rpath::join(world_path, entry_set::WORLD_CONFIG_RELATIVE);
    let identity = fs
        .read(&config_path)
        .map(|bytes| identity_from_config(&bytes))
        .unwrap_or_default();

    let metadata_path = rpath::join(world_path, entry_set::CLIENT_METADATA_FILE);
    let patch_line = fs
        .read(&metadata_path)
        .ok()
        .and_then(|bytes| patch_line_from_metadata(&bytes));

    // Config mtime tracks actual play; the directory mtime is the fallback.
    let mtime = fs
        .stat(&config_path)
        .ok()
        .and_then(|stat| stat.mtime)
        .or(dir_mtime);

    WorldEntry {
        id: folder_name.to_string(),
        name: identity.display_name,
        path: world_path.to_string(),
        preview_image_path: None,
        game_mode: identity.game_mode,
        patch_line,
        uuid_binary: identity.uuid_binary,
        game_time_iso: identity.game_time_iso,
        last_modified: mtime.and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
        same_world_refs: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testfs::MemoryFs;

    #[test]
    fn lists_directories_with_identity_metadata() {
        let fs = MemoryFs::new();
        fs.add_file(
            "/srv/worlds/Alpha/universe/worlds/default/config.json",
            br#"{"DisplayName":"Alpha World","GameMode":"Creative",
                "UUID":{"$binary":"abc"},"GameTime":"2026-02-07T12:00:00Z"}"#,
        );
        fs.add_file(
            "/srv/worlds/Alpha/client_metadata.json",
            br#"{"CreatedWithPatchline":"beta"}"#,
        );
        fs.add_file("/srv/worlds/stray.txt", b"not a world");

        let worlds = list_remote_worlds(&fs, "/srv/worlds").unwrap();
        assert_eq!(worlds.len(), 1);
        let world = &worlds[0];
        assert_eq!(world.id, "Alpha");
        assert_eq!(world.path, "/srv/worlds/Alpha");
        assert_eq!(world.display_name(), "Alpha World");
        assert_eq!(world.game_mode.as_deref(), Some("Creative"));
        assert_eq!(world.patch_line.as_deref(), Some("beta"));
        assert_eq!(world.uuid_binary.as_deref(), Some("abc"));
    }

    #[test]
    fn world_without_config_still_lists_with_defaults() {
        let fs = MemoryFs::new();
        fs.add_dir("/srv/worlds/Empty");

        let worlds = list_remote_worlds(&fs, "/srv/worlds").unwrap();
        assert_eq!(worlds.len(), 1);
        assert_eq!(worlds[0].display_name(), "Empty");
        assert!(worlds[0].uuid_binary.is_none());
    }

    #[test]
    fn missing_base_is_an_error() {
        let fs = MemoryFs::new();
        assert!(list_remote_worlds(&fs, "/srv/worlds").is_err());
    }
}
