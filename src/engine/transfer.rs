//! Path-level transfer operations against a [`RemoteFs`].
//!
//! These functions carry the algorithmic content: unique-name resolution,
//! selective mirroring, pre-overwrite backups, post-download validation and
//! partial-download cleanup. Session acquisition and failure labeling live
//! one layer up in [`super::ops`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use walkdir::WalkDir;

use crate::engine::backup;
use crate::engine::mirror;
use crate::engine::unique_name::resolve_unique_name;
use crate::remote::fs::{RemoteFs, rpath};

/// Upload a local world directory under the remote base, resolving a
/// collision-free remote folder name.
///
/// Returns the created remote path, or `None` when there is nothing to do
/// (the source is not a directory - "selected item vanished" - or the base
/// is blank).
pub fn upload_world(
    fs: &dyn RemoteFs,
    local_world: &Path,
    remote_base: &str,
) -> Result<Option<String>> {
    if !local_world.is_dir() {
        return Ok(None);
    }
    let base = rpath::normalize(remote_base);
    if base.trim().is_empty() {
        return Ok(None);
    }

    let folder_name = local_world
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    mirror::ensure_remote_dirs(fs, &base)?;
    let unique_name = resolve_unique_name(&folder_name, |candidate| {
        fs.exists(&rpath::join(&base, candidate))
    });
    let remote_world = rpath::join(&base, &unique_name);

    tracing::info!(local = %local_world.display(), remote = %remote_world, "uploading world");
    mirror::upload_world_tree(fs, local_world, &remote_world)?;
    Ok(Some(remote_world))
}

/// Download a remote world into a collision-free directory under the local
/// worlds root and return it.
///
/// On failure the partially-created local tree is removed (best-effort) and
/// the original failure is returned.
pub fn download_world(
    fs: &dyn RemoteFs,
    remote_world: &str,
    local_root: &Path,
    requested_name: &str,
) -> Result<PathBuf> {
    let unique_name = resolve_unique_name(requested_name, |candidate| {
        local_root.join(candidate).exists()
    });
    let target = local_root.join(&unique_name);

    tracing::info!(remote = %remote_world, local = %target.display(), "downloading world");
    let outcome = (|| -> Result<()> {
        std::fs::create_dir_all(local_root)
            .with_context(|| format!("create {}", local_root.display()))?;
        mirror::download_world_tree(fs, remote_world, &target)?;
        assert_contains_files(&target)
    })();

    match outcome {
        Ok(()) => Ok(target),
        Err(failure) => {
            cleanup_local_world_dir(&target);
            Err(failure)
        }
    }
}

/// Overwrite the local copy of a matched pair with the remote one: back up
/// the local universe first, then mirror remote→local.
pub fn sync_remote_to_local(
    fs: &dyn RemoteFs,
    remote_world: &str,
    local_world: &Path,
    when: NaiveDateTime,
) -> Result<()> {
    std::fs::create_dir_all(local_world)
        .with_context(|| format!("create {}", local_world.display()))?;
    backup::create_universe_backup(local_world, when)?;
    mirror::download_world_tree(fs, remote_world, local_world)?;
    assert_contains_files(local_world)
}

/// Overwrite the remote copy of a matched pair with the local one: back up
/// the remote universe first, then mirror local→remote. A vanished local
/// source is a no-op.
pub fn sync_local_to_remote(
    fs: &dyn RemoteFs,
    local_world: &Path,
    remote_world: &str,
    when: NaiveDateTime,
) -> Result<()> {
    if !local_world.is_dir() {
        return Ok(());
    }
    backup::create_remote_universe_backup(fs, remote_world, when)?;
    mirror::upload_world_tree(fs, local_world, remote_world)
}

/// Rename a remote world folder in place. Returns the new remote path.
pub fn rename_remote_world(
    fs: &dyn RemoteFs,
    remote_world: &str,
    requested_folder_name: &str,
) -> Result<String> {
    let requested = requested_folder_name.trim();
    if requested.is_empty() || requested.contains('/') || requested.contains('\\') {
        bail!("World folder name cannot include path separators.");
    }

    let current = rpath::normalize(remote_world);
    if rpath::leaf(&current) == requested {
        return Ok(current);
    }

    let target = rpath::join(&rpath::parent(&current), requested);
    if fs.exists(&target) {
        bail!("A world folder with this name already exists.");
    }
    fs.rename(&current, &target)?;
    Ok(target)
}

/// Recursively delete a remote world directory.
pub fn delete_remote_world(fs: &dyn RemoteFs, remote_world: &str) -> Result<()> {
    delete_remote_directory(fs, &rpath::normalize(remote_world))
}

fn delete_remote_directory(fs: &dyn RemoteFs, remote_dir: &str) -> Result<()> {
    for entry in fs.list(remote_dir)? {
        let child = rpath::join(remote_dir, &entry.name);
        if entry.stat.is_dir {
            delete_remote_directory(fs, &child)?;
        } else {
            fs.remove_file(&child)?;
        }
    }
    fs.remove_dir(remote_dir)
}

/// A transferred world must contain at least one regular file.
pub fn assert_contains_files(world_dir: &Path) -> Result<()> {
    if !world_dir.is_dir() {
        bail!("Downloaded world directory was not created.");
    }
    let has_file = WalkDir::new(world_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_type().is_file());
    if !has_file {
        bail!("Downloaded world contains no files.");
    }
    Ok(())
}

/// Best-effort removal of a partial local world tree; deletion errors are
/// swallowed so the original transfer failure stays the reported one.
pub fn cleanup_local_world_dir(world_dir: &Path) {
    if !world_dir.exists() {
        return;
    }
    if let Err(error) = std::fs::remove_dir_all(world_dir) {
        tracing::debug!(path = %world_dir.display(), %error, "partial world cleanup incomplete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testfs::MemoryFs;
    use chrono::NaiveDate;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn when() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 12)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn upload_resolves_a_unique_remote_folder() {
        let local = tempfile::tempdir().unwrap();
        let world = local.path().join("MyWorld");
        write(&world.join("config.json"), "{}");

        let fs = MemoryFs::new();
        fs.add_dir("/srv/worlds/MyWorld");
        fs.add_dir("/srv/worlds/MyWorld_1");

        let remote = upload_world(&fs, &world, "/srv/worlds").unwrap().unwrap();
        assert_eq!(remote, "/srv/worlds/MyWorld_2");
        assert!(fs.file("/srv/worlds/MyWorld_2/config.json").is_some());
    }

    #[test]
    fn upload_from_missing_source_is_a_no_op() {
        let fs = MemoryFs::new();
        let missing = Path::new("/definitely/not/here");
        assert!(upload_world(&fs, missing, "/srv/worlds").unwrap().is_none());
        assert!(fs.file_paths().is_empty());
    }

    #[test]
    fn download_places_world_under_a_unique_local_name() {
        let fs = MemoryFs::new();
        fs.add_file("/srv/worlds/Alpha/config.json", b"{}");

        let local = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(local.path().join("Alpha")).unwrap();

        let target = download_world(&fs, "/srv/worlds/Alpha", local.path(), "Alpha").unwrap();
        assert_eq!(target, local.path().join("Alpha_1"));
        assert!(target.join("config.json").is_file());
    }

    #[test]
    fn failed_download_removes_the_partial_tree() {
        let fs = MemoryFs::new();
        fs.add_file("/srv/worlds/Alpha/config.json", b"{}");
        fs.add_file("/srv/worlds/Alpha/universe/memories.json", b"{}");
        fs.fail_on("/srv/worlds/Alpha/universe/memories.json");

        let local = tempfile::tempdir().unwrap();
        let failure = download_world(&fs, "/srv/worlds/Alpha", local.path(), "Alpha");
        assert!(failure.is_err());
        assert!(!local.path().join("Alpha").exists());
    }

    #[test]
    fn empty_download_fails_the_contains_files_check() {
        let fs = MemoryFs::new();
        fs.add_dir("/srv/worlds/Hollow");

        let local = tempfile::tempdir().unwrap();
        let failure = download_world(&fs, "/srv/worlds/Hollow", local.path(), "Hollow")
            .err()
            .unwrap();
        assert!(failure.to_string().contains("contains no files"));
        assert!(!local.path().join("Hollow").exists());
    }

    #[test]
    fn sync_remote_to_local_backs_up_before_overwriting() {
        let local = tempfile::tempdir().unwrap();
        let world = local.path().join("Alpha");
        write(&world.join("universe/memories.json"), "{\"tick\":1}");

        let fs = MemoryFs::new();
        fs.add_file("/srv/worlds/Alpha/universe/memories.json", b"{\"tick\":9}");

        sync_remote_to_local(&fs, "/srv/worlds/Alpha", &world, when()).unwrap();

        // The pre-overwrite snapshot exists and the new state is in place.
        assert!(world.join("backup/2026-02-12_09-00-00.zip").is_file());
        let memories = std::fs::read_to_string(world.join("universe/memories.json")).unwrap();
        assert_eq!(memories, "{\"tick\":9}");
    }

    #[test]
    fn sync_local_to_remote_backs_up_remote_universe_first() {
        let local = tempfile::tempdir().unwrap();
        let world = local.path().join("Alpha");
        write(&world.join("universe/memories.json"), "{\"tick\":9}");

        let fs = MemoryFs::new();
        fs.add_file("/srv/worlds/Alpha/universe/memories.json", b"{\"tick\":1}");

        sync_local_to_remote(&fs, &world, "/srv/worlds/Alpha", when()).unwrap();

        assert!(
            fs.file("/srv/worlds/Alpha/backup/2026-02-12_09-00-00.zip")
                .is_some()
        );
        assert_eq!(
            fs.file("/srv/worlds/Alpha/universe/memories.json").unwrap(),
            b"{\"tick\":9}"
        );
    }

    #[test]
    fn rename_rejects_separators_and_collisions() {
        let fs = MemoryFs::new();
        fs.add_dir("/srv/worlds/Alpha");
        fs.add_dir("/srv/worlds/Taken");

        let failure = rename_remote_world(&fs, "/srv/worlds/Alpha", "a/b").err().unwrap();
        assert!(failure.to_string().contains("path separators"));

        let failure = rename_remote_world(&fs, "/srv/worlds/Alpha", "Taken").err().unwrap();
        assert!(failure.to_string().contains("already exists"));

        // Unchanged name is a no-op.
        let unchanged = rename_remote_world(&fs, "/srv/worlds/Alpha", "Alpha").unwrap();
        assert_eq!(unchanged, "/srv/worlds/Alpha");
    }

    #[test]
    fn rename_moves_the_folder() {
        let fs = MemoryFs::new();
        fs.add_file("/srv/worlds/Alpha/config.json", b"{}");

        let renamed = rename_remote_world(&fs, "/srv/worlds/Alpha", "Beta").unwrap();
        assert_eq!(renamed, "/srv/worlds/Beta");
        assert!(fs.file("/srv/worlds/Beta/config.json").is_some());
        assert!(fs.file("/srv/worlds/Alpha/config.json").is_none());
    }

    #[test]
    fn delete_removes_the_whole_remote_tree() {
        let fs = MemoryFs::new();
        fs.add_file("/srv/worlds/Alpha/config.json", b"{}");
        fs.add_file("/srv/worlds/Alpha/universe/players/p1.json", b"{}");

        delete_remote_world(&fs, "/srv/worlds/Alpha").unwrap();
        assert!(fs.file_paths().is_empty());
        assert!(!fs.has_dir("/srv/worlds/Alpha"));
    }

    #[test]
    fn contains_files_check_rejects_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("EmptyWorld");
        std::fs::create_dir_all(&empty).unwrap();
        assert!(assert_contains_files(&empty).is_err());

        write(&empty.join("config.json"), "{}");
        assert!(assert_contains_files(&empty).is_ok());
    }
}
