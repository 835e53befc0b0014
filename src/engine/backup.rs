//! Timestamped snapshots of the mutable `universe` sub-tree, taken before a
//! destructive sync overwrites it, plus whole-world export/import archives.
//!
//! Archives hold exactly the universe-tier entry set; entry names are
//! relative paths with `/` separators regardless of platform. Missing
//! optional entries (a world without `memories.json.bak`, say) are skipped;
//! a partial backup is a valid backup.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::write::{FileOptions, ZipWriter};

use crate::engine::entry_set;
use crate::engine::mirror;
use crate::remote::fs::{RemoteFs, rpath};

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

fn archive_file_name(when: NaiveDateTime) -> String {
    format!("{}.zip", when.format(BACKUP_TIME_FORMAT))
}

/// Snapshot the local universe sub-tree into
/// `<world>/backup/<yyyy-MM-dd_HH-mm-ss>.zip` and return the archive path.
///
/// The timestamp is caller-supplied rather than read from the wall clock.
pub fn create_universe_backup(world_dir: &Path, when: NaiveDateTime) -> Result<PathBuf> {
    let backup_dir = world_dir.join(entry_set::BACKUP_DIR);
    std::fs::create_dir_all(&backup_dir)
        .with_context(|| format!("create {}", backup_dir.display()))?;
    let universe_dir = world_dir.join(entry_set::UNIVERSE_DIR);
    let archive_path = backup_dir.join(archive_file_name(when));

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&archive_path)
        .with_context(|| format!("create {}", archive_path.display()))?;
    let mut zip = ZipWriter::new(file);

    for file_name in entry_set::UNIVERSE_FILES {
        let candidate = universe_dir.join(file_name);
        if candidate.is_file() {
            add_local_file(&mut zip, &universe_dir, &candidate)?;
        }
    }
    for dir_name in entry_set::UNIVERSE_DIRS {
        let dir = universe_dir.join(dir_name);
        if dir.is_dir() {
            add_local_directory(&mut zip, &universe_dir, &dir)?;
        }
    }

    zip.finish().context("finalize backup archive")?;
    Ok(archive_path)
}

/// Remote-side variant: select the same universe entries over the remote
/// filesystem, stream them into a local temporary archive, upload that one
/// file to `<remote world>/backup/<timestamp>.zip`.
///
/// The temporary file is removed on success and failure alike. A remote
/// world without a `universe` directory is a no-op.
pub fn create_remote_universe_backup(
    fs: &dyn RemoteFs,
    remote_world: &str,
    when: NaiveDateTime,
) -> Result<()> {
    let world = rpath::normalize(remote_world);
    let universe = rpath::join(&world, entry_set::UNIVERSE_DIR);
    if !fs.exists(&universe) {
        return Ok(());
    }
    let backup_dir = rpath::join(&world, entry_set::BACKUP_DIR);
    mirror::ensure_remote_dirs(fs, &backup_dir)?;

    // NamedTempFile unlinks on drop, covering every exit path below.
    let staging = tempfile::Builder::new()
        .prefix("world-portal-sync-backup-")
        .suffix(".zip")
        .tempfile()
        .context("create staging archive")?;
    let mut zip = ZipWriter::new(staging.reopen().context("reopen staging archive")?);

    for file_name in entry_set::UNIVERSE_FILES {
        let remote_file = rpath::join(&universe, file_name);
        if fs.exists(&remote_file) {
            add_remote_file(&mut zip, fs, &universe, &remote_file)?;
        }
    }
    for dir_name in entry_set::UNIVERSE_DIRS {
        let remote_dir = rpath::join(&universe, dir_name);
        if fs.exists(&remote_dir) {
            add_remote_directory(&mut zip, fs, &universe, &remote_dir)?;
        }
    }
    zip.finish().context("finalize staging archive")?;

    let remote_archive = rpath::join(&backup_dir, &archive_file_name(when));
    fs.upload(staging.path(), &remote_archive)
        .with_context(|| format!("upload {remote_archive}"))?;
    tracing::debug!(archive = %remote_archive, "remote universe backup written");
    Ok(())
}

/// Archive the full root-tier entry set of a world into a kept temporary
/// file, for export. The caller owns (and eventually removes) the file.
pub fn create_world_archive(world_dir: &Path) -> Result<PathBuf> {
    let staging = tempfile::Builder::new()
        .prefix("world-portal-export-")
        .suffix(".zip")
        .tempfile()
        .context("create export archive")?;
    let (file, path) = staging.keep().context("keep export archive")?;
    let mut zip = ZipWriter::new(file);

    for file_name in entry_set::ROOT_FILES {
        let candidate = world_dir.join(file_name);
        if candidate.is_file() {
            add_local_file(&mut zip, world_dir, &candidate)?;
        }
    }
    for dir_name in entry_set::ROOT_DIRS {
        let dir = world_dir.join(dir_name);
        if dir.is_dir() {
            add_local_directory(&mut zip, world_dir, &dir)?;
        }
    }

    zip.finish().context("finalize export archive")?;
    Ok(path)
}

/// Unpack a world archive into `target`, refusing entries that would escape
/// it.
pub fn extract_world_archive(archive_path: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target).with_context(|| format!("create {}", target.display()))?;
    let file = File::open(archive_path)
        .with_context(|| format!("open {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file).context("read archive")?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let output = target.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&output)?;
            continue;
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&output)
            .with_context(|| format!("create {}", output.display()))?;
        std::io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

fn add_local_file<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    file: &Path,
) -> Result<()> {
    let entry_name = entry_name_for(root, file)?;
    zip.start_file(entry_name, FileOptions::default())?;
    let mut source = File::open(file).with_context(|| format!("open {}", file.display()))?;
    std::io::copy(&mut source, zip)?;
    Ok(())
}

fn add_local_directory<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    dir: &Path,
) -> Result<()> {
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            add_local_file(zip, root, entry.path())?;
        }
    }
    Ok(())
}

fn add_remote_file<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    fs: &dyn RemoteFs,
    root: &str,
    remote_file: &str,
) -> Result<()> {
    let entry_name = rpath::relative(root, remote_file);
    zip.start_file(entry_name, FileOptions::default())?;
    fs.read_to(remote_file, zip)
        .with_context(|| format!("read {remote_file}"))?;
    Ok(())
}

fn add_remote_directory<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    fs: &dyn RemoteFs,
    root: &str,
    remote_dir: &str,
) -> Result<()> {
    for entry in fs.list(remote_dir)? {
        let remote_child = rpath::join(remote_dir, &entry.name);
        if entry.stat.is_dir {
            add_remote_directory(zip, fs, root, &remote_child)?;
        } else {
            add_remote_file(zip, fs, root, &remote_child)?;
        }
    }
    Ok(())
}

/// Archive entry name: relative path under `root`, `/`-separated even on
/// backslash-path platforms.
fn entry_name_for(root: &Path, file: &Path) -> Result<String> {
    let relative = file
        .strip_prefix(root)
        .context("archive entry escaped its root")?;
    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
