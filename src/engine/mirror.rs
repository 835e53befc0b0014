//! Selective recursive copy of a world tree between local disk and a remote
//! filesystem.
//!
//! Only the root-tier entry set participates. Included files copy one-to-one;
//! included directories copy every regular file underneath them, preserving
//! relative structure - directories themselves are implied by file paths and
//! created as needed on the destination side.

use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::engine::entry_set;
use crate::remote::fs::{RemoteFs, rpath};

/// Create every missing segment of a remote directory path, tolerating
/// segments that already exist.
///
/// Probe-then-mkdir is racy under concurrent writers; accepted here because
/// operations run one at a time against a given world root.
pub fn ensure_remote_dirs(fs: &dyn RemoteFs, remote_dir: &str) -> Result<()> {
    let normalized = rpath::normalize(remote_dir);
    let mut current = String::new();
    if normalized.starts_with('/') {
        current.push('/');
    }
    for segment in normalized.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(segment);
        if fs.stat(&current).is_err() {
            fs.mkdir(&current)
                .with_context(|| format!("mkdir {current}"))?;
        }
    }
    Ok(())
}

/// Mirror the included entries of a local world directory up to a remote
/// world directory.
pub fn upload_world_tree(fs: &dyn RemoteFs, local_root: &Path, remote_root: &str) -> Result<()> {
    ensure_remote_dirs(fs, remote_root)?;

    for file_name in entry_set::ROOT_FILES {
        let local_file = local_root.join(file_name);
        if local_file.is_file() {
            fs.upload(&local_file, &rpath::join(remote_root, file_name))
                .with_context(|| format!("upload {file_name}"))?;
        }
    }

    for dir_name in entry_set::ROOT_DIRS {
        let local_dir = local_root.join(dir_name);
        if local_dir.is_dir() {
            upload_directory(fs, &local_dir, &rpath::join(remote_root, dir_name))?;
        }
    }
    Ok(())
}

/// Mirror the included entries of a remote world directory down into a local
/// world directory, creating it if needed.
pub fn download_world_tree(fs: &dyn RemoteFs, remote_root: &str, local_root: &Path) -> Result<()> {
    std::fs::create_dir_all(local_root)
        .with_context(|| format!("create {}", local_root.display()))?;

    for file_name in entry_set::ROOT_FILES {
        let remote_file = rpath::join(remote_root, file_name);
        if !fs.exists(&remote_file) {
            continue;
        }
        fs.download(&remote_file, &local_root.join(file_name))
            .with_context(|| format!("download {file_name}"))?;
    }

    for dir_name in entry_set::ROOT_DIRS {
        let remote_dir = rpath::join(remote_root, dir_name);
        if !fs.exists(&remote_dir) {
            continue;
        }
        download_directory(fs, &remote_dir, &local_root.join(dir_name))?;
    }
    Ok(())
}

fn upload_directory(fs: &dyn RemoteFs, local_dir: &Path, remote_dir: &str) -> Result<()> {
    ensure_remote_dirs(fs, remote_dir)?;
    for entry in WalkDir::new(local_dir).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(local_dir)
            .context("walk escaped its root")?;
        let remote_child = rpath::join(remote_dir, &local_relative_to_remote(relative));
        if entry.file_type().is_dir() {
            ensure_remote_dirs(fs, &remote_child)?;
        } else if entry.file_type().is_file() {
            fs.upload(entry.path(), &remote_child)
                .with_context(|| format!("upload {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn download_directory(fs: &dyn RemoteFs, remote_dir: &str, local_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(local_dir)
        .with_context(|| format!("create {}", local_dir.display()))?;
    for entry in fs.list(remote_dir)? {
        let remote_child = rpath::join(remote_dir, &entry.name);
        let local_child = local_dir.join(&entry.name);
        if entry.stat.is_dir {
            download_directory(fs, &remote_child, &local_child)?;
        } else {
            if let Some(parent) = local_child.parent() {
                std::fs::create_dir_all(parent)?;
            }
            fs.download(&remote_child, &local_child)
                .with_context(|| format!("download {remote_child}"))?;
        }
    }
    Ok(())
}

/// Relative local path rendered with `/` separators for the remote side.
fn local_relative_to_remote(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
