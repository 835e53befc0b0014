//! In-memory [`RemoteFs`] used by the engine tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use anyhow::{Result, bail};

use crate::remote::fs::{RemoteDirEntry, RemoteFs, RemoteStat, rpath};

/// Fake remote filesystem: files are path → bytes, directories are an
/// explicit set. `fail_paths` makes individual transfers blow up so the
/// failure/cleanup paths can be exercised.
#[derive(Default)]
pub struct MemoryFs {
    files: RefCell<BTreeMap<String, Vec<u8>>>,
    dirs: RefCell<BTreeSet<String>>,
    fail_paths: RefCell<BTreeSet<String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: &str) {
        let normalized = rpath::normalize(path);
        let mut current = String::new();
        if normalized.starts_with('/') {
            current.push('/');
        }
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(segment);
            self.dirs.borrow_mut().insert(current.clone());
        }
    }

    pub fn add_file(&self, path: &str, contents: &[u8]) {
        let normalized = rpath::normalize(path);
        self.add_dir(&rpath::parent(&normalized));
        self.files.borrow_mut().insert(normalized, contents.to_vec());
    }

    /// Any upload/download/read touching this exact path fails.
    pub fn fail_on(&self, path: &str) {
        self.fail_paths.borrow_mut().insert(rpath::normalize(path));
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(&rpath::normalize(path)).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.borrow().contains(&rpath::normalize(path))
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }

    fn check_fail(&self, path: &str) -> Result<()> {
        if self.fail_paths.borrow().contains(path) {
            bail!("injected failure for {path}");
        }
        Ok(())
    }
}

impl RemoteFs for MemoryFs {
    fn stat(&self, path: &str) -> Result<RemoteStat> {
        let normalized = rpath::normalize(path);
        if self.dirs.borrow().contains(&normalized) {
            return Ok(RemoteStat {
                is_dir: true,
                mtime: Some(0),
                size: None,
            });
        }
        if let Some(contents) = self.files.borrow().get(&normalized) {
            return Ok(RemoteStat {
                is_dir: false,
                mtime: Some(0),
                size: Some(contents.len() as u64),
            });
        }
        bail!("no such path: {normalized}")
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteDirEntry>> {
        let normalized = rpath::normalize(path);
        if !self.dirs.borrow().contains(&normalized) {
            bail!("no such directory: {normalized}");
        }
        let prefix = format!("{normalized}/");
        let mut names = BTreeSet::new();
        for dir in self.dirs.borrow().iter() {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                if !rest.contains('/') {
                    names.insert((rest.to_string(), true));
                }
            }
        }
        for file in self.files.borrow().keys() {
            if let Some(rest) = file.strip_prefix(&prefix) {
                if !rest.contains('/') {
                    names.insert((rest.to_string(), false));
                }
            }
        }
        Ok(names
            .into_iter()
            .map(|(name, is_dir)| RemoteDirEntry {
                name,
                stat: RemoteStat {
                    is_dir,
                    mtime: Some(0),
                    size: None,
                },
            })
            .collect())
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        let normalized = rpath::normalize(path);
        let parent = rpath::parent(&normalized);
        if parent != "/" && !parent.is_empty() && !self.dirs.borrow().contains(&parent) {
            bail!("parent missing for {normalized}");
        }
        self.dirs.borrow_mut().insert(normalized);
        Ok(())
    }

    fn read_to(&self, path: &str, out: &mut dyn Write) -> Result<u64> {
        let normalized = rpath::normalize(path);
        self.check_fail(&normalized)?;
        let files = self.files.borrow();
        let Some(contents) = files.get(&normalized) else {
            bail!("no such file: {normalized}");
        };
        out.write_all(contents)?;
        Ok(contents.len() as u64)
    }

    fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let normalized = rpath::normalize(remote);
        self.check_fail(&normalized)?;
        let files = self.files.borrow();
        let Some(contents) = files.get(&normalized) else {
            bail!("no such file: {normalized}");
        };
        std::fs::write(local, contents)?;
        Ok(())
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let normalized = rpath::normalize(remote);
        self.check_fail(&normalized)?;
        let parent = rpath::parent(&normalized);
        if parent != "/" && !parent.is_empty() && !self.dirs.borrow().contains(&parent) {
            bail!("parent missing for {normalized}");
        }
        let contents = std::fs::read(local)?;
        self.files.borrow_mut().insert(normalized, contents);
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        let normalized = rpath::normalize(path);
        if self.files.borrow_mut().remove(&normalized).is_none() {
            bail!("no such file: {normalized}");
        }
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> Result<()> {
        let normalized = rpath::normalize(path);
        if !self.dirs.borrow_mut().remove(&normalized) {
            bail!("no such directory: {normalized}");
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = rpath::normalize(from);
        let to = rpath::normalize(to);
        let from_prefix = format!("{from}/");

        let mut files = self.files.borrow_mut();
        let moved: Vec<(String, Vec<u8>)> = files
            .iter()
            .filter(|(path, _)| **path == from || path.starts_with(&from_prefix))
            .map(|(path, contents)| (path.clone(), contents.clone()))
            .collect();
        for (path, contents) in moved {
            files.remove(&path);
            let renamed = format!("{to}{}", &path[from.len()..]);
            files.insert(renamed, contents);
        }

        let mut dirs = self.dirs.borrow_mut();
        let moved_dirs: Vec<String> = dirs
            .iter()
            .filter(|path| **path == from || path.starts_with(&from_prefix))
            .cloned()
            .collect();
        for path in moved_dirs {
            dirs.remove(&path);
            dirs.insert(format!("{to}{}", &path[from.len()..]));
        }
        Ok(())
    }
}
