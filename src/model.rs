//! Core data model shared by the listing, comparison and transfer layers.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Which side of the portal a world lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Local,
    Remote,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Stable key referencing a world entry on the other side.
///
/// References are rebuilt wholesale on every listing refresh; they are keys,
/// not aliases, so stale ones simply stop resolving after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorldRef {
    pub side: Side,
    pub id: String,
}

/// One world save directory, local or remote.
#[derive(Debug, Clone, Default)]
pub struct WorldEntry {
    /// Folder name; stable key for in-flight preview loads.
    pub id: String,
    /// Display name from the world config; falls back to `id`.
    pub name: Option<String>,
    /// Absolute local path or remote path string.
    pub path: String,
    pub preview_image_path: Option<String>,
    pub game_mode: Option<String>,
    pub patch_line: Option<String>,
    /// Opaque identity token from the world config.
    pub uuid_binary: Option<String>,
    /// ISO-8601 in-world clock.
    pub game_time_iso: Option<String>,
    /// Listing timestamp; display ordering only.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entries on the other side judged to be the same world. Symmetric,
    /// deduplicated, rebuilt by the matcher on every annotate pass.
    pub same_world_refs: Vec<WorldRef>,
}

impl WorldEntry {
    /// Name shown to the user: display name, else folder name.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.id,
        }
    }

    pub fn add_same_world_ref(&mut self, reference: WorldRef) {
        if !self.same_world_refs.contains(&reference) {
            self.same_world_refs.push(reference);
        }
    }

    pub fn clear_same_world_refs(&mut self) {
        self.same_world_refs.clear();
    }
}

/// How a remote session authenticates.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    Password(String),
    /// Path to a key file; a `.pub` path resolves to its sibling private key.
    PublicKey(PathBuf),
}

impl AuthMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Password(_) => "Password",
            Self::PublicKey(_) => "Public Key",
        }
    }
}

/// Connection + target description for one remote operation.
///
/// Treated as an immutable snapshot: built fresh per operation and never
/// mutated mid-transfer.
#[derive(Debug, Clone)]
pub struct RemoteProfile {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Directory on the remote that holds world folders.
    pub remote_base_path: String,
    pub auth: AuthMethod,
    /// Directory on this machine that holds world folders.
    pub local_worlds_path: String,
}

impl RemoteProfile {
    pub fn port_or_default(&self) -> u16 {
        if self.port > 0 { self.port } else { 22 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_folder_name() {
        let mut world = WorldEntry {
            id: "MyWorld".into(),
            ..Default::default()
        };
        assert_eq!(world.display_name(), "MyWorld");

        world.name = Some("  ".into());
        assert_eq!(world.display_name(), "MyWorld");

        world.name = Some("Shiny".into());
        assert_eq!(world.display_name(), "Shiny");
    }

    #[test]
    fn same_world_refs_deduplicate() {
        let mut world = WorldEntry::default();
        let reference = WorldRef {
            side: Side::Remote,
            id: "Other".into(),
        };
        world.add_same_world_ref(reference.clone());
        world.add_same_world_ref(reference);
        assert_eq!(world.same_world_refs.len(), 1);

        world.clear_same_world_refs();
        assert!(world.same_world_refs.is_empty());
    }
}
