//! Persisted connection settings.
//!
//! The last successful connection is remembered in
//! `<config_dir>/world-portal/connection.toml` so the next invocation can
//! reconnect without re-entering everything. Passwords are never stored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const AUTH_TYPE_PASSWORD: &str = "Password";
const AUTH_TYPE_PUBLIC_KEY: &str = "Public Key";

/// Settings worth remembering between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub remote_path: String,
    #[serde(default = "default_auth_type")]
    pub auth_type: String,
    /// Only persisted for public-key auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_file: Option<PathBuf>,
    #[serde(default)]
    pub local_worlds_path: String,
}

fn default_port() -> u16 {
    22
}

fn default_auth_type() -> String {
    AUTH_TYPE_PASSWORD.to_string()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: String::new(),
            remote_path: String::new(),
            auth_type: default_auth_type(),
            public_key_file: None,
            local_worlds_path: String::new(),
        }
    }
}

impl ConnectionSettings {
    pub fn uses_public_key(&self) -> bool {
        self.auth_type.eq_ignore_ascii_case(AUTH_TYPE_PUBLIC_KEY)
    }

    /// Load from the default settings file; `None` when absent or unreadable.
    pub fn load() -> Option<Self> {
        Self::load_from(&settings_file()?)
    }

    pub fn load_from(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring unreadable connection settings");
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = settings_file() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        // Key paths are only meaningful for public-key auth.
        let mut to_store = self.clone();
        if !to_store.uses_public_key() {
            to_store.public_key_file = None;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&to_store)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

fn settings_file() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("world-portal").join("connection.toml"))
}

/// Where the game keeps world saves on this platform when nothing is
/// configured (Roaming AppData / Application Support / XDG data dir).
pub fn default_local_worlds_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Hytale")
        .join("UserData")
        .join("Saves")
}
