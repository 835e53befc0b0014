//! Lazy preview image fetches with an in-flight registry.
//!
//! Preview downloads ride alongside listings and may be requested for the
//! same world repeatedly while one is still running. The registry
//! deduplicates by world id: a fetch already in flight is skipped, not
//! queued.

use std::collections::HashSet;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::engine::entry_set;
use crate::model::{RemoteProfile, WorldEntry};
use crate::remote::fs::{RemoteFs, rpath};

/// How a preview request resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewFetch {
    /// Freshly downloaded into the cache.
    Fetched(PathBuf),
    /// A usable cached file already existed; nothing was downloaded.
    Cached(PathBuf),
    /// Another fetch for this world id is still running; skipped.
    InFlight,
    /// No id, no remote preview, or the download failed.
    Unavailable,
}

#[derive(Default)]
pub struct PreviewFetcher {
    in_flight: Mutex<HashSet<String>>,
}

impl PreviewFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the preview image for a remote world into the local cache.
    pub fn fetch(
        &self,
        fs: &dyn RemoteFs,
        world: &WorldEntry,
        profile: &RemoteProfile,
    ) -> PreviewFetch {
        if world.id.trim().is_empty() {
            return PreviewFetch::Unavailable;
        }

        let Some(_guard) = InFlightGuard::register(&self.in_flight, &world.id) else {
            return PreviewFetch::InFlight;
        };

        let Some(cache_file) = preview_cache_file(profile, world) else {
            return PreviewFetch::Unavailable;
        };
        if is_non_empty_file(&cache_file) {
            return PreviewFetch::Cached(cache_file);
        }

        let remote_preview = rpath::join(&world.path, entry_set::PREVIEW_FILE);
        if !fs.exists(&remote_preview) {
            return PreviewFetch::Unavailable;
        }

        if let Some(parent) = cache_file.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return PreviewFetch::Unavailable;
            }
        }
        match fs.download(&remote_preview, &cache_file) {
            Ok(()) => PreviewFetch::Fetched(cache_file),
            Err(error) => {
                tracing::debug!(world = %world.id, %error, "preview download failed");
                let _ = std::fs::remove_file(&cache_file);
                PreviewFetch::Unavailable
            }
        }
    }

    /// Whether a fetch for this world id is currently registered.
    pub fn is_in_flight(&self, world_id: &str) -> bool {
        self.in_flight.lock().contains(world_id)
    }
}

/// Cache location for a remote world's preview, keyed by host and world id.
pub fn preview_cache_file(profile: &RemoteProfile, world: &WorldEntry) -> Option<PathBuf> {
    let host = if profile.host.trim().is_empty() {
        return None;
    } else {
        profile.host.trim()
    };
    Some(
        dirs::cache_dir()?
            .join("world-portal")
            .join("previews")
            .join(host)
            .join(format!("{}.png", world.id)),
    )
}

fn is_non_empty_file(path: &std::path::Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Registry entry that removes itself on drop, so a panicking or failing
/// fetch never wedges its world id.
struct InFlightGuard<'a> {
    registry: &'a Mutex<HashSet<String>>,
    id: String,
}

impl<'a> InFlightGuard<'a> {
    fn register(registry: &'a Mutex<HashSet<String>>, id: &str) -> Option<Self> {
        if !registry.lock().insert(id.to_string()) {
            return None;
        }
        Some(Self {
            registry,
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testfs::MemoryFs;

    fn profile() -> RemoteProfile {
        RemoteProfile {
            host: "worlds.example.com".into(),
            port: 22,
            username: "u".into(),
            remote_base_path: "/srv/worlds".into(),
            auth: crate::model::AuthMethod::Password("x".into()),
            local_worlds_path: "/tmp".into(),
        }
    }

    fn world(id: &str) -> WorldEntry {
        WorldEntry {
            id: id.into(),
            path: format!("/srv/worlds/{id}"),
            ..Default::default()
        }
    }

    #[test]
    fn concurrent_fetches_for_the_same_id_are_skipped() {
        let fetcher = PreviewFetcher::new();
        let registry = &fetcher.in_flight;

        let guard = InFlightGuard::register(registry, "Alpha").unwrap();
        assert!(fetcher.is_in_flight("Alpha"));

        let fs = MemoryFs::new();
        assert_eq!(
            fetcher.fetch(&fs, &world("Alpha"), &profile()),
            PreviewFetch::InFlight
        );

        drop(guard);
        assert!(!fetcher.is_in_flight("Alpha"));
    }

    #[test]
    fn blank_world_id_is_unavailable() {
        let fetcher = PreviewFetcher::new();
        let fs = MemoryFs::new();
        assert_eq!(
            fetcher.fetch(&fs, &world("  "), &profile()),
            PreviewFetch::Unavailable
        );
    }

    #[test]
    fn missing_remote_preview_is_unavailable_and_clears_the_registry() {
        let fetcher = PreviewFetcher::new();
        let fs = MemoryFs::new();
        fs.add_dir("/srv/worlds/Alpha");

        assert_eq!(
            fetcher.fetch(&fs, &world("Alpha"), &profile()),
            PreviewFetch::Unavailable
        );
        assert!(!fetcher.is_in_flight("Alpha"));
    }

    #[test]
    fn cache_file_is_keyed_by_host_and_world_id() {
        let path = preview_cache_file(&profile(), &world("Alpha")).unwrap();
        let rendered = path.to_string_lossy();
        assert!(rendered.contains("worlds.example.com"));
        assert!(rendered.ends_with("Alpha.png"));

        let mut blank_host = profile();
        blank_host.host = " ".into();
        assert!(preview_cache_file(&blank_host, &world("Alpha")).is_none());
    }
}
