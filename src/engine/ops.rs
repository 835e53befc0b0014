//! Profile-level operations: session lifecycle, failure labeling, recovery.
//!
//! Every operation opens its own session (never pooled or shared), does its
//! work, and releases the session on every exit path - the [`RemoteSession`]
//! drops at the end of each function body, success or failure. Failures
//! surface as short classified messages; none of them leave the engine in a
//! state that blocks the next attempt.
//!
//! The engine itself places no limit on concurrent calls. Interactive
//! callers gate transfers through [`TransferGate`]; headless adopters must
//! serialize per world root or tolerate concurrent physical I/O on the same
//! path.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::engine::direction::{SyncDirection, resolve_sync_direction};
use crate::engine::transfer;
use crate::model::{RemoteProfile, WorldEntry};
use crate::remote::error::ConnectError;
use crate::remote::open_session;
use crate::worlds;

/// A labeled transfer failure. The display form is the short user-facing
/// summary; the source chain carries the diagnostics.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Upload failed.")]
    Upload(#[source] anyhow::Error),

    #[error("Download failed.")]
    Download(#[source] anyhow::Error),

    #[error("Sync failed.")]
    Sync(#[source] anyhow::Error),

    #[error("Remote rename failed.")]
    Rename(#[source] anyhow::Error),

    #[error("Remote delete failed.")]
    Delete(#[source] anyhow::Error),

    #[error("Listing remote worlds failed.")]
    List(#[source] anyhow::Error),
}

/// What a paired sync actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote was fresher: local copy overwritten.
    Pulled,
    /// Local was fresher: remote copy overwritten.
    Pushed,
    /// Clocks equal or missing: nothing transferred.
    UpToDate,
}

/// Upload a world to the remote base path, under a collision-free name.
///
/// Returns the created remote path, `None` when there was nothing to do.
/// On failure the local source is untouched (uploads read only from it) and
/// no remote cleanup is attempted - a retry resolves a fresh unique name;
/// a partial remote directory from the failed attempt is left behind.
pub fn upload(
    world: &WorldEntry,
    profile: &RemoteProfile,
) -> Result<Option<String>, TransferError> {
    if world.path.trim().is_empty() {
        return Ok(None);
    }
    let session = open_session(profile)?;
    transfer::upload_world(
        &session,
        std::path::Path::new(&world.path),
        &profile.remote_base_path,
    )
    .map_err(TransferError::Upload)
}

/// Download a remote world into the local worlds root, under a
/// collision-free name. A failed download removes the partial local tree.
pub fn download(
    world: &WorldEntry,
    profile: &RemoteProfile,
) -> Result<Option<PathBuf>, TransferError> {
    if world.path.trim().is_empty() || profile.local_worlds_path.trim().is_empty() {
        return Ok(None);
    }
    let requested_name = if world.id.trim().is_empty() {
        "DownloadedWorld"
    } else {
        world.id.as_str()
    };

    let session = open_session(profile)?;
    transfer::download_world(
        &session,
        &world.path,
        std::path::Path::new(&profile.local_worlds_path),
        requested_name,
    )
    .map(Some)
    .map_err(TransferError::Download)
}

/// Synchronize a matched pair: the fresher in-world clock wins, the losing
/// side's universe is backed up before being overwritten. Equal or missing
/// clocks transfer nothing.
pub fn sync_pair(
    local: &WorldEntry,
    remote: &WorldEntry,
    profile: &RemoteProfile,
) -> Result<SyncOutcome, TransferError> {
    if local.path.trim().is_empty() || remote.path.trim().is_empty() {
        return Ok(SyncOutcome::UpToDate);
    }

    let direction = resolve_sync_direction(local, remote);
    if direction == SyncDirection::UpToDate {
        return Ok(SyncOutcome::UpToDate);
    }

    let when = chrono::Local::now().naive_local();
    let session = open_session(profile)?;
    match direction {
        SyncDirection::PullRemote => {
            transfer::sync_remote_to_local(
                &session,
                &remote.path,
                std::path::Path::new(&local.path),
                when,
            )
            .map_err(TransferError::Sync)?;
            Ok(SyncOutcome::Pulled)
        }
        SyncDirection::PushLocal => {
            transfer::sync_local_to_remote(
                &session,
                std::path::Path::new(&local.path),
                &remote.path,
                when,
            )
            .map_err(TransferError::Sync)?;
            Ok(SyncOutcome::Pushed)
        }
        SyncDirection::UpToDate => Ok(SyncOutcome::UpToDate),
    }
}

/// Rename a remote world folder; returns the new remote path.
pub fn rename_remote(
    world: &WorldEntry,
    requested_folder_name: &str,
    profile: &RemoteProfile,
) -> Result<String, TransferError> {
    let session = open_session(profile)?;
    transfer::rename_remote_world(&session, &world.path, requested_folder_name)
        .map_err(TransferError::Rename)
}

/// Recursively delete a remote world.
pub fn delete_remote(world: &WorldEntry, profile: &RemoteProfile) -> Result<(), TransferError> {
    let session = open_session(profile)?;
    transfer::delete_remote_world(&session, &world.path).map_err(TransferError::Delete)
}

/// List the worlds under the profile's remote base path.
pub fn list_remote(profile: &RemoteProfile) -> Result<Vec<WorldEntry>, TransferError> {
    if profile.remote_base_path.trim().is_empty() {
        return Ok(Vec::new());
    }
    let session = open_session(profile)?;
    worlds::remote::list_remote_worlds(&session, &profile.remote_base_path)
        .map_err(TransferError::List)
}

/// Single-flight gate for user-triggered transfers: at most one permit is
/// out at a time; a second `try_begin` while one is live returns `None`
/// (callers skip, they do not queue).
#[derive(Default)]
pub struct TransferGate {
    in_flight: AtomicBool,
}

impl TransferGate {
    pub const fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn try_begin(&self) -> Option<TransferPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        Some(TransferPermit { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped, on every exit path.
pub struct TransferPermit<'a> {
    gate: &'a TransferGate,
}

impl Drop for TransferPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}
