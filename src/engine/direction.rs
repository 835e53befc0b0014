//! Deciding which side of a matched pair is authoritative.

use chrono::DateTime;

use crate::model::WorldEntry;

/// Outcome of comparing the in-world clocks of a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Remote clock is strictly later: back up local, then mirror remote→local.
    PullRemote,
    /// Local clock is strictly later: back up remote, then mirror local→remote.
    PushLocal,
    /// Equal, missing or unparseable clocks: no transfer. Callers must report
    /// this as nothing-to-do and keep the affordance disabled, not merely
    /// ignore a press.
    UpToDate,
}

/// Compare the ISO-8601 game times of a matched local/remote pair.
pub fn resolve_sync_direction(local: &WorldEntry, remote: &WorldEntry) -> SyncDirection {
    let (Some(local_time), Some(remote_time)) = (
        parse_game_time(local.game_time_iso.as_deref()),
        parse_game_time(remote.game_time_iso.as_deref()),
    ) else {
        return SyncDirection::UpToDate;
    };

    if remote_time > local_time {
        SyncDirection::PullRemote
    } else if local_time > remote_time {
        SyncDirection::PushLocal
    } else {
        SyncDirection::UpToDate
    }
}

fn parse_game_time(value: Option<&str>) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc3339(value?.trim()).ok()
}
