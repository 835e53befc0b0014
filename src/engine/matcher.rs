//! Pairing local and remote listings that represent the same world.

use crate::model::{Side, WorldEntry, WorldRef};

/// Annotate both listings with same-world references.
///
/// All references are cleared first and rebuilt from scratch - there is no
/// incremental diffing across refreshes. Two entries are the same world iff
/// their identity tokens are present and equal and both carry a game time.
/// Game-time *equality* is deliberately not required: linking happens on
/// identity, freshness is decided later by the sync direction resolver.
/// One local world may match several remote copies and vice versa.
pub fn annotate_matches(local_worlds: &mut [WorldEntry], remote_worlds: &mut [WorldEntry]) {
    for world in local_worlds.iter_mut() {
        world.clear_same_world_refs();
    }
    for world in remote_worlds.iter_mut() {
        world.clear_same_world_refs();
    }

    // Listings are dozens of worlds at most; the quadratic pass is fine.
    for local in local_worlds.iter_mut() {
        for remote in remote_worlds.iter_mut() {
            if !is_same_world(local, remote) {
                continue;
            }
            local.add_same_world_ref(WorldRef {
                side: Side::Remote,
                id: remote.id.clone(),
            });
            remote.add_same_world_ref(WorldRef {
                side: Side::Local,
                id: local.id.clone(),
            });
        }
    }
}

fn is_same_world(left: &WorldEntry, right: &WorldEntry) -> bool {
    let (Some(left_uuid), Some(right_uuid)) = (
        non_blank(left.uuid_binary.as_deref()),
        non_blank(right.uuid_binary.as_deref()),
    ) else {
        return false;
    };
    if non_blank(left.game_time_iso.as_deref()).is_none()
        || non_blank(right.game_time_iso.as_deref()).is_none()
    {
        return false;
    }
    left_uuid == right_uuid
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
