//! The world synchronization & transfer engine.
//!
//! - **entry_set**: which paths under a world root participate at all
//! - **unique_name**: collision-free naming for landing worlds
//! - **mirror**: selective recursive copy, local↔remote
//! - **backup**: timestamped universe snapshots before destructive syncs
//! - **matcher**: pairing local/remote listings of the same world
//! - **direction**: deciding which side of a pair is authoritative
//! - **transfer**: the path-level operations
//! - **ops**: session lifecycle, failure labeling, the single-flight gate

pub mod backup;
pub mod direction;
pub mod entry_set;
pub mod matcher;
pub mod mirror;
pub mod ops;
pub mod transfer;
pub mod unique_name;

pub use direction::{SyncDirection, resolve_sync_direction};
pub use matcher::annotate_matches;
pub use ops::{SyncOutcome, TransferError, TransferGate};
pub use unique_name::resolve_unique_name;
