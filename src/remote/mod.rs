//! Remote host access: session establishment and the filesystem capability
//! the transfer engine consumes.

pub mod error;
pub mod fs;
pub mod session;

#[cfg(test)]
pub mod testfs;

pub use error::ConnectError;
pub use fs::{RemoteDirEntry, RemoteFs, RemoteStat, rpath};
pub use session::{RemoteSession, check_connection, open_session};
