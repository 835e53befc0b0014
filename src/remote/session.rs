//! Authenticated SFTP session management.
//!
//! A [`RemoteSession`] is opened per operation, never pooled, and released
//! when dropped - every exit path of an operation closes the connection.
//! Profile validation happens before any I/O; transport failures are
//! translated into the short classified messages of
//! [`ConnectError`](super::error::ConnectError).

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::model::{AuthMethod, RemoteProfile};
use crate::remote::error::{ConnectError, classify_connect_failure};
use crate::remote::fs::{RemoteDirEntry, RemoteFs, RemoteStat};

/// Fixed connect/handshake/auth timeout. The data-transfer phase afterwards
/// is unbounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// An open, authenticated SFTP session. Dropping it disconnects.
pub struct RemoteSession {
    // Kept alive for the sftp channel; ssh2 tears the transport down on drop.
    _session: ssh2::Session,
    sftp: ssh2::Sftp,
}

/// Validate a profile, connect, authenticate and open the SFTP channel.
pub fn open_session(profile: &RemoteProfile) -> Result<RemoteSession, ConnectError> {
    validate_profile(profile)?;
    connect(profile).map_err(|failure| classify_connect_failure(&format!("{failure:#}")))
}

/// Connect-then-drop probe used by the `connect` command.
pub fn check_connection(profile: &RemoteProfile) -> Result<(), ConnectError> {
    open_session(profile).map(|_| ())
}

fn validate_profile(profile: &RemoteProfile) -> Result<(), ConnectError> {
    if profile.host.trim().is_empty() {
        return Err(ConnectError::validation("Host is required."));
    }
    if profile.username.trim().is_empty() {
        return Err(ConnectError::validation("Username is required."));
    }
    match &profile.auth {
        AuthMethod::Password(password) if password.trim().is_empty() => {
            Err(ConnectError::validation("Password is required."))
        }
        AuthMethod::PublicKey(key) if key.as_os_str().is_empty() => {
            Err(ConnectError::validation("Public key file is required."))
        }
        _ => Ok(()),
    }
}

fn connect(profile: &RemoteProfile) -> Result<RemoteSession> {
    let host = profile.host.trim();
    let port = profile.port_or_default();
    let address = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("failed to lookup {host}"))?
        .next()
        .context("no addresses resolved")?;

    let tcp = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT)
        .with_context(|| format!("connect to {address}"))?;

    let mut session = ssh2::Session::new().context("create SSH session")?;
    session.set_tcp_stream(tcp);
    session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
    session.handshake().context("SSH handshake")?;

    let username = profile.username.trim();
    match &profile.auth {
        AuthMethod::Password(password) => {
            session
                .userauth_password(username, password)
                .context("authentication")?;
        }
        AuthMethod::PublicKey(key_file) => {
            let private_key = resolve_private_key_path(key_file);
            session
                .userauth_pubkey_file(username, None, &private_key, None)
                .context("authentication")?;
        }
    }
    if !session.authenticated() {
        anyhow::bail!("authentication failed");
    }

    let sftp = session.sftp().context("open SFTP channel")?;

    // Transfers can legitimately run for a long time once connected; only
    // the connect phase is bounded.
    session.set_timeout(0);

    tracing::debug!(host = %host, port, "opened SFTP session");
    Ok(RemoteSession {
        _session: session,
        sftp,
    })
}

/// A selected `.pub` file stands in for its sibling private key when that
/// sibling exists.
fn resolve_private_key_path(selected: &Path) -> PathBuf {
    if let Some(stripped) = selected
        .to_str()
        .and_then(|path| path.strip_suffix(".pub"))
    {
        let private_key = PathBuf::from(stripped);
        if private_key.exists() {
            return private_key;
        }
    }
    selected.to_path_buf()
}

impl RemoteFs for RemoteSession {
    fn stat(&self, path: &str) -> Result<RemoteStat> {
        let stat = self.sftp.stat(Path::new(path))?;
        Ok(RemoteStat {
            is_dir: stat.is_dir(),
            mtime: stat.mtime.map(|seconds| seconds as i64),
            size: stat.size,
        })
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteDirEntry>> {
        let entries = self.sftp.readdir(Path::new(path))?;
        Ok(entries
            .into_iter()
            .filter_map(|(child, stat)| {
                let name = child.file_name()?.to_str()?.to_string();
                Some(RemoteDirEntry {
                    name,
                    stat: RemoteStat {
                        is_dir: stat.is_dir(),
                        mtime: stat.mtime.map(|seconds| seconds as i64),
                        size: stat.size,
                    },
                })
            })
            .collect())
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        self.sftp.mkdir(Path::new(path), 0o755)?;
        Ok(())
    }

    fn read_to(&self, path: &str, out: &mut dyn Write) -> Result<u64> {
        let mut remote = self.sftp.open(Path::new(path))?;
        Ok(std::io::copy(&mut remote, out)?)
    }

    fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let mut source = self.sftp.open(Path::new(remote))?;
        let mut target = std::fs::File::create(local)
            .with_context(|| format!("create {}", local.display()))?;
        std::io::copy(&mut source, &mut target)?;
        Ok(())
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let mut source = std::fs::File::open(local)
            .with_context(|| format!("open {}", local.display()))?;
        let mut target = self.sftp.create(Path::new(remote))?;
        std::io::copy(&mut source, &mut target)?;
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        self.sftp.unlink(Path::new(path))?;
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> Result<()> {
        self.sftp.rmdir(Path::new(path))?;
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.sftp.rename(Path::new(from), Path::new(to), None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(host: &str, username: &str, auth: AuthMethod) -> RemoteProfile {
        RemoteProfile {
            host: host.into(),
            port: 22,
            username: username.into(),
            remote_base_path: "/srv/worlds".into(),
            auth,
            local_worlds_path: "/tmp/worlds".into(),
        }
    }

    #[test]
    fn validation_rejects_blank_host_before_any_io() {
        let error = open_session(&profile("", "user", AuthMethod::Password("x".into())))
            .err()
            .unwrap();
        assert_eq!(error, ConnectError::Validation("Host is required.".into()));
    }

    #[test]
    fn validation_rejects_blank_username() {
        let error = open_session(&profile("h", "  ", AuthMethod::Password("x".into())))
            .err()
            .unwrap();
        assert_eq!(
            error,
            ConnectError::Validation("Username is required.".into())
        );
    }

    #[test]
    fn validation_rejects_missing_credential_material() {
        let error = open_session(&profile("h", "u", AuthMethod::Password(String::new())))
            .err()
            .unwrap();
        assert_eq!(
            error,
            ConnectError::Validation("Password is required.".into())
        );

        let error = open_session(&profile("h", "u", AuthMethod::PublicKey(PathBuf::new())))
            .err()
            .unwrap();
        assert_eq!(
            error,
            ConnectError::Validation("Public key file is required.".into())
        );
    }

    #[test]
    fn pub_suffix_resolves_to_existing_private_key() {
        let dir = tempfile::tempdir().unwrap();
        let private_key = dir.path().join("id_ed25519");
        std::fs::write(&private_key, "key").unwrap();
        let public_key = dir.path().join("id_ed25519.pub");

        assert_eq!(resolve_private_key_path(&public_key), private_key);

        // No sibling private key: the selected path is used as-is.
        let lone = dir.path().join("other.pub");
        assert_eq!(resolve_private_key_path(&lone), lone);
    }
}
