//! Command-line surface.
//!
//! Every transfer-initiating command runs on a blocking worker under the
//! single-flight [`TransferGate`]; the async control layer never blocks on
//! SSH I/O itself. Status lines follow the transfer: "Uploading..." while the
//! worker runs, then the success or failure summary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{ConnectionSettings, default_local_worlds_path};
use crate::engine::{self, SyncOutcome, TransferGate, annotate_matches, ops};
use crate::model::{AuthMethod, RemoteProfile, Side, WorldEntry};
use crate::remote::{check_connection, open_session};
use crate::whitelist::{self, WhitelistConfig};
use crate::worlds::{self, PreviewFetch, PreviewFetcher};

#[derive(Parser)]
#[command(
    name = "wportal",
    version,
    about = "Sync, back up and manage game world saves between local disk and remote SSH hosts"
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection overrides; anything unset falls back to the saved settings.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Remote host name or address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// SSH port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// SSH username
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Directory on the remote holding world folders
    #[arg(long, global = true)]
    pub remote_path: Option<String>,

    /// Key file for public-key auth (a .pub path resolves to its private sibling)
    #[arg(long, global = true)]
    pub key_file: Option<PathBuf>,

    /// Password for password auth; prompted for when needed and not set
    #[arg(long, global = true, env = "WPORTAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Directory on this machine holding world folders
    #[arg(long, global = true)]
    pub local_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Probe the connection and remember it on success
    Connect,
    /// List worlds with same-world annotations
    List {
        /// Only the local side (no connection needed)
        #[arg(long)]
        local: bool,
        /// Only the remote side
        #[arg(long)]
        remote: bool,
        /// Also fetch remote preview images into the cache
        #[arg(long)]
        previews: bool,
    },
    /// Upload a local world to the remote, under a collision-free name
    Upload {
        /// Local world folder name
        id: String,
    },
    /// Download a remote world into the local worlds directory
    Download {
        /// Remote world folder name
        id: String,
    },
    /// Synchronize a matched pair; the fresher in-world clock wins
    Sync {
        /// Local world folder name
        local_id: String,
        /// Remote world folder name; resolved through same-world matches when omitted
        remote_id: Option<String>,
    },
    /// Snapshot a local world's universe into backup/<timestamp>.zip
    Backup {
        /// Local world folder name
        id: String,
    },
    /// Rename a remote world folder
    RenameRemote {
        /// Remote world folder name
        id: String,
        /// New folder name
        name: String,
    },
    /// Delete a remote world and everything under it
    DeleteRemote {
        /// Remote world folder name
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show or edit a local world's player whitelist
    Whitelist {
        #[command(subcommand)]
        command: WhitelistCommand,
    },
}

#[derive(Subcommand)]
pub enum WhitelistCommand {
    Show { id: String },
    Enable { id: String },
    Disable { id: String },
    Add { id: String, uuid: String },
    Remove { id: String, uuid: String },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Connect => connect(&cli.connection).await,
        Command::List {
            local,
            remote,
            previews,
        } => list(&cli.connection, local, remote, previews).await,
        Command::Upload { ref id } => upload(&cli.connection, id).await,
        Command::Download { ref id } => download(&cli.connection, id).await,
        Command::Sync {
            ref local_id,
            ref remote_id,
        } => sync(&cli.connection, local_id, remote_id.as_deref()).await,
        Command::Backup { ref id } => backup(&cli.connection, id),
        Command::RenameRemote { ref id, ref name } => {
            rename_remote(&cli.connection, id, name).await
        }
        Command::DeleteRemote { ref id, yes } => delete_remote(&cli.connection, id, yes).await,
        Command::Whitelist { ref command } => run_whitelist(&cli.connection, command),
    }
}

async fn connect(args: &ConnectionArgs) -> Result<()> {
    let profile = build_profile(args)?;
    let probe = {
        let profile = profile.clone();
        tokio::task::spawn_blocking(move || check_connection(&profile))
            .await
            .context("connection worker panicked")?
    };
    match probe {
        Ok(()) => {
            save_settings(&profile);
            println!("{}", "Connected.".green());
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", failure.to_string().red());
            Err(anyhow!("{failure}"))
        }
    }
}

async fn list(args: &ConnectionArgs, local_only: bool, remote_only: bool, previews: bool) -> Result<()> {
    let local_root = local_worlds_root(args);
    let mut local_worlds = if remote_only {
        Vec::new()
    } else {
        worlds::list_local_worlds(&local_root)
    };

    let mut remote_worlds = if local_only {
        Vec::new()
    } else {
        let profile = build_profile(args)?;
        let listing = {
            let profile = profile.clone();
            tokio::task::spawn_blocking(move || ops::list_remote(&profile))
                .await
                .context("listing worker panicked")?
        };
        let mut remote_worlds = listing.map_err(|failure| anyhow!("{failure}"))?;
        if previews {
            fetch_previews(&profile, &mut remote_worlds).await?;
        }
        remote_worlds
    };

    annotate_matches(&mut local_worlds, &mut remote_worlds);

    if !remote_only {
        println!("{}", "Local worlds".bold());
        print_worlds(&local_worlds, Side::Remote);
    }
    if !local_only {
        println!("{}", "Remote worlds".bold());
        print_worlds(&remote_worlds, Side::Local);
    }
    Ok(())
}

async fn fetch_previews(profile: &RemoteProfile, remote_worlds: &mut [WorldEntry]) -> Result<()> {
    let profile = profile.clone();
    let mut worlds_copy = remote_worlds.to_vec();
    let fetched = tokio::task::spawn_blocking(move || -> Result<Vec<WorldEntry>> {
        let session = open_session(&profile).map_err(|failure| anyhow!("{failure}"))?;
        let fetcher = PreviewFetcher::new();
        for world in worlds_copy.iter_mut() {
            match fetcher.fetch(&session, world, &profile) {
                PreviewFetch::Fetched(path) | PreviewFetch::Cached(path) => {
                    world.preview_image_path = Some(path.to_string_lossy().into_owned());
                }
                PreviewFetch::InFlight | PreviewFetch::Unavailable => {}
            }
        }
        Ok(worlds_copy)
    })
    .await
    .context("preview worker panicked")??;

    for (world, fetched) in remote_worlds.iter_mut().zip(fetched) {
        world.preview_image_path = fetched.preview_image_path;
    }
    Ok(())
}

fn print_worlds(worlds: &[WorldEntry], other_side: Side) {
    if worlds.is_empty() {
        println!("  (none)");
        return;
    }
    for world in worlds {
        let last_played = world
            .last_modified
            .map(|when| when.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let mut line = format!(
            "  {} ({})  GameMode: {}  Last played: {}",
            world.display_name(),
            world.id,
            world.game_mode.as_deref().unwrap_or("Unknown"),
            last_played,
        );
        if !world.same_world_refs.is_empty() {
            let names: Vec<&str> = world
                .same_world_refs
                .iter()
                .map(|reference| reference.id.as_str())
                .collect();
            line.push_str(&format!("  same as: {} {}", other_side, names.join(", ")));
        }
        println!("{line}");
    }
}

async fn upload(args: &ConnectionArgs, id: &str) -> Result<()> {
    let world = find_local_world(args, id)?;
    let profile = build_profile(args)?;
    let outcome = run_transfer("Uploading...", move || ops::upload(&world, &profile)).await?;
    match outcome {
        Some(remote_path) => println!("{} {}", "Upload finished.".green(), remote_path.dimmed()),
        None => println!("Nothing to upload."),
    }
    Ok(())
}

async fn download(args: &ConnectionArgs, id: &str) -> Result<()> {
    let profile = build_profile(args)?;
    let world = find_remote_world(&profile, id).await?;
    let outcome = run_transfer("Downloading...", move || ops::download(&world, &profile)).await?;
    match outcome {
        Some(path) => println!(
            "{} {}",
            "Download finished.".green(),
            path.display().to_string().dimmed()
        ),
        None => println!("Nothing to download."),
    }
    Ok(())
}

async fn sync(args: &ConnectionArgs, local_id: &str, remote_id: Option<&str>) -> Result<()> {
    let profile = build_profile(args)?;
    let mut local_worlds = worlds::list_local_worlds(&local_worlds_root(args));
    let mut remote_worlds = {
        let profile = profile.clone();
        tokio::task::spawn_blocking(move || ops::list_remote(&profile))
            .await
            .context("listing worker panicked")?
            .map_err(|failure| anyhow!("{failure}"))?
    };
    annotate_matches(&mut local_worlds, &mut remote_worlds);

    let local = local_worlds
        .iter()
        .find(|world| world.id == local_id)
        .cloned()
        .ok_or_else(|| anyhow!("Local world '{local_id}' not found."))?;

    let remote = match remote_id {
        Some(remote_id) => remote_worlds
            .iter()
            .find(|world| world.id == remote_id)
            .cloned()
            .ok_or_else(|| anyhow!("Remote world '{remote_id}' not found."))?,
        None => resolve_matched_remote(&local, &remote_worlds)?,
    };

    let outcome = run_transfer("Syncing...", move || ops::sync_pair(&local, &remote, &profile)).await?;
    match outcome {
        SyncOutcome::Pulled => println!("{} (remote was newer)", "Sync finished.".green()),
        SyncOutcome::Pushed => println!("{} (local was newer)", "Sync finished.".green()),
        SyncOutcome::UpToDate => println!("Already in sync."),
    }
    Ok(())
}

/// Pick the sync counterpart through the matcher's same-world references.
fn resolve_matched_remote(local: &WorldEntry, remote_worlds: &[WorldEntry]) -> Result<WorldEntry> {
    let matched: Vec<&WorldEntry> = local
        .same_world_refs
        .iter()
        .filter(|reference| reference.side == Side::Remote)
        .filter_map(|reference| remote_worlds.iter().find(|world| world.id == reference.id))
        .collect();
    match matched.as_slice() {
        [] => bail!(
            "No matching remote world for '{}'; pass the remote folder name explicitly.",
            local.id
        ),
        [only] => Ok((*only).clone()),
        many => bail!(
            "'{}' matches several remote worlds ({}); pass the remote folder name explicitly.",
            local.id,
            many.iter()
                .map(|world| world.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn backup(args: &ConnectionArgs, id: &str) -> Result<()> {
    let world = find_local_world(args, id)?;
    let archive = engine::backup::create_universe_backup(
        Path::new(&world.path),
        chrono::Local::now().naive_local(),
    )?;
    println!(
        "{} {}",
        "Backup written.".green(),
        archive.display().to_string().dimmed()
    );
    Ok(())
}

async fn rename_remote(args: &ConnectionArgs, id: &str, name: &str) -> Result<()> {
    let profile = build_profile(args)?;
    let world = find_remote_world(&profile, id).await?;
    let name = name.to_string();
    let renamed =
        run_transfer("Renaming...", move || ops::rename_remote(&world, &name, &profile)).await?;
    println!("{} {}", "Rename finished.".green(), renamed.dimmed());
    Ok(())
}

async fn delete_remote(args: &ConnectionArgs, id: &str, yes: bool) -> Result<()> {
    let profile = build_profile(args)?;
    let world = find_remote_world(&profile, id).await?;

    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Delete remote world '{}' and everything under it?",
                world.display_name()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    run_transfer("Deleting...", move || ops::delete_remote(&world, &profile)).await?;
    println!("{}", "Remote world deleted.".green());
    Ok(())
}

fn run_whitelist(args: &ConnectionArgs, command: &WhitelistCommand) -> Result<()> {
    match command {
        WhitelistCommand::Show { id } => {
            let world_dir = local_world_dir(args, id)?;
            let config = whitelist::load(&world_dir)?;
            println!(
                "Whitelist {}",
                if config.enabled { "enabled" } else { "disabled" }
            );
            for player in &config.players {
                println!("  {player}");
            }
            Ok(())
        }
        WhitelistCommand::Enable { id } => set_whitelist_enabled(args, id, true),
        WhitelistCommand::Disable { id } => set_whitelist_enabled(args, id, false),
        WhitelistCommand::Add { id, uuid } => {
            if uuid::Uuid::parse_str(uuid.trim()).is_err() {
                bail!("Invalid UUID format.");
            }
            let world_dir = local_world_dir(args, id)?;
            let config = whitelist::load(&world_dir)?;
            let mut players = config.players;
            players.push(uuid.trim().to_string());
            whitelist::save(&world_dir, &WhitelistConfig::new(config.enabled, players))?;
            println!("Added {uuid}.");
            Ok(())
        }
        WhitelistCommand::Remove { id, uuid } => {
            let world_dir = local_world_dir(args, id)?;
            let config = whitelist::load(&world_dir)?;
            let players: Vec<String> = config
                .players
                .into_iter()
                .filter(|player| player != uuid.trim())
                .collect();
            whitelist::save(&world_dir, &WhitelistConfig::new(config.enabled, players))?;
            println!("Removed {uuid}.");
            Ok(())
        }
    }
}

fn set_whitelist_enabled(args: &ConnectionArgs, id: &str, enabled: bool) -> Result<()> {
    let world_dir = local_world_dir(args, id)?;
    let config = whitelist::load(&world_dir)?;
    whitelist::save(&world_dir, &WhitelistConfig::new(enabled, config.players))?;
    println!(
        "Whitelist {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Run one transfer on a blocking worker under the single-flight gate,
/// showing a spinner while it runs. The failure summary replaces the status
/// line and the command exits non-zero, ready to be re-triggered.
async fn run_transfer<T, E, F>(running_text: &str, work: F) -> Result<T>
where
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    let gate = TransferGate::new();
    let _permit = gate
        .try_begin()
        .context("another transfer is already running")?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(running_text.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = tokio::task::spawn_blocking(work)
        .await
        .context("transfer worker panicked")?;
    spinner.finish_and_clear();

    outcome.map_err(|failure| {
        eprintln!("{}", failure.to_string().red());
        let mut source = std::error::Error::source(&failure);
        while let Some(cause) = source {
            eprintln!("  {}", format!("caused by: {cause}").dimmed());
            source = cause.source();
        }
        anyhow!("{failure}")
    })
}

fn build_profile(args: &ConnectionArgs) -> Result<RemoteProfile> {
    let saved = ConnectionSettings::load().unwrap_or_default();

    let host = args.host.clone().unwrap_or(saved.host.clone());
    let port = args.port.unwrap_or(saved.port);
    let username = args.username.clone().unwrap_or(saved.username.clone());
    let remote_base_path = args.remote_path.clone().unwrap_or(saved.remote_path.clone());

    let auth = if let Some(key_file) = &args.key_file {
        AuthMethod::PublicKey(key_file.clone())
    } else if saved.uses_public_key() {
        AuthMethod::PublicKey(saved.public_key_file.clone().unwrap_or_default())
    } else {
        let password = match &args.password {
            Some(password) => password.clone(),
            None => dialoguer::Password::new()
                .with_prompt(format!("Password for {username}@{host}"))
                .allow_empty_password(true)
                .interact()
                .context("read password")?,
        };
        AuthMethod::Password(password)
    };

    Ok(RemoteProfile {
        host,
        port,
        username,
        remote_base_path,
        auth,
        local_worlds_path: local_worlds_root(args).to_string_lossy().into_owned(),
    })
}

fn save_settings(profile: &RemoteProfile) {
    let settings = ConnectionSettings {
        host: profile.host.clone(),
        port: profile.port,
        username: profile.username.clone(),
        remote_path: profile.remote_base_path.clone(),
        auth_type: profile.auth.label().to_string(),
        public_key_file: match &profile.auth {
            AuthMethod::PublicKey(key_file) => Some(key_file.clone()),
            AuthMethod::Password(_) => None,
        },
        local_worlds_path: profile.local_worlds_path.clone(),
    };
    if let Err(error) = settings.save() {
        tracing::warn!(%error, "could not remember connection settings");
    }
}

fn local_worlds_root(args: &ConnectionArgs) -> PathBuf {
    if let Some(path) = &args.local_path {
        return path.clone();
    }
    if let Some(saved) = ConnectionSettings::load() {
        if !saved.local_worlds_path.trim().is_empty() {
            return PathBuf::from(saved.local_worlds_path);
        }
    }
    default_local_worlds_path()
}

fn find_local_world(args: &ConnectionArgs, id: &str) -> Result<WorldEntry> {
    let root = local_worlds_root(args);
    worlds::list_local_worlds(&root)
        .into_iter()
        .find(|world| world.id == id)
        .ok_or_else(|| anyhow!("Local world '{id}' not found under {}.", root.display()))
}

fn local_world_dir(args: &ConnectionArgs, id: &str) -> Result<PathBuf> {
    Ok(PathBuf::from(find_local_world(args, id)?.path))
}

async fn find_remote_world(profile: &RemoteProfile, id: &str) -> Result<WorldEntry> {
    let listing = {
        let profile = profile.clone();
        tokio::task::spawn_blocking(move || ops::list_remote(&profile))
            .await
            .context("listing worker panicked")?
    };
    listing
        .map_err(|failure| anyhow!("{failure}"))?
        .into_iter()
        .find(|world| world.id == id)
        .ok_or_else(|| anyhow!("Remote world '{id}' not found."))
}
