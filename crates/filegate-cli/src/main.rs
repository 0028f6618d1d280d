//! filegate - command-line client for the file-browser service.
//!
//! Logs in once, keeps the session cookie in the cache directory, and reuses
//! it for later `fetch`, `ls` and `info` commands until it expires.

mod format;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use filegate_core::{
    ClientError, Config, CredentialStore, Credentials, FileClient, KeychainError, SessionStore,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use format::{format_size, format_timestamp, truncate_string};

/// Longest name shown in the `ls` name column before truncating
const NAME_COLUMN_WIDTH: usize = 40;

#[derive(Parser)]
#[command(name = "filegate", version, about = "Client for the file-browser service")]
struct Cli {
    /// Server base URL (overrides config and FILEGATE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and save the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Store the password in the OS keychain for automatic re-login
        #[arg(long)]
        remember: bool,
    },
    /// End the session and forget stored credentials
    Logout,
    /// Download a file, to stdout unless --output is given
    Fetch {
        path: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Print the raw JSON listing
        #[arg(long)]
        json: bool,
    },
    /// Show metadata for a path
    Info {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the user the session belongs to
    Whoami,
    /// Check that the server is up
    Health,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    debug!(base_url = %config.base_url, "Config loaded");

    let client = FileClient::from_config(&config)?;
    let sessions = SessionStore::new(config.cache_dir()?);

    match cli.command {
        Command::Login { username, remember } => {
            login(&client, &sessions, &mut config, username, remember).await
        }
        Command::Logout => logout(&client, &sessions, &config).await,
        Command::Health => health(&client).await,
        Command::Fetch { path, output } => {
            ensure_session(&client, &sessions, &config).await?;
            fetch(&client, &path, output).await
        }
        Command::Ls { path, json } => {
            ensure_session(&client, &sessions, &config).await?;
            list(&client, &path, json).await
        }
        Command::Info { path, json } => {
            ensure_session(&client, &sessions, &config).await?;
            info_cmd(&client, &path, json).await
        }
        Command::Whoami => {
            ensure_session(&client, &sessions, &config).await?;
            let user = client.current_user().await.map_err(friendly)?;
            println!("{}", user.username);
            Ok(())
        }
    }
}

/// Turn auth failures into a hint to log in; everything else passes through
fn friendly(err: ClientError) -> anyhow::Error {
    if err.is_auth_error() {
        anyhow::anyhow!("{}. Run `filegate login` to sign in.", err)
    } else {
        err.into()
    }
}

/// Make sure the client holds a live session: the saved one, or a fresh
/// login with keychain credentials for the last user.
async fn ensure_session(client: &FileClient, sessions: &SessionStore, config: &Config) -> Result<()> {
    match sessions.load() {
        Ok(Some(data)) => {
            if client.restore_session(data).await {
                return Ok(());
            }
        }
        Ok(None) => debug!("No saved session"),
        Err(e) => warn!(error = %e, "Failed to load saved session"),
    }

    if let Some(ref username) = config.last_username {
        match CredentialStore::new().load(username) {
            Ok(credentials) => {
                info!(username = %credentials.username(), "Session expired, logging in with stored credentials");
                client.authenticate(&credentials).await.map_err(friendly)?;
                save_session(client, sessions).await;
                return Ok(());
            }
            Err(KeychainError::NotFound(_)) => debug!(username = %username, "No stored password"),
            Err(e) => warn!(error = %e, "Could not read stored credentials"),
        }
    }

    bail!("Not logged in. Run `filegate login` first.")
}

async fn save_session(client: &FileClient, sessions: &SessionStore) {
    if let Some(data) = client.session().await {
        if let Err(e) = sessions.save(&data) {
            warn!(error = %e, "Failed to save session");
        }
    }
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

async fn login(
    client: &FileClient,
    sessions: &SessionStore,
    config: &mut Config,
    username: Option<String>,
    remember: bool,
) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(u) => u,
        None => prompt_username()?,
    };

    let keychain = CredentialStore::new();
    let stored = match keychain.get_password(&username) {
        Ok(password) => Some(password),
        Err(KeychainError::NotFound(_)) => None,
        Err(e) => {
            warn!(error = %e, "Could not read stored password");
            None
        }
    };
    let password = match Config::env_password().or(stored) {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let credentials = Credentials::new(username, password)?;
    client.authenticate(&credentials).await?;

    if remember {
        match keychain.store(&credentials) {
            Ok(()) => eprintln!("Password saved to the OS keychain"),
            Err(e) => eprintln!("Password not remembered: {}", e),
        }
    }

    config.last_username = Some(credentials.username().to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    save_session(client, sessions).await;

    if let Some(session) = client.session().await {
        println!(
            "Logged in as {} (session valid for {} minutes)",
            session.username,
            session.minutes_until_expiry()
        );
    }
    Ok(())
}

async fn logout(client: &FileClient, sessions: &SessionStore, config: &Config) -> Result<()> {
    if let Ok(Some(data)) = sessions.load() {
        client.restore_session(data).await;
    }

    let result = client.logout().await;
    sessions.clear()?;

    if let Some(ref username) = config.last_username {
        match CredentialStore::new().delete(username) {
            Ok(true) => debug!(username = %username, "Removed stored password"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to remove stored password"),
        }
    }

    match result {
        Ok(()) => println!("Logged out"),
        Err(e) => {
            warn!(error = %e, "Server did not acknowledge logout");
            println!("Logged out locally (server said: {})", e);
        }
    }
    Ok(())
}

async fn health(client: &FileClient) -> Result<()> {
    let status = client.health().await?;
    if !status.is_ok() {
        bail!("Server reports status {}", status.status);
    }
    println!("ok ({})", client.base_url());
    Ok(())
}

async fn fetch(client: &FileClient, path: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(dest) => {
            let written = client.download_to(path, &dest).await.map_err(friendly)?;
            eprintln!("Saved {} to {}", format_size(written), dest.display());
        }
        None => {
            let result = client.fetch(path).await.map_err(friendly)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&result.data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn list(client: &FileClient, path: &str, json: bool) -> Result<()> {
    let listing = client.list(path).await.map_err(friendly)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for entry in &listing.files {
        let name = if entry.is_dir() {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        let size = entry.size.map(format_size).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<width$}  {:>10}  {}",
            truncate_string(&name, NAME_COLUMN_WIDTH),
            size,
            format_timestamp(&entry.modified),
            width = NAME_COLUMN_WIDTH
        );
    }
    eprintln!(
        "{} directories, {} files, {}",
        listing.directories().count(),
        listing.regular_files().count(),
        format_size(listing.total_size())
    );
    Ok(())
}

async fn info_cmd(client: &FileClient, path: &str, json: bool) -> Result<()> {
    let info = client.file_info(path).await.map_err(friendly)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Name:     {}", info.name);
    println!("Path:     {}", info.path);
    println!("Type:     {}", if info.is_dir() { "directory" } else { "file" });
    println!("Size:     {}", format_size(info.size));
    println!("Modified: {}", format_timestamp(&info.modified));
    if let Some(ref created) = info.created {
        println!("Created:  {}", format_timestamp(created));
    }
    Ok(())
}
