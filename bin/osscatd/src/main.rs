//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "binary"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Binary entrypoint for the OSS catalog daemon."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use osscat_api::{spawn_api_server, ApiState};
use osscat_common::config::AppConfig;
use osscat_common::logging::init_tracing;
use osscat_core::Services;
use osscat_security::{CredentialHasher, RbacGate, SecurityMetrics, TokenService};
use osscat_store::Store;
use prometheus::Registry;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "OSS license-compliance catalog daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the API server")]
    Run,
    #[command(about = "Load and validate the configuration, then exit")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/osscat.toml"));
    candidates.push(PathBuf::from("configs/example.toml"));

    let load_started = Instant::now();
    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    init_tracing("osscatd", &config.logging)?;
    info!(
        source = %loaded.source.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".into()),
        elapsed_ms = load_started.elapsed().as_millis() as u64,
        "configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config).await?,
        Commands::CheckConfig => {
            println!("configuration ok");
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let registry = Arc::new(Registry::new());
    let metrics = SecurityMetrics::new(registry.clone())?;

    let store = Store::connect(&config.database)
        .await
        .with_context(|| format!("failed to open catalog store {}", config.database.url))?;
    let hasher = CredentialHasher::from_config(&config.password_hash)?;
    let tokens = TokenService::from_config(&config.auth);
    let services = Services::new(store.clone(), hasher, tokens, Some(metrics.clone()));

    let password_file = &config.bootstrap.password_file;
    let created = services
        .users
        .ensure_admin_with(&config.bootstrap.admin_username, |password| {
            write_initial_password(password_file, password)
        })
        .await
        .with_context(|| format!("failed to bootstrap admin via {}", password_file.display()))?;
    if created {
        warn!(
            username = %config.bootstrap.admin_username,
            password_file = %config.bootstrap.password_file.display(),
            "initial admin created; change its password after first login"
        );
    }

    let state = ApiState::new(services, RbacGate::new(Some(metrics)), Some(registry))
        .with_allowed_origins(config.server.allowed_origins.clone());
    let server = spawn_api_server(Arc::new(state), config.server.listen)?;
    info!(address = %server.addr(), "daemon running; waiting for termination signal");

    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    server.shutdown().await?;
    store.close().await;

    Ok(())
}

/// Write the generated admin password to a file readable only by the owner.
fn write_initial_password(path: &Path, password: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    writeln!(file, "{password}")?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_password_file_holds_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.initial.password");
        write_initial_password(&path, "s3cret").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "s3cret\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn unwritable_password_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("admin.initial.password");
        assert!(write_initial_password(&path, "s3cret").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn cli_defaults_to_run() {
        let cli = Cli::parse_from(["osscatd", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(cli.command.is_none());
    }
}
