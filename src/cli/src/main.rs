//! Vault CLI - role-gated access to encrypted resources.
//!
//! Runs an interactive session by default; one-shot commands cover reading,
//! writing, and inspecting the policy.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;

use commands::{policy, resource, session};
use output::OutputFormat;
use vault_core::bootstrap::open_vault;
use vault_core::config::{KeySourceKind, VaultConfig};
use vault_core::error::VaultError;
use vault_core::gateway::AccessGateway;
use vault_core::store::FileBackend;
use vault_core::telemetry;

/// Vault - role-gated encrypted resource store
#[derive(Parser)]
#[command(
    name = "vault",
    author = "Aezi <aezi.zhu@icloud.com>",
    version = "0.1.0",
    about = "Vault - role-gated encrypted resource store",
    long_about = "Read and edit resources whose content is stored encrypted, as permitted by a role-based policy.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Configuration file (defaults to ~/.vault/config.toml when present)
    #[arg(short, long, global = true, env = "VAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Policy document, overriding the configured path
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Directory holding encrypted resources, overriding the configured root
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Derive the key from this passphrase so content survives restarts
    #[arg(long, global = true, env = "VAULT_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print collected metrics (Prometheus text format) to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Session,

    /// Print a resource's content
    Read(resource::ReadArgs),

    /// Replace a resource's content
    Write(resource::WriteArgs),

    /// Check whether a user may perform an action on a resource
    Check(policy::CheckArgs),

    /// List a user's effective grants
    Grants(policy::GrantsArgs),
}

/// Config file used when `--config` is not given.
fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".vault").join("config.toml"))
        .filter(|path| path.exists())
}

fn resolve_config(cli: &Cli) -> Result<VaultConfig> {
    let mut config = match cli.config.clone().or_else(default_config_path) {
        Some(path) => VaultConfig::from_file(&path)?,
        None => VaultConfig::load()?,
    };

    if let Some(policy) = &cli.policy {
        config.policy_path = policy.clone();
    }
    if let Some(root) = &cli.storage_dir {
        config.storage.root = root.clone();
    }
    if let Some(passphrase) = &cli.passphrase {
        config.key.source = KeySourceKind::Passphrase;
        config.key.passphrase = Some(passphrase.clone());
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    telemetry::init_logging(&config.logging)?;
    let metrics = telemetry::init_metrics(&config.metrics)?;
    let show_metrics = cli.metrics;

    let result = open_vault(&config)
        .map_err(anyhow::Error::from)
        .and_then(|gateway| dispatch(cli, &gateway));

    if show_metrics {
        if metrics.is_enabled() {
            eprint!("{}", metrics.render());
        } else {
            tracing::warn!("--metrics given but metrics are disabled in the configuration");
        }
    }
    result
}

fn dispatch(cli: Cli, gateway: &AccessGateway<FileBackend>) -> Result<()> {
    let format = cli.output;

    match cli.command.unwrap_or(Commands::Session) {
        Commands::Session => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            session::run(gateway, &mut stdin.lock(), &mut stdout.lock())
        }
        Commands::Read(args) => resource::read(args, gateway, format),
        Commands::Write(args) => resource::write(args, gateway, format),
        Commands::Check(args) => policy::check(args, gateway, format),
        Commands::Grants(args) => policy::grants(args, gateway, format),
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        match e.downcast_ref::<VaultError>() {
            Some(error) => {
                error.log();
                output::print_error(error.user_message());
            }
            None => output::print_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}
