//! Policy inspection commands.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use vault_core::gateway::AccessGateway;
use vault_core::store::BlobBackend;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// User to check
    #[arg(short, long)]
    user: String,

    /// Action to check (e.g. read, write)
    #[arg(short, long)]
    action: String,

    /// Resource name
    resource: String,
}

#[derive(Args)]
pub struct GrantsArgs {
    /// User whose grants to list
    #[arg(short, long)]
    user: String,
}

#[derive(Serialize)]
struct CheckResult<'a> {
    user: &'a str,
    action: &'a str,
    resource: &'a str,
    allowed: bool,
}

#[derive(Tabled, Serialize)]
struct GrantRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
}

pub fn check<B: BlobBackend>(
    args: CheckArgs,
    gateway: &AccessGateway<B>,
    format: OutputFormat,
) -> Result<()> {
    let allowed = gateway.can_perform(&args.user, &args.resource, &args.action);

    match format {
        OutputFormat::Table => {
            let line = format!("{} {} {}", args.user, args.action, args.resource);
            if allowed {
                output::print_success(&format!("allowed: {}", line));
            } else {
                output::print_denied(&format!("denied: {}", line));
            }
        }
        _ => output::print_item(
            &CheckResult {
                user: &args.user,
                action: &args.action,
                resource: &args.resource,
                allowed,
            },
            format,
        )?,
    }
    Ok(())
}

pub fn grants<B: BlobBackend>(
    args: GrantsArgs,
    gateway: &AccessGateway<B>,
    format: OutputFormat,
) -> Result<()> {
    if !gateway.is_valid_user(&args.user) {
        tracing::warn!(user = %args.user, "Grants requested for unknown user");
    }

    let rows: Vec<GrantRow> = gateway
        .grants(&args.user)
        .into_iter()
        .map(|grant| GrantRow {
            action: grant.action.to_string(),
            resource: grant.resource.to_string(),
        })
        .collect();

    output::print_list(&rows, format)
}
