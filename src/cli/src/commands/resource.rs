//! One-shot resource commands.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::io::Read;

use vault_core::error::VaultError;
use vault_core::gateway::AccessGateway;
use vault_core::store::BlobBackend;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ReadArgs {
    /// Acting user
    #[arg(short, long)]
    user: String,

    /// Resource name
    resource: String,
}

#[derive(Args)]
pub struct WriteArgs {
    /// Acting user
    #[arg(short, long)]
    user: String,

    /// Resource name
    resource: String,

    /// New content; read from stdin when omitted
    content: Option<String>,
}

#[derive(Serialize)]
struct ResourceContent<'a> {
    resource: &'a str,
    content: &'a str,
}

pub fn read<B: BlobBackend>(
    args: ReadArgs,
    gateway: &AccessGateway<B>,
    format: OutputFormat,
) -> Result<()> {
    let content = gateway
        .read_resource(&args.user, &args.resource)
        .map_err(VaultError::from)?;

    match format {
        OutputFormat::Table => println!("{}", content),
        _ => output::print_item(
            &ResourceContent {
                resource: &args.resource,
                content: &content,
            },
            format,
        )?,
    }
    Ok(())
}

pub fn write<B: BlobBackend>(
    args: WriteArgs,
    gateway: &AccessGateway<B>,
    format: OutputFormat,
) -> Result<()> {
    let content = match args.content {
        Some(content) => content,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read content from stdin")?;
            buffer.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    gateway
        .write_resource(&args.user, &args.resource, &content)
        .map_err(VaultError::from)?;

    match format {
        OutputFormat::Table => output::print_success(&format!("Saved {}", args.resource)),
        _ => output::print_item(
            &serde_json::json!({ "resource": args.resource, "bytes": content.len() }),
            format,
        )?,
    }
    Ok(())
}
