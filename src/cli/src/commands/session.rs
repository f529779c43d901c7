//! Interactive session: log in by username, then read or edit resources
//! from a numbered menu until the user exits.

use anyhow::Result;
use std::io::{BufRead, Write};

use vault_core::error::VaultError;
use vault_core::gateway::{AccessGateway, GatewayError};
use vault_core::rbac::Action;
use vault_core::store::BlobBackend;

use crate::output;

/// Drive one session over `input`/`out` until exit or end of input.
pub fn run<B, R, W>(gateway: &AccessGateway<B>, input: &mut R, out: &mut W) -> Result<()>
where
    B: BlobBackend,
    R: BufRead,
    W: Write,
{
    output::write_header(out, "=== Vault ===")?;

    let Some(username) = prompt(input, out, "Username: ")? else {
        return Ok(());
    };
    let Some(role) = gateway.role_of(&username) else {
        output::write_error(out, "User not found. Exiting.")?;
        return Ok(());
    };
    writeln!(out, "Hello, {}. Your role is: {}", username, role)?;
    tracing::info!(user = %username, role = %role, "Session started");

    loop {
        writeln!(out)?;
        writeln!(out, "Select an option:")?;
        writeln!(out, "  1. Read a resource")?;
        writeln!(out, "  2. Edit a resource")?;
        writeln!(out, "  3. Exit")?;

        let Some(choice) = prompt(input, out, "Option: ")? else {
            break;
        };

        match choice.trim() {
            "1" => {
                let Some(resource) = prompt(input, out, "Resource to read: ")? else {
                    break;
                };
                match gateway.read_resource(&username, &resource) {
                    Ok(content) => {
                        writeln!(out, "Contents of {}:", resource)?;
                        writeln!(out, "{}", content)?;
                    }
                    Err(e) => report(out, e)?,
                }
            }
            "2" => {
                let Some(resource) = prompt(input, out, "Resource to edit: ")? else {
                    break;
                };
                // Refuse before asking for content the user could never save.
                if !gateway.can_perform(&username, &resource, Action::WRITE) {
                    output::write_denied(
                        out,
                        &format!("User '{}' may not edit '{}'", username, resource),
                    )?;
                    continue;
                }
                let Some(content) =
                    prompt(input, out, &format!("New content for {}: ", resource))?
                else {
                    break;
                };
                match gateway.write_resource(&username, &resource, &content) {
                    Ok(()) => output::write_success(out, &format!("Saved {}", resource))?,
                    Err(e) => report(out, e)?,
                }
            }
            "3" => {
                writeln!(out, "Goodbye.")?;
                break;
            }
            _ => writeln!(out, "Invalid option. Try again.")?,
        }
    }

    tracing::info!(user = %username, "Session ended");
    Ok(())
}

/// Write `label`, then read one line. `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>> {
    write!(out, "{}", label)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Denials and storage failures end the action, not the session.
fn report<W: Write>(out: &mut W, error: GatewayError) -> Result<()> {
    let denied = error.is_access_denied();
    let error = VaultError::from(error);
    error.log();
    if denied {
        output::write_denied(out, error.user_message())?;
    } else {
        output::write_error(out, error.user_message())?;
    }
    Ok(())
}
