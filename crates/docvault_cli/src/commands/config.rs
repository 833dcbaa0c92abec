//! Config command implementation.

use super::{CliResult, Context};
use docvault_core::CredentialSet;
use tracing::info;

/// Stores the given credential fields.
pub fn set(ctx: &Context, updates: &CredentialSet) -> CliResult<()> {
    if updates.is_empty() {
        return Err("nothing to set; pass --username, --password or --cluster".into());
    }
    info!("Updating config at {:?}", ctx.config().path());
    let stored = ctx.config().update(updates)?;

    println!("✓ Config updated");
    print_set(&stored);
    Ok(())
}

/// Prints the stored credentials with the password masked.
pub fn show(ctx: &Context) -> CliResult<()> {
    let stored = ctx.config().load()?;
    println!("Config file: {:?}", ctx.config().path());
    if !ctx.config().exists() {
        println!("  (file does not exist)");
    }
    print_set(&stored);
    Ok(())
}

fn print_set(set: &CredentialSet) {
    println!("  Username: {}", set.username.as_deref().unwrap_or("(unset)"));
    println!("  Password: {}", mask(set.password.as_deref()));
    println!("  Cluster:  {}", set.cluster.as_deref().unwrap_or("(unset)"));
}

fn mask(password: Option<&str>) -> &'static str {
    match password {
        Some(_) => "********",
        None => "(unset)",
    }
}
