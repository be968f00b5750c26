//! Walk a key tree - build a small tree, lock part of it, then enumerate.
//!
//! Runs against the in-memory registry. Pass `--verbose` to see the
//! backend's debug logging, including skipped subkeys.

use anyhow::Context;
use regkey::{AccessMask, MemoryRegistry, RegKey, RootKey, SECURITY_LOCK};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let verbose = std::env::args().any(|arg| arg == "--verbose");
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let backend = Arc::new(MemoryRegistry::new());

    let mut app = RegKey::new(backend.clone());
    app.create(RootKey::CurrentUser, "Software\\Demo", AccessMask::ALL_ACCESS)
        .context("creating Software\\Demo")?;
    app.write_sz("Name", "demo")?;
    app.write_dword("Version", 3)?;

    let mut settings = RegKey::new(backend.clone());
    settings.create(RootKey::CurrentUser, "Software\\Demo\\Settings", AccessMask::ALL_ACCESS)?;
    settings.write_multi_sz("Plugins", &["core", "extra"])?;
    settings.write_binary("Seed", "DEADBEEF")?;

    let mut secrets = RegKey::new(backend.clone());
    secrets.create(RootKey::CurrentUser, "Software\\Demo\\Secrets", AccessMask::ALL_ACCESS)?;
    secrets.write_sz("Token", "hidden")?;
    secrets.set_security(SECURITY_LOCK).context("locking Secrets")?;
    info!("Locked {}", secrets);

    println!("Keys under {}:", app);
    app.enum_all_key(|parent, name| println!("  - {}\\{}", parent, name))?;

    println!("Values under {}:", app);
    app.enum_all_value(|owner, name, value_type| {
        println!("  - {} : {} ({})", owner, name, value_type);
    })?;

    Ok(())
}
