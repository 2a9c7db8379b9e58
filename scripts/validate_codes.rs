//! Report stored codes whose status disagrees with their expiration date.
//!
//! Read-only: this prints what `shift-codes expire` would change.

use std::path::PathBuf;

use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

use shift_codes::config::Settings;
use shift_codes::store::Store;
use shift_codes::util;

fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("info"))
        .with(fmt_layer)
        .init();

    let mut config = Settings::new()?;
    if let Some(path) = std::env::args().nth(1) {
        config.store.path = PathBuf::from(path);
    }

    let store = Store::load(&config.store.path, &config.store.marker)?;
    let today = util::today();
    let stale = store.stale_entries(today);

    println!(
        "{}: {} known codes, {} stale",
        store.path().display(),
        store.known_codes().len(),
        stale.len()
    );

    for entry in &stale {
        println!("  {} is '{}' but expired on {}", entry.code, entry.status, entry.expires_at);
    }

    Ok(())
}
