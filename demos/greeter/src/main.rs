//! Greeter Example
//!
//! A host with three services and two plugin categories, showing the order in
//! which Hearth builds, loads and tears things down.
//!
//! ```text
//! guests ──┐
//!          ├──▶ greetings ──▶ plugins/greeters/*.toml  (greeter × 2, one disabled)
//! clock  ──┘              └─▶ plugins/audit/*.toml     (audit)
//! ```
//!
//! On shutdown the plugins go first (audit, then the greeters in reverse),
//! followed by the `greetings` service, which reports how many greetings it
//! sent.
//!
//! # Usage
//!
//! ```bash
//! cd demos/greeter
//! cargo run -- --guest Ada --guest Grace --once
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use hearth::prelude::*;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(about = "Greets guests through plugins")]
struct Args {
    /// Configuration file (defaults to searching for hearth.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "production".
    #[arg(short, long)]
    profile: Option<String>,

    /// Someone to greet; may be repeated.
    #[arg(short, long = "guest", default_value = "world")]
    guests: Vec<String>,

    /// Shut down right after startup instead of waiting for Ctrl+C.
    #[arg(long)]
    once: bool,
}

// ============================================================================
// Services
// ============================================================================

struct GuestList(Vec<String>);

struct Clock {
    started: Instant,
}

/// Sends greetings and keeps count.
struct GreetingBook {
    guests: Arc<GuestList>,
    clock: Arc<Clock>,
    sent: AtomicUsize,
}

impl GreetingBook {
    fn greet_all(&self, salutation: &str, excited: bool) {
        let mark = if excited { "!" } else { "." };
        for guest in &self.guests.0 {
            println!("{salutation}, {guest}{mark}");
            self.sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AsyncDispose for GreetingBook {
    async fn dispose_async(&self) -> Result<(), BoxError> {
        info!(
            sent = self.sent(),
            uptime_ms = self.clock.started.elapsed().as_millis() as u64,
            "Closing greeting book"
        );
        Ok(())
    }
}

fn register_services(registry: &ServiceRegistry, guests: Vec<String>) -> Result<()> {
    registry.register_instance("guests", GuestList(guests))?;

    registry.register_factory("clock", &[], |_| async {
        Ok::<_, BoxError>(Service::new(Clock {
            started: Instant::now(),
        }))
    })?;

    registry.register_factory("greetings", &["guests", "clock"], |deps| async move {
        Ok::<_, BoxError>(Service::async_disposable(GreetingBook {
            guests: deps.get("guests")?,
            clock: deps.get("clock")?,
            sent: AtomicUsize::new(0),
        }))
    })?;

    Ok(())
}

// ============================================================================
// Plugins
// ============================================================================

#[derive(Debug, Deserialize)]
struct GreeterConfig {
    salutation: String,
    #[serde(default)]
    excited: bool,
}

#[plugin_initializer(name = "greeter", crate = hearth::plugin)]
async fn greeter(ctx: PluginContext) -> InitResult {
    let config: GreeterConfig = ctx.get_config()?;
    let book = ctx.resolve::<GreetingBook>("greetings")?;

    book.greet_all(&config.salutation, config.excited);

    let name = ctx.name().to_string();
    Ok(LoadedPlugin::new(ctx.name()).on_dispose(move || {
        let name = name.clone();
        async move {
            info!(plugin = %name, "Greeter says goodbye");
            Ok(())
        }
    }))
}

/// Reports the greeting count when the plugin is disposed.
struct AuditTrail {
    book: Arc<GreetingBook>,
}

impl Dispose for AuditTrail {
    fn dispose(&self) -> Result<(), BoxError> {
        info!(sent = self.book.sent(), "Audit complete");
        Ok(())
    }
}

#[plugin_initializer(name = "audit", crate = hearth::plugin)]
async fn audit(ctx: PluginContext) -> InitResult {
    let book = ctx.resolve::<GreetingBook>("greetings")?;
    Ok(LoadedPlugin::new(ctx.name()).with_dispose(Arc::new(AuditTrail { book })))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = Host::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let mut host = builder.build()?;

    register_services(host.registry(), args.guests)?;

    if args.once {
        host.run_until(async {}).await?;
    } else {
        host.run().await?;
    }

    Ok(())
}
