//! instance-ddns binary entry point.
//!
//! Replays newline-delimited lifecycle events against an in-process cloud
//! seeded from a JSON fixture, then prints the resulting zones and tags.

use clap::Parser;
use instance_ddns::{
    shared_router, telemetry, Config, EventRouter, LifecycleCorrelator, MemoryCloud,
    RouteOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info, warn};

/// Forward and reverse DNS lifecycle for autoscaled instances.
#[derive(Parser, Debug)]
#[command(name = "instance-ddns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "instance-ddns.toml")]
    config: PathBuf,

    /// Cloud fixture (JSON) with instances, VPCs, subnets, and zones.
    #[arg(short, long)]
    fixture: PathBuf,

    /// Newline-delimited JSON events. Reads stdin when omitted.
    events: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        fixture = %args.fixture.display(),
        ttl = config.ddns.ttl,
        domain_tag = %config.ddns.domain_tag,
        "Starting instance-ddns"
    );

    let cloud = MemoryCloud::load_fixture(&args.fixture).await?;

    let router = shared_router(|| {
        EventRouter::new(LifecycleCorrelator::new(
            Arc::new(cloud.clone()),
            Arc::new(cloud.clone()),
            config.ddns.clone(),
        ))
    });

    let input: Box<dyn AsyncRead + Unpin + Send> = match &args.events {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(input).lines();

    // Setup graceful shutdown
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut handled = 0usize;
    let mut failed = 0usize;
    loop {
        let line = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        handled += 1;
        if !handle_line(router, &line).await {
            failed += 1;
        }
    }

    println!("{}", serde_json::to_string_pretty(&cloud.snapshot())?);

    info!(handled, failed, "instance-ddns shutdown complete");
    if failed > 0 {
        return Err(format!("{failed} of {handled} events failed").into());
    }
    Ok(())
}

/// Route one event line. Returns false if the event failed.
async fn handle_line(router: &EventRouter, line: &str) -> bool {
    let raw: serde_json::Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => {
            error!(error = %e, "Event is not valid JSON");
            return false;
        }
    };

    match router.route(&raw).await {
        Ok(RouteOutcome::Provisioned(records)) => {
            info!(hostname = %records.hostname, "Launch handled");
            true
        }
        Ok(RouteOutcome::Removed(removed)) => {
            info!(
                deleted = removed.deleted.len(),
                skipped = removed.skipped.len(),
                "Termination handled"
            );
            true
        }
        Ok(RouteOutcome::Ignored { detail_type }) => {
            warn!(detail_type = %detail_type, "Event ignored");
            true
        }
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Event failed");
            false
        }
    }
}
