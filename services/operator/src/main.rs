//! Flotilla Fleet Operator
//!
//! Reconciles declared storage-node and export-gateway fleets against the
//! orchestration substrate.
//!
//! ## Architecture
//!
//! - **Planner**: Resolves the storage backend from the media selection
//! - **Builders**: Derive per-instance resource sets, deterministically
//! - **Reconciler**: Walks ordinals and applies, scales down, or tears down
//! - **Grace client**: Keeps the shared recovery database membership in sync

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flotilla_operator::config::Config;
use flotilla_operator::fleet::{GatewayFleetSpec, StorageFleetSpec};
use flotilla_operator::grace::GraceToolClient;
use flotilla_operator::reconciler::{FleetReconciler, ReconcileReport};
use flotilla_substrate::HttpSubstrate;

#[derive(Parser)]
#[command(name = "operator", about = "Flotilla fleet operator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Converge every fleet in the file to its declared state.
    Reconcile {
        /// Path to the fleet declaration file (JSON).
        #[arg(long)]
        fleets: String,
    },
    /// Remove instances above the declared counts.
    ScaleDown {
        #[arg(long)]
        fleets: String,
        /// Instance count the fleets previously ran at.
        #[arg(long)]
        previous: u32,
    },
    /// Remove every instance and its config artifacts.
    Teardown {
        #[arg(long)]
        fleets: String,
        /// Instance count the fleets currently run at.
        #[arg(long)]
        current: u32,
    },
}

/// On-disk fleet declarations.
#[derive(Debug, Deserialize)]
struct FleetFile {
    #[serde(default)]
    storage: Vec<StorageFleetSpec>,
    #[serde(default)]
    gateways: Vec<GatewayFleetSpec>,
}

fn load_fleets(path: &str) -> Result<FleetFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fleet file {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse fleet file {path}"))
}

fn note_outcome(fleet: &str, report: &ReconcileReport, converged: &mut bool) {
    if report.is_converged() {
        info!(fleet, applied = report.instances_applied, removed = report.instances_removed, "Fleet converged");
    } else {
        for failure in &report.failures {
            error!(fleet, instance = %failure.identity, detail = %failure.detail, "Instance not converged");
        }
        *converged = false;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!(
        substrate_url = %config.substrate_url,
        grace_tool = %config.grace_tool,
        "Configuration loaded"
    );

    let substrate = Arc::new(HttpSubstrate::new(&config.substrate_url));
    let membership = Arc::new(GraceToolClient::new(config.grace_tool.clone()));
    let reconciler = FleetReconciler::new(substrate, membership, config);

    let mut converged = true;
    match cli.command {
        Command::Reconcile { fleets } => {
            let file = load_fleets(&fleets)?;
            for spec in &file.storage {
                let report = reconciler.reconcile_storage(spec).await?;
                note_outcome(&spec.name, &report, &mut converged);
            }
            for spec in &file.gateways {
                let report = reconciler.reconcile_gateway(spec).await?;
                note_outcome(&spec.name, &report, &mut converged);
            }
        }
        Command::ScaleDown { fleets, previous } => {
            let file = load_fleets(&fleets)?;
            for spec in &file.storage {
                let report = reconciler.scale_down_storage(spec, previous).await?;
                note_outcome(&spec.name, &report, &mut converged);
            }
            for spec in &file.gateways {
                let report = reconciler.scale_down_gateway(spec, previous).await?;
                note_outcome(&spec.name, &report, &mut converged);
            }
        }
        Command::Teardown { fleets, current } => {
            let file = load_fleets(&fleets)?;
            for spec in &file.storage {
                let report = reconciler.teardown_storage(spec, current).await?;
                note_outcome(&spec.name, &report, &mut converged);
            }
            for spec in &file.gateways {
                let report = reconciler.teardown_gateway(spec, current).await?;
                note_outcome(&spec.name, &report, &mut converged);
            }
        }
    }

    if !converged {
        anyhow::bail!("one or more fleets did not converge");
    }
    Ok(())
}
