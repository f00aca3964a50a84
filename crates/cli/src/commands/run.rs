//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{GatewayBlueprint, TransportConfig};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_transport_override(&mut blueprint, args)?;

    info!(
        endpoint = %blueprint.transport.endpoint(),
        sinks = blueprint.sinks.len(),
        estimate_interval_secs = blueprint.protocol.estimate_interval_secs,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_rx: (args.max_rx > 0).then_some(args.max_rx),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting gateway...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Gateway execution failed")?;

    stats.print_summary();
    info!("AoII gateway finished");
    Ok(())
}

/// `--serial` / `--tcp` replace the configured transport
fn apply_transport_override(blueprint: &mut GatewayBlueprint, args: &RunArgs) -> Result<()> {
    let transport = match (&args.serial, &args.tcp) {
        (Some(path), None) => TransportConfig::Serial {
            path: path.clone(),
            baud_rate: args.baud_rate,
        },
        (None, Some(addr)) => TransportConfig::Tcp { addr: addr.clone() },
        (None, None) => return Ok(()),
        (Some(_), Some(_)) => {
            return Err(CliError::transport_override("--serial and --tcp are exclusive").into())
        }
    };

    info!(endpoint = %transport.endpoint(), "Overriding transport from CLI");
    blueprint.transport = transport;
    config_loader::validate(blueprint)
        .map_err(|e| CliError::transport_override(e.to_string()))?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &GatewayBlueprint) {
    let protocol = &blueprint.protocol;
    println!("\n=== Configuration Summary ===\n");
    println!("Transport: {}", blueprint.transport.endpoint());
    println!(
        "Protocol: marker={:?} lr={} poll={}ms est_every={}s utc_offset={}min",
        protocol.marker,
        protocol.learning_rate,
        protocol.poll_timeout_ms,
        protocol.estimate_interval_secs,
        protocol.utc_offset_minutes
    );
    println!(
        "Model: {}",
        match (&blueprint.model, &blueprint.model_path) {
            (_, Some(path)) => format!("file {}", path.display()),
            (Some(_), None) => "inline".to_string(),
            (None, None) => "built-in reference".to_string(),
        }
    );

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
