//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::GatewayBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    transport: String,
    protocol: contracts::ProtocolConfig,
    policy: contracts::PolicyConfig,
    model: ModelInfo,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct ModelInfo {
    source: String,
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&blueprint, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &GatewayBlueprint, args: &InfoArgs) -> ConfigInfo {
    let source = match (&blueprint.model, &blueprint.model_path) {
        (_, Some(path)) => path.display().to_string(),
        (Some(_), None) => "inline".to_string(),
        (None, None) => "built-in reference".to_string(),
    };
    let model = config_loader::ConfigLoader::effective_model(blueprint);

    let sinks = blueprint
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            queue_capacity: s.queue_capacity,
            params: if args.sinks {
                s.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        transport: blueprint.transport.endpoint(),
        protocol: blueprint.protocol.clone(),
        policy: blueprint.policy,
        model: ModelInfo {
            source,
            input_dim: contracts::INPUT_DIM,
            hidden_dim: model.hidden_dim(),
            output_dim: contracts::OUTPUT_DIM,
        },
        sinks,
    }
}

fn print_config_info(info: &ConfigInfo) {
    let protocol = &info.protocol;
    let policy = &info.policy;

    println!("=== AoII Gateway Configuration ===\n");

    println!("Transport");
    println!("   ├─ Version: {}", info.version);
    println!("   └─ Endpoint: {}", info.transport);

    println!("\nProtocol");
    println!("   ├─ Line marker: {}", protocol.marker.as_deref().unwrap_or("(any prefix)"));
    println!("   ├─ Learning rate: {}", protocol.learning_rate);
    println!("   ├─ Poll timeout: {} ms", protocol.poll_timeout_ms);
    println!("   ├─ Loop sleep: {} ms", protocol.loop_sleep_ms);
    println!("   ├─ Estimate interval: {} s", protocol.estimate_interval_secs);
    println!("   ├─ UTC offset: {} min", protocol.utc_offset_minutes);
    println!(
        "   └─ Reconnect: {} (delay {} ms)",
        protocol.reconnect, protocol.reconnect_delay_ms
    );

    println!("\nPolicy");
    println!("   ├─ Temperature threshold: {} °C", policy.beta_temp);
    println!("   ├─ Humidity threshold: {} %RH", policy.beta_hum);
    println!("   └─ Heartbeat: every {} ticks", policy.heartbeat_ticks);

    println!("\nModel");
    println!("   ├─ Source: {}", info.model.source);
    println!(
        "   └─ Shape: {}→{}→{}",
        info.model.input_dim, info.model.hidden_dim, info.model.output_dim
    );

    if !info.sinks.is_empty() {
        println!("\nSinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i == info.sinks.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} ({}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
            let mut params: Vec<_> = sink.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("   │     {} = {}", key, value);
            }
        }
    }

    println!();
}
