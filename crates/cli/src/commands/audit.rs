//! `audit` command implementation.
//!
//! Replays a dataset recorded by the sensor-side logger through the
//! transmission policy and writes one audit row per dataset row.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use contracts::{PolicyConfig, TriggerReason};
use predictor::Predictor;
use serde::Deserialize;
use sync_engine::EdgeMirror;
use tracing::{debug, info};

use crate::cli::{AuditArgs, AuditMode};
use crate::error::CliError;

/// One row of the raw dataset
#[derive(Debug, Deserialize)]
struct DatasetRow {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Time_n")]
    time_n: f64,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Humidity")]
    humidity: f64,
}

/// Outcome of a replay
#[derive(Debug, Default, PartialEq)]
struct AuditSummary {
    rows: u64,
    transmissions: u64,
    first: u64,
    threshold: u64,
    heartbeat: u64,
    savings_ratio: f64,
}

/// Execute the `audit` command
pub fn run_audit(args: &AuditArgs) -> Result<()> {
    info!(
        dataset = %args.dataset.display(),
        mode = ?args.mode,
        "Starting edge audit"
    );

    let blueprint = match &args.config {
        Some(path) => Some(
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
        ),
        None => None,
    };

    let mut policy = blueprint.as_ref().map(|b| b.policy).unwrap_or_default();
    apply_policy_overrides(&mut policy, args)?;

    let mut edge = match args.mode {
        AuditMode::LastSent => EdgeMirror::last_sent(policy),
        AuditMode::Model => {
            let (model, learning_rate) = match &blueprint {
                Some(b) => (
                    config_loader::ConfigLoader::effective_model(b),
                    b.protocol.learning_rate,
                ),
                None => (
                    predictor::reference_model_spec(),
                    contracts::ProtocolConfig::default().learning_rate,
                ),
            };
            let predictor = Predictor::from_spec(&model).context("Invalid model parameters")?;
            EdgeMirror::model(policy, predictor, learning_rate)
        }
    };

    let input = File::open(&args.dataset)
        .with_context(|| format!("Failed to open dataset {}", args.dataset.display()))?;
    let output = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let summary = replay(input, output, &mut edge, &args.dataset)?;

    info!(
        rows = summary.rows,
        transmissions = summary.transmissions,
        output = %args.output.display(),
        "Edge audit complete"
    );

    println!("\n=== Edge Audit ===\n");
    println!("Mode: {:?}", args.mode);
    println!(
        "Policy: beta_temp={} beta_hum={} heartbeat_ticks={}",
        policy.beta_temp, policy.beta_hum, policy.heartbeat_ticks
    );
    println!("Rows: {}", summary.rows);
    println!(
        "Transmissions: {} (first={}, threshold={}, heartbeat={})",
        summary.transmissions, summary.first, summary.threshold, summary.heartbeat
    );
    println!("Savings ratio: {:.2}%", summary.savings_ratio * 100.0);
    println!("Audit log: {}\n", args.output.display());

    Ok(())
}

fn apply_policy_overrides(policy: &mut PolicyConfig, args: &AuditArgs) -> Result<()> {
    if let Some(beta_temp) = args.beta_temp {
        policy.beta_temp = beta_temp;
    }
    if let Some(beta_hum) = args.beta_hum {
        policy.beta_hum = beta_hum;
    }
    if let Some(heartbeat_ticks) = args.heartbeat_ticks {
        policy.heartbeat_ticks = heartbeat_ticks;
    }

    for (name, value) in [("beta_temp", policy.beta_temp), ("beta_hum", policy.beta_hum)] {
        if !value.is_finite() || value < 0.0 {
            anyhow::bail!("{name} must be a finite, non-negative number, got {value}");
        }
    }
    if policy.heartbeat_ticks == 0 {
        anyhow::bail!("heartbeat_ticks must be >= 1");
    }
    Ok(())
}

/// Feed every dataset row through `edge`, writing audit rows to `output`
fn replay<R: Read, W: Write>(
    input: R,
    output: W,
    edge: &mut EdgeMirror,
    source: &Path,
) -> Result<AuditSummary> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut writer = csv::Writer::from_writer(output);
    let mut summary = AuditSummary::default();

    for (idx, row) in reader.deserialize::<DatasetRow>().enumerate() {
        // Row 1 is the header
        let row_no = idx as u64 + 2;
        let row = row.map_err(|e| CliError::dataset_row(source, row_no, e.to_string()))?;
        if !(row.temperature.is_finite() && row.humidity.is_finite()) {
            return Err(CliError::dataset_row(source, row_no, "reading is not finite").into());
        }
        if !(0.0..1.0).contains(&row.time_n) {
            return Err(
                CliError::dataset_row(source, row_no, "Time_n must be in [0, 1)").into(),
            );
        }

        let audit = edge.step((row.temperature, row.humidity), row.time_n, &row.timestamp);
        match audit.reason {
            Some(TriggerReason::First) => summary.first += 1,
            Some(TriggerReason::Threshold) => summary.threshold += 1,
            Some(TriggerReason::Heartbeat) => summary.heartbeat += 1,
            None => {}
        }
        debug!(
            tick = audit.tick,
            triggered = audit.triggered,
            reason = ?audit.reason,
            "audit row"
        );
        writer.serialize(&audit).context("Failed to write audit row")?;
    }
    writer.flush().context("Failed to flush audit log")?;

    summary.rows = edge.ticks();
    summary.transmissions = edge.total_tx();
    summary.savings_ratio = edge.savings_ratio();
    Ok(summary)
}
