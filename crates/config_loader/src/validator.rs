//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the blueprint types (`validator` derive)
//! - transport endpoint present and well formed
//! - policy thresholds finite
//! - inline model dimensionally consistent
//! - sink names unique, type-specific params present

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, GatewayBlueprint, SinkType, TransportConfig};
use predictor::ModelParameters;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a blueprint, returning the first problem found.
pub fn validate(blueprint: &GatewayBlueprint) -> Result<(), ContractError> {
    validate_rules(blueprint)?;
    validate_transport(&blueprint.transport)?;
    validate_policy(blueprint)?;
    validate_model(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Non-fatal findings worth reporting
pub fn warnings(blueprint: &GatewayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let protocol = &blueprint.protocol;

    if blueprint.sinks.is_empty() {
        warnings.push("no sinks configured, event records will only be counted".to_string());
    }
    if blueprint.model.is_none() && blueprint.model_path.is_none() {
        warnings.push("no model configured, using built-in reference weights".to_string());
    }
    if protocol.poll_timeout() >= protocol.estimate_interval() {
        warnings.push(format!(
            "poll_timeout_ms ({}) is not shorter than estimate_interval_secs ({}s)",
            protocol.poll_timeout_ms, protocol.estimate_interval_secs
        ));
    }
    if !protocol.reconnect {
        warnings.push("reconnect disabled, the run ends on the first transport failure".into());
    }
    warnings
}

fn validate_rules(blueprint: &GatewayBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let mut found = Vec::new();
        flatten(&errors, "", &mut found);
        found.sort();
        match found.into_iter().next() {
            Some((field, message)) => ContractError::config_validation(field, message),
            None => ContractError::config_validation("<root>", errors.to_string()),
        }
    })
}

/// Collect `(path, message)` pairs from nested validator errors
fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .as_ref()
                        .map_or_else(|| format!("failed '{}' rule", err.code), |m| m.to_string());
                    out.push((path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten(inner, &format!("{path}[{idx}]"), out);
                }
            }
        }
    }
}

fn validate_transport(transport: &TransportConfig) -> Result<(), ContractError> {
    match transport {
        TransportConfig::Serial { path, baud_rate } => {
            if path.trim().is_empty() {
                return Err(ContractError::config_validation(
                    "transport.path",
                    "serial path cannot be empty",
                ));
            }
            if *baud_rate == 0 {
                return Err(ContractError::config_validation(
                    "transport.baud_rate",
                    "baud_rate must be > 0",
                ));
            }
        }
        TransportConfig::Tcp { addr } => {
            let port = addr.rsplit_once(':').map(|(host, port)| (host, port.parse::<u16>()));
            match port {
                Some((host, Ok(_))) if !host.is_empty() => {}
                _ => {
                    return Err(ContractError::config_validation(
                        "transport.addr",
                        format!("expected host:port, got '{addr}'"),
                    ))
                }
            }
        }
    }
    Ok(())
}

fn validate_policy(blueprint: &GatewayBlueprint) -> Result<(), ContractError> {
    let policy = &blueprint.policy;
    for (field, value) in [
        ("policy.beta_temp", policy.beta_temp),
        ("policy.beta_hum", policy.beta_hum),
    ] {
        if !value.is_finite() {
            return Err(ContractError::config_validation(
                field,
                format!("threshold must be finite, got {value}"),
            ));
        }
    }
    Ok(())
}

fn validate_model(blueprint: &GatewayBlueprint) -> Result<(), ContractError> {
    match &blueprint.model {
        Some(spec) => ModelParameters::from_spec(spec).map(|_| ()),
        None => Ok(()),
    }
}

fn validate_sinks(blueprint: &GatewayBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }

        match sink.sink_type {
            SinkType::Log => {}
            SinkType::File => {
                if sink.params.get("path").is_none_or(|p| p.trim().is_empty()) {
                    return Err(ContractError::config_validation(
                        format!("sinks[{}].params.path", sink.name),
                        "file sink requires a path",
                    ));
                }
            }
            SinkType::Network => {
                let addr = sink.params.get("addr").ok_or_else(|| {
                    ContractError::config_validation(
                        format!("sinks[{}].params.addr", sink.name),
                        "network sink requires an addr",
                    )
                })?;
                if addr.parse::<SocketAddr>().is_err() {
                    return Err(ContractError::config_validation(
                        format!("sinks[{}].params.addr", sink.name),
                        format!("invalid socket address '{addr}'"),
                    ));
                }
                if let Some(format) = sink.params.get("format") {
                    if format != "json" && format != "bincode" {
                        return Err(ContractError::config_validation(
                            format!("sinks[{}].params.format", sink.name),
                            format!("unknown format '{format}', expected json or bincode"),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkConfig;
    use predictor::reference_model_spec;
    use std::collections::HashMap;

    fn minimal_blueprint() -> GatewayBlueprint {
        let mut bp = GatewayBlueprint::with_transport(TransportConfig::Serial {
            path: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
        });
        bp.sinks.push(SinkConfig {
            name: "log".into(),
            sink_type: SinkType::Log,
            queue_capacity: 100,
            params: HashMap::new(),
        });
        bp
    }

    fn err_of(bp: &GatewayBlueprint) -> String {
        validate(bp).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_config() {
        let mut bp = minimal_blueprint();
        bp.model = Some(reference_model_spec());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_derive_rules_report_nested_path() {
        let mut bp = minimal_blueprint();
        bp.protocol.learning_rate = 1.5;
        let err = err_of(&bp);
        assert!(err.contains("protocol.learning_rate"), "got: {err}");
    }

    #[test]
    fn test_zero_queue_capacity() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].queue_capacity = 0;
        let err = err_of(&bp);
        assert!(err.contains("sinks[0].queue_capacity"), "got: {err}");
    }

    #[test]
    fn test_empty_serial_path() {
        let mut bp = minimal_blueprint();
        bp.transport = TransportConfig::Serial {
            path: " ".into(),
            baud_rate: 9600,
        };
        assert!(err_of(&bp).contains("serial path cannot be empty"));
    }

    #[test]
    fn test_tcp_addr_needs_port() {
        let mut bp = minimal_blueprint();
        bp.transport = TransportConfig::Tcp {
            addr: "localhost".into(),
        };
        assert!(err_of(&bp).contains("host:port"));

        bp.transport = TransportConfig::Tcp {
            addr: "bridge.local:4001".into(),
        };
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_non_finite_threshold() {
        let mut bp = minimal_blueprint();
        bp.policy.beta_hum = f64::INFINITY;
        assert!(err_of(&bp).contains("policy.beta_hum"));
    }

    #[test]
    fn test_inconsistent_model_rejected() {
        let mut bp = minimal_blueprint();
        let mut spec = reference_model_spec();
        spec.b1.pop();
        bp.model = Some(spec);
        let err = validate(&bp).unwrap_err();
        assert!(matches!(err, ContractError::ModelShape { .. }));
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(bp.sinks[0].clone());
        assert!(err_of(&bp).contains("duplicate sink name"));
    }

    #[test]
    fn test_file_sink_requires_path() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].sink_type = SinkType::File;
        assert!(err_of(&bp).contains("requires a path"));

        bp.sinks[0]
            .params
            .insert("path".into(), "gateway.csv".into());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_network_sink_params() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].sink_type = SinkType::Network;
        assert!(err_of(&bp).contains("requires an addr"));

        bp.sinks[0].params.insert("addr".into(), "nowhere".into());
        assert!(err_of(&bp).contains("invalid socket address"));

        bp.sinks[0]
            .params
            .insert("addr".into(), "127.0.0.1:9000".into());
        bp.sinks[0].params.insert("format".into(), "xml".into());
        assert!(err_of(&bp).contains("unknown format"));
    }

    #[test]
    fn test_warnings() {
        let mut bp = minimal_blueprint();
        bp.sinks.clear();
        bp.protocol.reconnect = false;
        let warnings = warnings(&bp);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("no sinks"));
    }
}
