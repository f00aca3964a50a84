//! # Config Loader
//!
//! Loads the gateway configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Resolve `model_path` (relative to the config file) into an inline model
//! - Validate configuration legality
//! - Generate `GatewayBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("gateway.toml")).unwrap();
//! println!("Transport: {}", blueprint.transport.endpoint());
//! ```

mod parser;
mod validator;

pub use contracts::GatewayBlueprint;
pub use parser::ConfigFormat;
pub use validator::{validate, warnings};

use contracts::{ContractError, ModelSpec};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file; the format follows the extension.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure (config or model file)
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<GatewayBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse_and_validate(&content, format, base_dir)
    }

    /// Load configuration from a string; `model_path` resolves against the
    /// working directory.
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<GatewayBlueprint, ContractError> {
        Self::parse_and_validate(content, format, Path::new("."))
    }

    /// Load a stand-alone model weights file
    pub fn load_model(path: &Path) -> Result<ModelSpec, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        parser::parse_model(&content, format)
    }

    /// Model the gateway runs with: the configured one or the built-in reference
    pub fn effective_model(blueprint: &GatewayBlueprint) -> ModelSpec {
        blueprint
            .model
            .clone()
            .unwrap_or_else(predictor::reference_model_spec)
    }

    pub fn to_toml(blueprint: &GatewayBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &GatewayBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read '{}': {e}", path.display()),
            source: Some(Box::new(e)),
        })
    }

    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
        base_dir: &Path,
    ) -> Result<GatewayBlueprint, ContractError> {
        let mut blueprint = parser::parse(content, format)?;
        Self::resolve_model(&mut blueprint, base_dir)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Inline the model file referenced by `model_path`
    fn resolve_model(
        blueprint: &mut GatewayBlueprint,
        base_dir: &Path,
    ) -> Result<(), ContractError> {
        let Some(model_path) = blueprint.model_path.as_ref() else {
            return Ok(());
        };
        if blueprint.model.is_some() {
            return Err(ContractError::config_validation(
                "model_path",
                "set either [model] or model_path, not both",
            ));
        }

        let resolved: PathBuf = if model_path.is_absolute() {
            model_path.clone()
        } else {
            base_dir.join(model_path)
        };
        debug!(path = %resolved.display(), "loading model file");

        blueprint.model = Some(Self::load_model(&resolved)?);
        blueprint.model_path = Some(resolved);
        Ok(())
    }
}
