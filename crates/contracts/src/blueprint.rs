//! GatewayBlueprint - Config Loader output
//!
//! Describes the complete gateway configuration: transport, protocol timing,
//! transmission policy, predictor model and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::ModelSpec;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete gateway configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Link to the sensor node
    pub transport: TransportConfig,

    /// Sync protocol timing
    #[serde(default)]
    #[validate(nested)]
    pub protocol: ProtocolConfig,

    /// Transmission policy constants (edge mirror / audit)
    #[serde(default)]
    #[validate(nested)]
    pub policy: PolicyConfig,

    /// Inline model weights
    #[serde(default)]
    pub model: Option<ModelSpec>,

    /// Model weights file, relative to the config file
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Output routing
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// Transport endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Serial device
    Serial {
        path: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// TCP serial bridge (e.g. ser2net)
    Tcp { addr: String },
}

fn default_baud_rate() -> u32 {
    115_200
}

impl TransportConfig {
    /// Endpoint string used in logs and errors
    pub fn endpoint(&self) -> String {
        match self {
            Self::Serial { path, baud_rate } => format!("serial://{path}@{baud_rate}"),
            Self::Tcp { addr } => format!("tcp://{addr}"),
        }
    }
}

/// Sync protocol timing and behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProtocolConfig {
    /// Literal tag before `": "` on reading lines, `None` strips any prefix
    #[serde(default = "default_marker")]
    pub marker: Option<String>,

    /// Online update step size
    #[serde(default = "default_learning_rate")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub learning_rate: f64,

    /// Maximum wait for one line per loop iteration
    #[serde(default = "default_poll_timeout_ms")]
    #[validate(range(min = 1))]
    pub poll_timeout_ms: u64,

    /// Pause between loop iterations
    #[serde(default = "default_loop_sleep_ms")]
    pub loop_sleep_ms: u64,

    /// Period of standalone EST events
    #[serde(default = "default_estimate_interval_secs")]
    #[validate(range(min = 1))]
    pub estimate_interval_secs: u64,

    /// Local time zone for timestamps and time-of-day
    #[serde(default = "default_utc_offset_minutes")]
    #[validate(range(min = -1439, max = 1439))]
    pub utc_offset_minutes: i32,

    /// Upper bound on handing an event to the dispatcher
    #[serde(default = "default_dispatch_timeout_ms")]
    #[validate(range(min = 1))]
    pub dispatch_timeout_ms: u64,

    /// Capacity of the protocol → dispatcher channel
    #[serde(default = "default_event_queue")]
    #[validate(range(min = 1))]
    pub event_queue: usize,

    /// Reconnect on mid-run transport failure
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_marker() -> Option<String> {
    Some("Received".to_string())
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

fn default_loop_sleep_ms() -> u64 {
    50
}

fn default_estimate_interval_secs() -> u64 {
    60
}

fn default_utc_offset_minutes() -> i32 {
    -480
}

fn default_dispatch_timeout_ms() -> u64 {
    200
}

fn default_event_queue() -> usize {
    256
}

fn default_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            learning_rate: default_learning_rate(),
            poll_timeout_ms: default_poll_timeout_ms(),
            loop_sleep_ms: default_loop_sleep_ms(),
            estimate_interval_secs: default_estimate_interval_secs(),
            utc_offset_minutes: default_utc_offset_minutes(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            event_queue: default_event_queue(),
            reconnect: default_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl ProtocolConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn loop_sleep(&self) -> Duration {
        Duration::from_millis(self.loop_sleep_ms)
    }

    pub fn estimate_interval(&self) -> Duration {
        Duration::from_secs(self.estimate_interval_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Threshold / heartbeat constants of the transmission policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct PolicyConfig {
    /// Temperature error threshold (°C)
    #[serde(default = "default_beta_temp")]
    #[validate(range(min = 0.0))]
    pub beta_temp: f64,

    /// Humidity error threshold (%RH)
    #[serde(default = "default_beta_hum")]
    #[validate(range(min = 0.0))]
    pub beta_hum: f64,

    /// Forced transmission after this many skipped ticks
    #[serde(default = "default_heartbeat_ticks")]
    #[validate(range(min = 1))]
    pub heartbeat_ticks: u32,
}

fn default_beta_temp() -> f64 {
    0.5
}

fn default_beta_hum() -> f64 {
    3.0
}

fn default_heartbeat_ticks() -> u32 {
    10
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            beta_temp: default_beta_temp(),
            beta_hum: default_beta_hum(),
            heartbeat_ticks: default_heartbeat_ticks(),
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// CSV flat file
    File,
    /// Network output (UDP)
    Network,
}

impl GatewayBlueprint {
    /// Blueprint with defaults for everything but the transport
    pub fn with_transport(transport: TransportConfig) -> Self {
        Self {
            version: ConfigVersion::V1,
            transport,
            protocol: ProtocolConfig::default(),
            policy: PolicyConfig::default(),
            model: None,
            model_path: None,
            sinks: Vec::new(),
        }
    }
}
