use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::utils::CircuitBreakerConfig;

// ============================================================================
// Bridge Configuration
// ============================================================================
//
// Sources, lowest precedence first:
// - built-in defaults
// - TOML file (explicit path, or ./bridge.toml when present)
// - environment variables, e.g. BRIDGE__NATS__URL=nats://broker:4222
//
// ============================================================================

const DEFAULT_CONFIG_FILE: &str = "bridge.toml";
const ENV_PREFIX: &str = "BRIDGE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub nats: NatsConfig,
    pub delivery: DeliveryConfig,
    pub metrics: MetricsConfig,
    pub circuit_breaker: CircuitBreakerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
    /// Subject every observation event is published to
    pub subject: String,
    /// JetStream stream that captures `subject`
    pub stream: String,
    pub connection_name: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            subject: "fhir.observation".to_string(),
            stream: "FHIR_OBSERVATIONS".to_string(),
            connection_name: "hapi-fhir-message-bridge".to_string(),
        }
    }
}

/// Wire shape of the published payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFormat {
    /// Field-mapped `ObservationOp` event
    #[default]
    Canonical,
    /// `{op, observation}` with the full resource body as a string
    Passthrough,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Only notifications for this subscription are claimed by the gate
    pub subscription_id: String,
    pub concurrent_consumers: usize,
    pub format: EventFormat,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            subscription_id: "nats-observation-subscription".to_string(),
            concurrent_consumers: 4,
            format: EventFormat::Canonical,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub open_timeout_secs: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout_secs: 30,
            success_threshold: 3,
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        CircuitBreakerConfig {
            failure_threshold: settings.failure_threshold,
            timeout: Duration::from_secs(settings.open_timeout_secs),
            success_threshold: settings.success_threshold,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from an optional file plus `BRIDGE__*` env overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let file = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if file.exists() {
            builder = builder.add_source(config::File::from(file));
        } else if path.is_some() {
            return Err(BridgeError::Config(format!(
                "config file not found: {}",
                file.display()
            )));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );

        let cfg: BridgeConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nats.url.trim().is_empty() {
            return Err(BridgeError::Config("nats.url must not be empty".into()));
        }
        if self.nats.subject.trim().is_empty() {
            return Err(BridgeError::Config("nats.subject must not be empty".into()));
        }
        if self.nats.stream.trim().is_empty() {
            return Err(BridgeError::Config("nats.stream must not be empty".into()));
        }
        if self.delivery.subscription_id.trim().is_empty() {
            return Err(BridgeError::Config(
                "delivery.subscription_id must not be empty".into(),
            ));
        }
        if self.delivery.concurrent_consumers == 0 {
            return Err(BridgeError::Config(
                "delivery.concurrent_consumers must be at least 1".into(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 || self.circuit_breaker.success_threshold == 0 {
            return Err(BridgeError::Config(
                "circuit_breaker thresholds must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
