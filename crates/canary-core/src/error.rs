//! Error types for canary rollouts.

use thiserror::Error;

/// Result type alias for fleet control-plane operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Result type alias for orchestrator operations.
pub type RolloutResult<T> = Result<T, RolloutError>;

/// Errors surfaced by a fleet control-plane adapter.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("invalid location: {0}")]
    Location(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },
}

impl FleetError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn api(operation: &'static str, message: impl ToString) -> Self {
        Self::Api {
            operation,
            message: message.to_string(),
        }
    }
}

/// Errors that abort a rollout run. Every variant is fatal.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error("found two non-canary templates: '{first}' and '{second}', cannot determine primary template")]
    AmbiguousPrimary { first: String, second: String },

    #[error("could not find primary (non-canary) template")]
    MissingPrimary,

    #[error("instance group did not become stable within {ticks} ticks")]
    StabilityTimeout { ticks: u32 },

    #[error("found unhealthy canary instance in backend service: '{instance}'")]
    UnhealthyCanary { instance: String },

    #[error("rollout cancelled")]
    Cancelled,
}

/// Errors loading rollout configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration: '{0}'")]
    Duration(String),

    #[error("max_ticks must be at least 1")]
    ZeroTicks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_operation() {
        let err = FleetError::api("patch instance group", "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "patch instance group failed: 503 Service Unavailable"
        );
    }

    #[test]
    fn fleet_error_is_transparent_in_rollout_error() {
        let err: RolloutError = FleetError::not_found("instance template", "web-v2").into();
        assert_eq!(err.to_string(), "instance template not found: web-v2");
    }
}
