//! canary-core — shared types for fleet canary rollouts.
//!
//! Holds the value types threaded through every rollout step: the
//! region-or-zone [`Location`], the fleet model (versions, snapshots,
//! templates, backends, health), the error taxonomy, and the rollout
//! configuration file.

pub mod config;
pub mod error;
pub mod location;
pub mod types;

pub use config::{CanaryConfig, RolloutConfig};
pub use error::{ConfigError, FleetError, FleetResult, RolloutError, RolloutResult};
pub use location::Location;
pub use types::*;
