//! Fleet model shared by the orchestrator and control-plane adapters.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Version name that tags the canary slice of a deployment.
pub const CANARY_VERSION_NAME: &str = "canary";

/// Immutable description of one rollout run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutTarget {
    pub project: String,
    pub location: Location,
    /// Managed instance group name.
    pub group: String,
    /// Instance template to roll out.
    pub template: String,
}

impl RolloutTarget {
    pub fn new(
        project: impl Into<String>,
        location: Location,
        group: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location,
            group: group.into(),
            template: template.into(),
        }
    }
}

/// Size of a version slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSize {
    Fixed(u32),
    Percent(u32),
}

/// One weighted slice of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetVersion {
    /// Empty for the primary slice, [`CANARY_VERSION_NAME`] for the canary.
    pub name: String,
    /// Template self-link.
    pub template: String,
    /// `None` means "whatever remains".
    pub target_size: Option<TargetSize>,
}

impl FleetVersion {
    /// The primary slice: no name, no explicit size.
    pub fn primary(template: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            template: template.into(),
            target_size: None,
        }
    }

    /// The canary slice with a fixed instance count.
    pub fn canary(template: impl Into<String>, size: u32) -> Self {
        Self {
            name: CANARY_VERSION_NAME.to_string(),
            template: template.into(),
            target_size: Some(TargetSize::Fixed(size)),
        }
    }

    pub fn is_canary_tagged(&self) -> bool {
        self.name == CANARY_VERSION_NAME
    }

    /// Fixed instance count, if the slice has one.
    pub fn fixed_size(&self) -> Option<u32> {
        match self.target_size {
            Some(TargetSize::Fixed(n)) => Some(n),
            _ => None,
        }
    }
}

/// Provider-reported convergence flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStatus {
    pub is_stable: bool,
    pub version_target_reached: bool,
}

impl FleetStatus {
    pub fn converged(&self) -> bool {
        self.is_stable && self.version_target_reached
    }
}

/// Point-in-time view of a managed instance group.
///
/// Never mutated in place: every refresh yields a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub name: String,
    /// Self-link of the instance group manager.
    pub self_link: String,
    /// Resource URL of the instance group that load balancers reference.
    pub instance_group: String,
    pub versions: Vec<FleetVersion>,
    pub target_size: u32,
    /// Zones the group is distributed across (empty for zonal groups).
    pub distribution_zones: Vec<String>,
    pub status: FleetStatus,
}

impl FleetSnapshot {
    pub fn zone_count(&self) -> u32 {
        self.distribution_zones.len() as u32
    }
}

/// Resolved identity of an instance template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
    pub self_link: String,
}

/// Backend service fronting the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRef {
    pub name: String,
    pub self_link: String,
    /// Set for regional backend services, `None` for global ones.
    pub region: Option<String>,
}

impl BackendRef {
    pub fn is_regional(&self) -> bool {
        self.region.is_some()
    }
}

/// Load-balancer health state of a single instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Healthy,
    Unhealthy,
    /// Draining, timeout, unknown, or anything else the provider reports.
    Other(String),
}

impl HealthState {
    /// Map a provider health string (`HEALTHY`, `UNHEALTHY`, ...).
    pub fn parse(raw: &str) -> Self {
        match raw {
            "HEALTHY" => Self::Healthy,
            "UNHEALTHY" => Self::Unhealthy,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Per-instance health as reported by the backend service.
///
/// An instance can be reported several times (once per port or IP).
/// `Unhealthy` is sticky: later reports for the same instance never
/// clear it. Rebuilt on every health check, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    states: HashMap<String, HealthState>,
}

impl HealthRecord {
    pub fn insert(&mut self, instance: impl Into<String>, state: HealthState) {
        let slot = self.states.entry(instance.into()).or_insert(state.clone());
        if *slot != HealthState::Unhealthy {
            *slot = state;
        }
    }

    pub fn state(&self, instance: &str) -> Option<&HealthState> {
        self.states.get(instance)
    }

    /// Number of distinct instances reported.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Identifiers of instances the load balancer marks unhealthy.
    pub fn unhealthy(&self) -> HashSet<&str> {
        self.states
            .iter()
            .filter(|(_, state)| **state == HealthState::Unhealthy)
            .map(|(instance, _)| instance.as_str())
            .collect()
    }
}

impl<I: Into<String>> FromIterator<(I, HealthState)> for HealthRecord {
    fn from_iter<T: IntoIterator<Item = (I, HealthState)>>(iter: T) -> Self {
        let mut record = Self::default();
        for (instance, state) in iter {
            record.insert(instance, state);
        }
        record
    }
}

/// One member of the managed instance group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedInstance {
    pub instance: String,
    /// Template self-link the instance runs, if the provider reports one.
    pub template: Option<String>,
}

impl ManagedInstance {
    pub fn new(instance: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            template: Some(template.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateType {
    Proactive,
}

/// Rolling-update policy attached to a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePolicy {
    pub kind: UpdateType,
    pub max_surge: u32,
    pub max_unavailable: u32,
}

/// Partial update applied to a managed instance group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetPatch {
    pub versions: Vec<FleetVersion>,
    pub update_policy: UpdatePolicy,
}

/// State handed from one rollout iteration to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub fleet: FleetSnapshot,
    pub template: TemplateRef,
    pub backend: BackendRef,
}

impl ClusterSnapshot {
    /// Replace the fleet view, keeping the resolved template and backend.
    pub fn refreshed(&self, fleet: FleetSnapshot) -> Self {
        Self {
            fleet,
            template: self.template.clone(),
            backend: self.backend.clone(),
        }
    }
}
