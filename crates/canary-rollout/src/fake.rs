//! Scripted in-memory control plane for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use canary_core::{
    BackendRef, FleetError, FleetPatch, FleetResult, FleetSnapshot, FleetStatus, FleetVersion,
    HealthRecord, Location, ManagedInstance, TemplateRef,
};

use crate::api::FleetApi;
use crate::clock::Sleeper;

pub const PRIMARY: &str = "projects/p/global/instanceTemplates/web-v1";
pub const TARGET: &str = "projects/p/global/instanceTemplates/web-v2";

pub fn template() -> TemplateRef {
    TemplateRef {
        name: "web-v2".to_string(),
        self_link: TARGET.to_string(),
    }
}

pub fn backend() -> BackendRef {
    BackendRef {
        name: "web-backend".to_string(),
        self_link: "projects/p/regions/us-central1/backendServices/web-backend".to_string(),
        region: Some("us-central1".to_string()),
    }
}

pub fn snapshot(versions: Vec<FleetVersion>, target_size: u32, stable: bool) -> FleetSnapshot {
    FleetSnapshot {
        name: "web".to_string(),
        self_link: "projects/p/regions/us-central1/instanceGroupManagers/web".to_string(),
        instance_group: "projects/p/regions/us-central1/instanceGroups/web".to_string(),
        versions,
        target_size,
        distribution_zones: vec![
            "us-central1-a".to_string(),
            "us-central1-b".to_string(),
            "us-central1-c".to_string(),
        ],
        status: FleetStatus {
            is_stable: stable,
            version_target_reached: stable,
        },
    }
}

/// Returns scripted group snapshots in order; the last one repeats.
///
/// Every operation is counted by name. [`FakeFleet::fail_on`] makes the
/// n-th call of one operation return an API error instead.
pub struct FakeFleet {
    groups: Mutex<VecDeque<FleetSnapshot>>,
    pub health: HealthRecord,
    pub instances: Vec<ManagedInstance>,
    pub patches: Mutex<Vec<FleetPatch>>,
    pub missing_backend: bool,
    calls: Mutex<HashMap<&'static str, u32>>,
    failure: Option<(&'static str, u32)>,
}

impl FakeFleet {
    pub fn new(groups: Vec<FleetSnapshot>) -> Self {
        Self {
            groups: Mutex::new(groups.into()),
            health: HealthRecord::default(),
            instances: Vec::new(),
            patches: Mutex::new(Vec::new()),
            missing_backend: false,
            calls: Mutex::new(HashMap::new()),
            failure: None,
        }
    }

    /// Fail the `nth` (1-based) call of `operation` with `FleetError::Api`.
    pub fn fail_on(mut self, operation: &'static str, nth: u32) -> Self {
        self.failure = Some((operation, nth));
        self
    }

    pub fn calls(&self, operation: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn get_group_calls(&self) -> u32 {
        self.calls("get_group")
    }

    pub fn patches(&self) -> Vec<FleetPatch> {
        self.patches.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> FleetResult<()> {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(operation).or_insert(0);
        *count += 1;
        match self.failure {
            Some((op, nth)) if op == operation && nth == *count => {
                Err(FleetError::api(operation, "503 Service Unavailable"))
            }
            _ => Ok(()),
        }
    }
}

impl FleetApi for FakeFleet {
    async fn get_group(
        &self,
        _project: &str,
        location: &Location,
        name: &str,
    ) -> FleetResult<FleetSnapshot> {
        location.validate()?;
        self.record("get_group")?;
        let mut groups = self.groups.lock().unwrap();
        let next = if groups.len() > 1 {
            groups.pop_front()
        } else {
            groups.front().cloned()
        };
        next.ok_or_else(|| FleetError::not_found("instance group", name))
    }

    async fn list_group_instances(
        &self,
        _project: &str,
        location: &Location,
        _name: &str,
    ) -> FleetResult<Vec<ManagedInstance>> {
        location.validate()?;
        self.record("list_group_instances")?;
        Ok(self.instances.clone())
    }

    async fn patch_group(
        &self,
        _project: &str,
        location: &Location,
        _name: &str,
        patch: &FleetPatch,
    ) -> FleetResult<()> {
        location.validate()?;
        self.record("patch_group")?;
        self.patches.lock().unwrap().push(patch.clone());
        Ok(())
    }

    async fn get_template(&self, _project: &str, name: &str) -> FleetResult<TemplateRef> {
        self.record("get_template")?;
        if name == "web-v2" {
            Ok(template())
        } else {
            Err(FleetError::not_found("instance template", name))
        }
    }

    async fn find_backend_for_group(
        &self,
        _project: &str,
        group: &FleetSnapshot,
    ) -> FleetResult<BackendRef> {
        self.record("find_backend_for_group")?;
        if self.missing_backend {
            return Err(FleetError::not_found(
                "backend service for instance group",
                &group.instance_group,
            ));
        }
        Ok(backend())
    }

    async fn get_backend_health(
        &self,
        _project: &str,
        _backend: &BackendRef,
        _group: &FleetSnapshot,
    ) -> FleetResult<HealthRecord> {
        self.record("get_backend_health")?;
        Ok(self.health.clone())
    }
}

/// Returns immediately and counts how often it was asked to sleep.
#[derive(Default)]
pub struct CountingSleeper {
    pub sleeps: AtomicU32,
}

impl CountingSleeper {
    pub fn count(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Sleeper for CountingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
    }
}
