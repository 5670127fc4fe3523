//! Control-plane capability consumed by the orchestrator.
//!
//! Implementations own all provider specifics (URLs, paging, auth). The
//! orchestrator only ever sees the types from `canary_core`.

use std::future::Future;

use canary_core::{
    BackendRef, FleetPatch, FleetResult, FleetSnapshot, HealthRecord, Location, ManagedInstance,
    TemplateRef,
};

/// Operations on a managed instance group and the load balancer in front of it.
///
/// Each operation validates `location` before doing any I/O and reports
/// failures as `FleetError::{Location, NotFound, Api}`.
pub trait FleetApi: Send + Sync {
    /// Fetch the current state of an instance group.
    fn get_group(
        &self,
        project: &str,
        location: &Location,
        name: &str,
    ) -> impl Future<Output = FleetResult<FleetSnapshot>> + Send;

    /// List every instance in the group, following all result pages.
    fn list_group_instances(
        &self,
        project: &str,
        location: &Location,
        name: &str,
    ) -> impl Future<Output = FleetResult<Vec<ManagedInstance>>> + Send;

    /// Apply a partial update (versions and update policy only).
    fn patch_group(
        &self,
        project: &str,
        location: &Location,
        name: &str,
        patch: &FleetPatch,
    ) -> impl Future<Output = FleetResult<()>> + Send;

    /// Resolve an instance template by name.
    fn get_template(
        &self,
        project: &str,
        name: &str,
    ) -> impl Future<Output = FleetResult<TemplateRef>> + Send;

    /// Find the backend service that load-balances across `group`.
    fn find_backend_for_group(
        &self,
        project: &str,
        group: &FleetSnapshot,
    ) -> impl Future<Output = FleetResult<BackendRef>> + Send;

    /// Per-instance health of `group` as seen by `backend`.
    fn get_backend_health(
        &self,
        project: &str,
        backend: &BackendRef,
        group: &FleetSnapshot,
    ) -> impl Future<Output = FleetResult<HealthRecord>> + Send;
}
