//! Rollout orchestrator — drives the canary state machine to completion.
//!
//! One call to [`Orchestrator::start`] runs initialize → scale → wait for
//! stability → health gate → done-check, looping until the group runs
//! only the target template or an error aborts the run.

use canary_core::{ClusterSnapshot, RolloutConfig, RolloutResult, RolloutTarget};
use tracing::info;

use crate::api::FleetApi;
use crate::clock::{Shutdown, Sleeper, TokioSleeper};
use crate::health::check_canary_health;
use crate::scale::{is_done, plan_scale};
use crate::stability::StabilityWaiter;

/// What a finished rollout did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloutSummary {
    /// Canary size applied in each iteration, in order.
    pub canary_sizes: Vec<u32>,
}

impl RolloutSummary {
    pub fn iterations(&self) -> usize {
        self.canary_sizes.len()
    }
}

/// Rolls one instance template out to one managed instance group.
pub struct Orchestrator<A, S = TokioSleeper> {
    api: A,
    sleeper: S,
    target: RolloutTarget,
    config: RolloutConfig,
}

impl<A: FleetApi> Orchestrator<A> {
    pub fn new(api: A, target: RolloutTarget, config: RolloutConfig) -> Self {
        Self {
            api,
            sleeper: TokioSleeper,
            target,
            config,
        }
    }
}

impl<A: FleetApi, S: Sleeper> Orchestrator<A, S> {
    /// Replace the sleeper used between stability polls.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> Orchestrator<A, T> {
        Orchestrator {
            api: self.api,
            sleeper,
            target: self.target,
            config: self.config,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run the rollout until the group is fully on the target template.
    ///
    /// Every error is fatal and leaves any already-applied step in place.
    pub async fn start(&self, shutdown: Shutdown) -> RolloutResult<RolloutSummary> {
        info!(
            template = %self.target.template,
            group = %self.target.group,
            location = %self.target.location,
            "starting rollout"
        );

        let mut cluster = self.initialize(&shutdown).await?;
        let mut summary = RolloutSummary::default();

        if is_done(&cluster.fleet, &cluster.template) {
            info!(group = %self.target.group, "instance group already runs the target template");
            return Ok(summary);
        }

        let waiter = StabilityWaiter::new(&self.api, &self.sleeper, self.config);

        loop {
            let iteration = summary.iterations();
            info!(iteration, "beginning rollout loop iteration");

            let canary_size = self.scale(&cluster, &shutdown).await?;
            summary.canary_sizes.push(canary_size);

            cluster = waiter.wait(&self.target, &cluster, &shutdown).await?;

            check_canary_health(&self.api, &self.target, &cluster, &shutdown).await?;

            if is_done(&cluster.fleet, &cluster.template) {
                break;
            }
        }

        info!(
            group = %self.target.group,
            iterations = summary.iterations(),
            "rollout complete"
        );
        Ok(summary)
    }

    /// Resolve the group, the target template, and the fronting backend.
    async fn initialize(&self, shutdown: &Shutdown) -> RolloutResult<ClusterSnapshot> {
        let target = &self.target;
        target.location.validate()?;

        let fleet = shutdown
            .guard(
                self.api
                    .get_group(&target.project, &target.location, &target.group),
            )
            .await?;
        let template = shutdown
            .guard(self.api.get_template(&target.project, &target.template))
            .await?;
        let backend = shutdown
            .guard(self.api.find_backend_for_group(&target.project, &fleet))
            .await?;

        info!(
            group = %fleet.name,
            target_size = fleet.target_size,
            zones = fleet.zone_count(),
            backend = %backend.name,
            "resolved rollout target"
        );

        Ok(ClusterSnapshot {
            fleet,
            template,
            backend,
        })
    }

    /// Apply the next canary step, returning the new canary size.
    async fn scale(&self, cluster: &ClusterSnapshot, shutdown: &Shutdown) -> RolloutResult<u32> {
        let plan = plan_scale(&cluster.fleet, &cluster.template)?;

        info!(
            old_canary_size = plan.old_canary_size,
            canary_size = plan.new_canary_size,
            max_surge = plan.patch.update_policy.max_surge,
            collapses = plan.collapses,
            "patching managed instance group"
        );

        let target = &self.target;
        shutdown
            .guard(self.api.patch_group(
                &target.project,
                &target.location,
                &target.group,
                &plan.patch,
            ))
            .await?;

        Ok(plan.new_canary_size)
    }
}
