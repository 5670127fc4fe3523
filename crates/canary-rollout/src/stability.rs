//! Bounded wait for an instance group to converge after a patch.

use canary_core::{ClusterSnapshot, RolloutConfig, RolloutError, RolloutResult, RolloutTarget};
use tracing::{debug, info};

use crate::api::FleetApi;
use crate::clock::{Shutdown, Sleeper};

/// Polls the group until it is stable and has reached its version target.
pub struct StabilityWaiter<'a, A, S> {
    api: &'a A,
    sleeper: &'a S,
    config: RolloutConfig,
}

impl<'a, A: FleetApi, S: Sleeper> StabilityWaiter<'a, A, S> {
    pub fn new(api: &'a A, sleeper: &'a S, config: RolloutConfig) -> Self {
        Self {
            api,
            sleeper,
            config,
        }
    }

    /// Return a refreshed snapshot as soon as the group has converged.
    ///
    /// Makes at most `max_ticks` fetches and sleeps one tick between
    /// consecutive fetches. Exhausting the budget is a
    /// [`RolloutError::StabilityTimeout`].
    pub async fn wait(
        &self,
        target: &RolloutTarget,
        current: &ClusterSnapshot,
        shutdown: &Shutdown,
    ) -> RolloutResult<ClusterSnapshot> {
        info!(
            group = %target.group,
            max_ticks = self.config.max_ticks,
            tick_secs = self.config.tick_interval.as_secs(),
            "waiting for instance group to become stable"
        );

        for tick in 1..=self.config.max_ticks {
            let group = shutdown
                .guard(
                    self.api
                        .get_group(&target.project, &target.location, &target.group),
                )
                .await?;

            if group.status.converged() {
                info!(group = %target.group, tick, "instance group is stable");
                return Ok(current.refreshed(group));
            }

            debug!(
                group = %target.group,
                tick,
                is_stable = group.status.is_stable,
                version_target_reached = group.status.version_target_reached,
                "instance group not yet stable"
            );

            if tick < self.config.max_ticks {
                shutdown
                    .sleep(self.sleeper, self.config.tick_interval)
                    .await?;
            }
        }

        Err(RolloutError::StabilityTimeout {
            ticks: self.config.max_ticks,
        })
    }
}
