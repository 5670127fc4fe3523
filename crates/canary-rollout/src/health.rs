//! Health gate: no canary instance may be unhealthy behind the load balancer.

use canary_core::{
    ClusterSnapshot, HealthRecord, ManagedInstance, RolloutError, RolloutResult, RolloutTarget,
    TemplateRef,
};
use tracing::{info, warn};

use crate::api::FleetApi;
use crate::clock::Shutdown;

/// First instance that runs `template` and is marked unhealthy.
///
/// Instances on any other template are ignored.
pub fn find_unhealthy_canary<'a>(
    health: &HealthRecord,
    instances: &'a [ManagedInstance],
    template: &TemplateRef,
) -> Option<&'a ManagedInstance> {
    let unhealthy = health.unhealthy();
    instances.iter().find(|instance| {
        instance.template.as_deref() == Some(template.self_link.as_str())
            && unhealthy.contains(instance.instance.as_str())
    })
}

/// Fetch backend health and the group's instances, failing on the first
/// unhealthy canary.
pub async fn check_canary_health<A: FleetApi>(
    api: &A,
    target: &RolloutTarget,
    cluster: &ClusterSnapshot,
    shutdown: &Shutdown,
) -> RolloutResult<()> {
    info!(backend = %cluster.backend.name, "checking backend service health");

    let health = shutdown
        .guard(api.get_backend_health(&target.project, &cluster.backend, &cluster.fleet))
        .await?;
    info!(unhealthy = health.unhealthy().len(), "backend health fetched");

    let instances = shutdown
        .guard(api.list_group_instances(&target.project, &target.location, &target.group))
        .await?;

    if let Some(instance) = find_unhealthy_canary(&health, &instances, &cluster.template) {
        warn!(
            instance = %instance.instance,
            backend = %cluster.backend.name,
            "canary instance is unhealthy"
        );
        return Err(RolloutError::UnhealthyCanary {
            instance: instance.instance.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_core::{FleetVersion, HealthState, Location};

    use crate::fake::{self, FakeFleet};

    fn record(unhealthy: &[&str]) -> HealthRecord {
        unhealthy
            .iter()
            .map(|i| (*i, HealthState::Unhealthy))
            .chain([("vm-healthy", HealthState::Healthy)])
            .collect()
    }

    fn listing() -> Vec<ManagedInstance> {
        vec![
            ManagedInstance::new("vm-a", fake::TARGET),
            ManagedInstance::new("vm-b", fake::PRIMARY),
        ]
    }

    #[test]
    fn unhealthy_canary_is_found() {
        let instances = listing();
        let found = find_unhealthy_canary(&record(&["vm-a"]), &instances, &fake::template());
        assert_eq!(found.map(|i| i.instance.as_str()), Some("vm-a"));
    }

    #[test]
    fn unhealthy_primary_is_ignored() {
        let instances = listing();
        assert!(find_unhealthy_canary(&record(&["vm-b"]), &instances, &fake::template()).is_none());
    }

    #[test]
    fn instance_without_template_is_ignored() {
        let instances = vec![ManagedInstance {
            instance: "vm-a".to_string(),
            template: None,
        }];
        assert!(find_unhealthy_canary(&record(&["vm-a"]), &instances, &fake::template()).is_none());
    }

    fn cluster() -> ClusterSnapshot {
        ClusterSnapshot {
            fleet: fake::snapshot(
                vec![
                    FleetVersion::primary(fake::PRIMARY),
                    FleetVersion::canary(fake::TARGET, 1),
                ],
                4,
                true,
            ),
            template: fake::template(),
            backend: fake::backend(),
        }
    }

    fn target() -> RolloutTarget {
        RolloutTarget::new("p", Location::region("us-central1"), "web", "web-v2")
    }

    #[tokio::test]
    async fn gate_fails_naming_instance() {
        let mut api = FakeFleet::new(vec![]);
        api.health = record(&["vm-a"]);
        api.instances = listing();

        let err = check_canary_health(&api, &target(), &cluster(), &Shutdown::never())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RolloutError::UnhealthyCanary { ref instance } if instance == "vm-a"
        ));
    }

    #[tokio::test]
    async fn gate_passes_when_only_primary_unhealthy() {
        let mut api = FakeFleet::new(vec![]);
        api.health = record(&["vm-b"]);
        api.instances = listing();

        check_canary_health(&api, &target(), &cluster(), &Shutdown::never())
            .await
            .unwrap();
    }
}
