//! Compute Engine v1 JSON payloads and their mapping onto the fleet model.
//!
//! Only the fields the rollout reads or writes are modelled; everything
//! else in the API responses is ignored.

use std::collections::HashMap;

use canary_core::{
    BackendRef, FleetPatch, FleetSnapshot, FleetStatus, FleetVersion, HealthRecord, HealthState,
    ManagedInstance, TargetSize, TemplateRef, UpdateType,
};
use serde::{Deserialize, Serialize};

use crate::paging::Paged;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedOrPercent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u32>,
}

impl FixedOrPercent {
    pub fn fixed(n: u32) -> Self {
        Self {
            fixed: Some(n),
            percent: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManagerVersion {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub instance_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<FixedOrPercent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfiguration {
    pub zone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionPolicy {
    #[serde(default)]
    pub zones: Vec<ZoneConfiguration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionTarget {
    #[serde(default)]
    pub is_reached: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManagerStatus {
    #[serde(default)]
    pub is_stable: bool,
    #[serde(default)]
    pub version_target: VersionTarget,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManager {
    pub name: String,
    pub self_link: String,
    #[serde(default)]
    pub instance_group: String,
    #[serde(default)]
    pub versions: Vec<InstanceGroupManagerVersion>,
    #[serde(default)]
    pub target_size: u32,
    #[serde(default)]
    pub distribution_policy: Option<DistributionPolicy>,
    #[serde(default)]
    pub status: InstanceGroupManagerStatus,
}

impl From<InstanceGroupManager> for FleetSnapshot {
    fn from(igm: InstanceGroupManager) -> Self {
        let distribution_zones = igm
            .distribution_policy
            .map(|policy| {
                policy
                    .zones
                    .into_iter()
                    .map(|z| last_segment(&z.zone).to_string())
                    .collect()
            })
            .unwrap_or_default();

        FleetSnapshot {
            name: igm.name,
            self_link: igm.self_link,
            instance_group: igm.instance_group,
            versions: igm.versions.into_iter().map(FleetVersion::from).collect(),
            target_size: igm.target_size,
            distribution_zones,
            status: FleetStatus {
                is_stable: igm.status.is_stable,
                version_target_reached: igm.status.version_target.is_reached,
            },
        }
    }
}

impl From<InstanceGroupManagerVersion> for FleetVersion {
    fn from(v: InstanceGroupManagerVersion) -> Self {
        let target_size = v.target_size.and_then(|size| match (size.fixed, size.percent) {
            (Some(n), _) => Some(TargetSize::Fixed(n)),
            (None, Some(p)) => Some(TargetSize::Percent(p)),
            (None, None) => None,
        });
        FleetVersion {
            name: v.name,
            template: v.instance_template,
            target_size,
        }
    }
}

impl From<&FleetVersion> for InstanceGroupManagerVersion {
    fn from(v: &FleetVersion) -> Self {
        let target_size = v.target_size.map(|size| match size {
            TargetSize::Fixed(n) => FixedOrPercent::fixed(n),
            TargetSize::Percent(p) => FixedOrPercent {
                fixed: None,
                percent: Some(p),
            },
        });
        InstanceGroupManagerVersion {
            name: v.name.clone(),
            instance_template: v.template.clone(),
            target_size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicyBody {
    #[serde(rename = "type")]
    pub kind: UpdateType,
    pub max_surge: FixedOrPercent,
    pub max_unavailable: FixedOrPercent,
}

/// Partial instance group manager resource sent with PATCH.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManagerPatch {
    pub versions: Vec<InstanceGroupManagerVersion>,
    pub update_policy: UpdatePolicyBody,
}

impl From<&FleetPatch> for InstanceGroupManagerPatch {
    fn from(patch: &FleetPatch) -> Self {
        InstanceGroupManagerPatch {
            versions: patch.versions.iter().map(Into::into).collect(),
            update_policy: UpdatePolicyBody {
                kind: patch.update_policy.kind,
                max_surge: FixedOrPercent::fixed(patch.update_policy.max_surge),
                max_unavailable: FixedOrPercent::fixed(patch.update_policy.max_unavailable),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstanceVersion {
    #[serde(default)]
    pub instance_template: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstanceItem {
    pub instance: String,
    #[serde(default)]
    pub version: Option<ManagedInstanceVersion>,
}

impl From<ManagedInstanceItem> for ManagedInstance {
    fn from(item: ManagedInstanceItem) -> Self {
        ManagedInstance {
            instance: item.instance,
            template: item
                .version
                .map(|v| v.instance_template)
                .filter(|t| !t.is_empty()),
        }
    }
}

/// One page of `listManagedInstances` (zonal and regional share the shape).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListManagedInstancesPage {
    #[serde(default)]
    pub managed_instances: Vec<ManagedInstanceItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl Paged for ListManagedInstancesPage {
    fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplate {
    pub name: String,
    pub self_link: String,
}

impl From<InstanceTemplate> for TemplateRef {
    fn from(t: InstanceTemplate) -> Self {
        TemplateRef {
            name: t.name,
            self_link: t.self_link,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    #[serde(default)]
    pub group: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendService {
    pub name: String,
    pub self_link: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub backends: Vec<Backend>,
}

impl BackendService {
    /// Whether any backend points at `instance_group`.
    pub fn serves(&self, instance_group: &str) -> bool {
        let wanted = resource_path(instance_group);
        self.backends
            .iter()
            .any(|b| !b.group.is_empty() && resource_path(&b.group) == wanted)
    }
}

impl From<BackendService> for BackendRef {
    fn from(b: BackendService) -> Self {
        BackendRef {
            name: b.name,
            self_link: b.self_link,
            region: b
                .region
                .filter(|r| !r.is_empty())
                .map(|r| last_segment(&r).to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServicesScopedList {
    #[serde(default)]
    pub backend_services: Vec<BackendService>,
}

/// One page of `aggregated/backendServices`, keyed by scope
/// (`global`, `regions/us-central1`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServiceAggregatedPage {
    #[serde(default)]
    pub items: HashMap<String, BackendServicesScopedList>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl Paged for BackendServiceAggregatedPage {
    fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }
}

impl BackendServiceAggregatedPage {
    /// First backend service in this page that fronts `instance_group`.
    pub fn find_serving(self, instance_group: &str) -> Option<BackendService> {
        self.items
            .into_values()
            .flat_map(|scoped| scoped.backend_services)
            .find(|service| service.serves(instance_group))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceGroupReference {
    pub group: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHealth {
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub health_state: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServiceGroupHealth {
    #[serde(default)]
    pub health_status: Vec<InstanceHealth>,
}

impl From<BackendServiceGroupHealth> for HealthRecord {
    fn from(health: BackendServiceGroupHealth) -> Self {
        health
            .health_status
            .into_iter()
            .filter(|h| !h.instance.is_empty())
            .map(|h| (h.instance, HealthState::parse(&h.health_state)))
            .collect()
    }
}

/// Strip scheme, host, and API version so self-links from different API
/// hosts compare equal.
pub fn resource_path(url: &str) -> &str {
    url.find("projects/").map_or(url, |i| &url[i..])
}

/// Trailing path segment of a resource URL (`.../zones/us-central1-a` → `us-central1-a`).
pub fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_core::UpdatePolicy;

    const IGM_JSON: &str = r#"{
        "kind": "compute#instanceGroupManager",
        "name": "web",
        "selfLink": "https://www.googleapis.com/compute/v1/projects/p/regions/us-central1/instanceGroupManagers/web",
        "instanceGroup": "https://www.googleapis.com/compute/v1/projects/p/regions/us-central1/instanceGroups/web",
        "targetSize": 4,
        "versions": [
            {"instanceTemplate": "https://www.googleapis.com/compute/v1/projects/p/global/instanceTemplates/web-v1"},
            {"name": "canary", "instanceTemplate": "https://www.googleapis.com/compute/v1/projects/p/global/instanceTemplates/web-v2",
             "targetSize": {"fixed": 2, "calculated": 2}}
        ],
        "distributionPolicy": {
            "zones": [
                {"zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a"},
                {"zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-b"},
                {"zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-f"}
            ]
        },
        "status": {"isStable": true, "versionTarget": {"isReached": false}}
    }"#;

    #[test]
    fn instance_group_manager_maps_to_snapshot() {
        let igm: InstanceGroupManager = serde_json::from_str(IGM_JSON).unwrap();
        let snapshot = FleetSnapshot::from(igm);

        assert_eq!(snapshot.name, "web");
        assert_eq!(snapshot.target_size, 4);
        assert_eq!(snapshot.zone_count(), 3);
        assert_eq!(snapshot.distribution_zones[2], "us-central1-f");
        assert!(snapshot.status.is_stable);
        assert!(!snapshot.status.version_target_reached);
        assert_eq!(snapshot.versions.len(), 2);
        assert_eq!(snapshot.versions[0].name, "");
        assert_eq!(snapshot.versions[0].target_size, None);
        assert!(snapshot.versions[1].is_canary_tagged());
        assert_eq!(snapshot.versions[1].fixed_size(), Some(2));
    }

    #[test]
    fn zonal_group_has_no_zones() {
        let igm: InstanceGroupManager = serde_json::from_str(
            r#"{"name": "web", "selfLink": "x", "targetSize": 2,
                "versions": [{"instanceTemplate": "t1"}]}"#,
        )
        .unwrap();
        let snapshot = FleetSnapshot::from(igm);
        assert_eq!(snapshot.zone_count(), 0);
        assert!(!snapshot.status.converged());
    }

    #[test]
    fn patch_body_omits_primary_size() {
        let patch = FleetPatch {
            versions: vec![
                FleetVersion::primary("t/web-v1"),
                FleetVersion::canary("t/web-v2", 1),
            ],
            update_policy: UpdatePolicy {
                kind: UpdateType::Proactive,
                max_surge: 3,
                max_unavailable: 0,
            },
        };

        let body = serde_json::to_value(InstanceGroupManagerPatch::from(&patch)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "versions": [
                    {"instanceTemplate": "t/web-v1"},
                    {"name": "canary", "instanceTemplate": "t/web-v2", "targetSize": {"fixed": 1}}
                ],
                "updatePolicy": {
                    "type": "PROACTIVE",
                    "maxSurge": {"fixed": 3},
                    "maxUnavailable": {"fixed": 0}
                }
            })
        );
    }

    #[test]
    fn managed_instances_page_decodes() {
        let page: ListManagedInstancesPage = serde_json::from_str(
            r#"{
                "managedInstances": [
                    {"instance": "https://x/projects/p/zones/a/instances/web-1",
                     "version": {"instanceTemplate": "t/web-v2"}},
                    {"instance": "https://x/projects/p/zones/a/instances/web-2"}
                ],
                "nextPageToken": "abc"
            }"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));

        let instances: Vec<ManagedInstance> =
            page.managed_instances.into_iter().map(Into::into).collect();
        assert_eq!(instances[0].template.as_deref(), Some("t/web-v2"));
        assert_eq!(instances[1].template, None);
    }

    #[test]
    fn aggregated_backends_match_on_instance_group() {
        let page: BackendServiceAggregatedPage = serde_json::from_str(
            r#"{
                "items": {
                    "global": {"backendServices": [
                        {"name": "other", "selfLink": "s/other",
                         "backends": [{"group": "https://www.googleapis.com/compute/v1/projects/p/zones/a/instanceGroups/other"}]}
                    ]},
                    "regions/us-central1": {"backendServices": [
                        {"name": "web-backend", "selfLink": "s/web-backend",
                         "region": "https://www.googleapis.com/compute/v1/projects/p/regions/us-central1",
                         "backends": [{"group": "https://compute.googleapis.com/compute/v1/projects/p/regions/us-central1/instanceGroups/web"}]}
                    ]},
                    "regions/europe-west1": {"warning": {"code": "NO_RESULTS_ON_PAGE"}}
                }
            }"#,
        )
        .unwrap();

        let found = page
            .find_serving("https://www.googleapis.com/compute/v1/projects/p/regions/us-central1/instanceGroups/web")
            .unwrap();
        let backend = BackendRef::from(found);
        assert_eq!(backend.name, "web-backend");
        assert_eq!(backend.region.as_deref(), Some("us-central1"));
        assert!(backend.is_regional());
    }

    #[test]
    fn group_health_maps_states() {
        let health: BackendServiceGroupHealth = serde_json::from_str(
            r#"{"kind": "compute#backendServiceGroupHealth", "healthStatus": [
                {"instance": "i/web-1", "healthState": "HEALTHY", "port": 80},
                {"instance": "i/web-2", "healthState": "UNHEALTHY", "port": 80}
            ]}"#,
        )
        .unwrap();
        let record = HealthRecord::from(health);
        assert_eq!(record.len(), 2);
        assert!(record.unhealthy().contains("i/web-2"));
    }

    #[test]
    fn instance_unhealthy_on_one_port_stays_unhealthy() {
        let health: BackendServiceGroupHealth = serde_json::from_str(
            r#"{"healthStatus": [
                {"instance": "i/web-2", "healthState": "UNHEALTHY", "port": 80},
                {"instance": "i/web-2", "healthState": "HEALTHY", "port": 8080}
            ]}"#,
        )
        .unwrap();
        let record = HealthRecord::from(health);
        assert_eq!(record.len(), 1);
        assert!(record.unhealthy().contains("i/web-2"));
    }

    #[test]
    fn resource_paths_ignore_host() {
        assert_eq!(
            resource_path("https://www.googleapis.com/compute/v1/projects/p/zones/a/instanceGroups/g"),
            "projects/p/zones/a/instanceGroups/g"
        );
        assert_eq!(last_segment("projects/p/regions/us-east1"), "us-east1");
    }
}
