//! REST client implementing the fleet control plane on Compute Engine.

use std::ops::ControlFlow;
use std::time::Duration;

use canary_core::{
    BackendRef, FleetError, FleetPatch, FleetResult, FleetSnapshot, HealthRecord, Location,
    ManagedInstance, TemplateRef,
};
use canary_rollout::FleetApi;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::auth::TokenSource;
use crate::paging::{walk_pages, with_page_token};
use crate::wire::{
    BackendServiceAggregatedPage, BackendServiceGroupHealth, InstanceGroupManager,
    InstanceGroupManagerPatch, InstanceTemplate, ListManagedInstancesPage,
    ResourceGroupReference,
};

/// Default Compute Engine v1 endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

/// Connection settings for [`GceFleetApi`].
#[derive(Debug, Clone)]
pub struct GceConfig {
    /// Base URL up to and including the API version.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`FleetApi`] backed by the Compute Engine REST API.
pub struct GceFleetApi {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl GceFleetApi {
    /// Build a client and make sure a token can be obtained.
    pub async fn connect(config: GceConfig) -> FleetResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("canaryctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FleetError::api("initialize compute API client", e))?;

        let tokens = TokenSource::from_env().await?;
        tokens.token().await?;
        info!(endpoint = %config.endpoint, credentials = tokens.describe(), "compute API client ready");

        Ok(Self::with_tokens(http, config.endpoint, tokens))
    }

    pub fn with_tokens(http: reqwest::Client, endpoint: impl Into<String>, tokens: TokenSource) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn group_url(&self, project: &str, location: &Location, name: &str) -> String {
        let scope = match location {
            Location::Region(region) => format!("regions/{region}"),
            Location::Zone(zone) => format!("zones/{zone}"),
        };
        format!(
            "{}/projects/{project}/{scope}/instanceGroupManagers/{name}",
            self.endpoint
        )
    }

    fn template_url(&self, project: &str, name: &str) -> String {
        format!("{}/projects/{project}/global/instanceTemplates/{name}", self.endpoint)
    }

    fn backend_health_url(&self, project: &str, backend: &BackendRef) -> String {
        match &backend.region {
            Some(region) => format!(
                "{}/projects/{project}/regions/{region}/backendServices/{}/getHealth",
                self.endpoint, backend.name
            ),
            None => format!(
                "{}/projects/{project}/global/backendServices/{}/getHealth",
                self.endpoint, backend.name
            ),
        }
    }

    fn aggregated_backends_url(&self, project: &str) -> String {
        format!("{}/projects/{project}/aggregated/backendServices", self.endpoint)
    }

    async fn request(&self, method: Method, url: &str, operation: &'static str) -> FleetResult<RequestBuilder> {
        let token = self.tokens.token().await?;
        debug!(%method, %url, operation, "compute API request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    /// Send `req` and decode a JSON body, mapping 404 to `NotFound`.
    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        operation: &'static str,
        kind: &'static str,
        name: &str,
    ) -> FleetResult<T> {
        let resp = req.send().await.map_err(|e| FleetError::api(operation, e))?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FleetError::not_found(kind, name));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FleetError::api(operation, format!("HTTP {status}: {}", body.trim())));
        }

        resp.json().await.map_err(|e| FleetError::api(operation, e))
    }
}

impl FleetApi for GceFleetApi {
    async fn get_group(
        &self,
        project: &str,
        location: &Location,
        name: &str,
    ) -> FleetResult<FleetSnapshot> {
        const OP: &str = "retrieve instance group information";
        location.validate()?;

        let url = self.group_url(project, location, name);
        let req = self.request(Method::GET, &url, OP).await?;
        let igm: InstanceGroupManager = self.send(req, OP, "instance group", name).await?;
        Ok(igm.into())
    }

    async fn list_group_instances(
        &self,
        project: &str,
        location: &Location,
        name: &str,
    ) -> FleetResult<Vec<ManagedInstance>> {
        const OP: &str = "list managed instances";
        location.validate()?;

        let url = format!("{}/listManagedInstances", self.group_url(project, location, name));
        let body = serde_json::json!({});
        let (url, body) = (url.as_str(), &body);
        let mut instances = Vec::new();

        walk_pages(
            move |token| async move {
                let req = self.request(Method::POST, url, OP).await?;
                let req = with_page_token(req, token.as_deref()).json(body);
                self.send::<ListManagedInstancesPage>(req, OP, "instance group", name)
                    .await
            },
            |page: ListManagedInstancesPage| {
                instances.extend(page.managed_instances.into_iter().map(ManagedInstance::from));
                ControlFlow::<()>::Continue(())
            },
        )
        .await?;

        debug!(group = name, count = instances.len(), "listed managed instances");
        Ok(instances)
    }

    async fn patch_group(
        &self,
        project: &str,
        location: &Location,
        name: &str,
        patch: &FleetPatch,
    ) -> FleetResult<()> {
        const OP: &str = "update instance templates in instance group";
        location.validate()?;

        let url = self.group_url(project, location, name);
        let body = InstanceGroupManagerPatch::from(patch);
        let req = self.request(Method::PATCH, &url, OP).await?.json(&body);

        // The response is a long-running operation; convergence is observed
        // through the group's status instead.
        let _operation: serde_json::Value = self.send(req, OP, "instance group", name).await?;
        Ok(())
    }

    async fn get_template(&self, project: &str, name: &str) -> FleetResult<TemplateRef> {
        const OP: &str = "retrieve instance template information";

        let url = self.template_url(project, name);
        let req = self.request(Method::GET, &url, OP).await?;
        let template: InstanceTemplate = self.send(req, OP, "instance template", name).await?;
        Ok(template.into())
    }

    async fn find_backend_for_group(
        &self,
        project: &str,
        group: &FleetSnapshot,
    ) -> FleetResult<BackendRef> {
        const OP: &str = "list backend services in project";

        let url = self.aggregated_backends_url(project);
        let url = url.as_str();
        let found = walk_pages(
            move |token| async move {
                let req = self.request(Method::GET, url, OP).await?;
                let req = with_page_token(req, token.as_deref());
                self.send::<BackendServiceAggregatedPage>(req, OP, "project", project)
                    .await
            },
            |page: BackendServiceAggregatedPage| match page.find_serving(&group.instance_group) {
                Some(service) => ControlFlow::Break(service),
                None => ControlFlow::Continue(()),
            },
        )
        .await?;

        if let Some(service) = found {
            info!(backend = %service.name, group = %group.name, "found backend service");
            return Ok(service.into());
        }

        Err(FleetError::not_found(
            "backend service containing instance group",
            &group.name,
        ))
    }

    async fn get_backend_health(
        &self,
        project: &str,
        backend: &BackendRef,
        group: &FleetSnapshot,
    ) -> FleetResult<HealthRecord> {
        const OP: &str = "get health of backend service group";

        let url = self.backend_health_url(project, backend);
        let body = ResourceGroupReference {
            group: group.instance_group.clone(),
        };
        let req = self.request(Method::POST, &url, OP).await?.json(&body);
        let health: BackendServiceGroupHealth =
            self.send(req, OP, "backend service", &backend.name).await?;
        Ok(health.into())
    }
}
