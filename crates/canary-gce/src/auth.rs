//! Access-token acquisition for the Compute Engine API.
//!
//! An explicit `GOOGLE_OAUTH_ACCESS_TOKEN` wins. Otherwise application
//! default credentials are resolved through `gcp_auth`, which tries
//! `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud user credentials, and the
//! metadata server in turn and refreshes tokens before they expire.

use std::sync::Arc;

use canary_core::{FleetError, FleetResult};
use gcp_auth::TokenProvider;
use tracing::debug;

/// Environment variable holding a pre-issued OAuth access token.
pub const TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// OAuth scope covering every Compute Engine call the rollout makes.
pub const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

/// Where bearer tokens come from.
pub struct TokenSource {
    kind: SourceKind,
}

enum SourceKind {
    /// A fixed token, never refreshed.
    Static(String),
    /// Application default credentials; caching and refresh are the
    /// provider's.
    Provider(Arc<dyn TokenProvider>),
}

impl TokenSource {
    /// Use `GOOGLE_OAUTH_ACCESS_TOKEN` if set, otherwise application
    /// default credentials.
    pub async fn from_env() -> FleetResult<Self> {
        if let Some(token) = explicit_token(std::env::var(TOKEN_ENV_VAR).ok()) {
            return Ok(Self::fixed(token));
        }

        let provider = gcp_auth::provider()
            .await
            .map_err(|e| FleetError::api("load application default credentials", e))?;
        Ok(Self::from_provider(provider))
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Static(token.into()),
        }
    }

    pub fn from_provider(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            kind: SourceKind::Provider(provider),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self.kind {
            SourceKind::Static(_) => TOKEN_ENV_VAR,
            SourceKind::Provider(_) => "application default credentials",
        }
    }

    /// Current bearer token.
    pub async fn token(&self) -> FleetResult<String> {
        match &self.kind {
            SourceKind::Static(token) => Ok(token.clone()),
            SourceKind::Provider(provider) => {
                let token = provider
                    .token(&[COMPUTE_SCOPE])
                    .await
                    .map_err(|e| FleetError::api("obtain access token", e))?;
                debug!(scope = COMPUTE_SCOPE, "obtained access token");
                Ok(token.as_str().to_string())
            }
        }
    }
}

/// A non-blank override token, trimmed.
fn explicit_token(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        let source = TokenSource::fixed("ya29.abc");
        assert_eq!(source.token().await.unwrap(), "ya29.abc");
        assert_eq!(source.describe(), TOKEN_ENV_VAR);
    }

    #[test]
    fn override_token_is_trimmed() {
        assert_eq!(
            explicit_token(Some("  ya29.abc\n".to_string())),
            Some("ya29.abc".to_string())
        );
    }

    #[test]
    fn blank_override_falls_through_to_credentials() {
        assert_eq!(explicit_token(None), None);
        assert_eq!(explicit_token(Some("   ".to_string())), None);
    }
}
