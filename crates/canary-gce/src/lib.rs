//! canary-gce — Google Compute Engine binding of the fleet control plane.
//!
//! Implements [`canary_rollout::FleetApi`] against the Compute Engine v1
//! REST API: regional and zonal managed instance groups, global instance
//! templates, and regional or global backend services.
//!
//! # Authentication
//!
//! A bearer token is taken from `GOOGLE_OAUTH_ACCESS_TOKEN` when set
//! (e.g. `gcloud auth print-access-token`), otherwise from application
//! default credentials: `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud user
//! credentials, or the metadata server of the VM the process runs on.

pub mod auth;
pub mod client;
pub mod paging;
pub mod wire;

pub use auth::TokenSource;
pub use client::{GceConfig, GceFleetApi};
