//! canary-rollout — health-gated canary rollout of an instance template.
//!
//! Drives a managed instance group from its current template to a new
//! one by repeatedly doubling a canary slice, waiting for the group to
//! converge, and checking that no canary instance is unhealthy behind
//! the load balancer.
//!
//! # State Machine
//!
//! ```text
//! initialize ──► scale ──► wait for stability ──► health gate ──► done?
//!                  ▲                                               │ no
//!                  └───────────────────────────────────────────────┘
//! ```
//!
//! Canary sizes grow 1, 2, 4, 8, ... until doubling meets the group's
//! target size, at which point the group collapses onto the new template
//! alone. Every error is fatal; the only internal retry is the bounded
//! stability poll. Already-applied steps are never rolled back.
//!
//! # Components
//!
//! - **`api`** — `FleetApi`, the control-plane capability the orchestrator needs
//! - **`scale`** — pure canary sizing and patch construction, done-check
//! - **`stability`** — bounded convergence poll
//! - **`health`** — canary health gate
//! - **`clock`** — injectable sleeper and cancellation handle
//! - **`orchestrator`** — the rollout loop

pub mod api;
pub mod clock;
pub mod health;
pub mod orchestrator;
pub mod scale;
pub mod stability;

#[cfg(test)]
mod fake;

pub use api::FleetApi;
pub use clock::{Shutdown, Sleeper, TokioSleeper};
pub use orchestrator::{Orchestrator, RolloutSummary};
pub use scale::{is_done, plan_scale, ScalePlan};
