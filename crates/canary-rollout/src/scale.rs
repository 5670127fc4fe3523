//! Canary sizing and the done-check.
//!
//! Both functions are pure: they look at a fleet snapshot and the target
//! template and never touch the control plane.

use canary_core::{
    FleetPatch, FleetSnapshot, FleetVersion, RolloutError, RolloutResult, TemplateRef,
    UpdatePolicy, UpdateType,
};
use tracing::{debug, warn};

/// Outcome of one scaling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalePlan {
    /// Fixed size of the canary slice before this step (0 if none).
    pub old_canary_size: u32,
    /// Canary size after this step, clamped to the group's target size.
    pub new_canary_size: u32,
    /// Whether this step moves the whole group onto the target template.
    pub collapses: bool,
    pub patch: FleetPatch,
}

/// Compute the next canary step for `fleet`.
///
/// The slice running `template` is the current canary. Among the other
/// slices exactly one must be untagged; it is the primary. A slice tagged
/// as canary but running some other template is a leftover from an
/// earlier rollout and is dropped.
pub fn plan_scale(fleet: &FleetSnapshot, template: &TemplateRef) -> RolloutResult<ScalePlan> {
    let mut primary: Option<&str> = None;
    let mut old_canary_size = 0;

    for version in &fleet.versions {
        if version.template == template.self_link {
            if let Some(size) = version.fixed_size().filter(|n| *n > 0) {
                debug!(size, "found existing canary deployment");
                old_canary_size = old_canary_size.max(size);
            }
            continue;
        }

        if version.is_canary_tagged() {
            warn!(
                stale_template = %version.template,
                "dropping canary slice that runs a different template"
            );
            continue;
        }

        if let Some(first) = primary {
            return Err(RolloutError::AmbiguousPrimary {
                first: first.to_string(),
                second: version.template.clone(),
            });
        }
        primary = Some(version.template.as_str());
    }

    let primary = primary.ok_or(RolloutError::MissingPrimary)?;

    let mut new_canary_size = if old_canary_size == 0 {
        1
    } else {
        old_canary_size.saturating_mul(2)
    };

    let collapses = new_canary_size >= fleet.target_size;
    let versions = if collapses {
        new_canary_size = fleet.target_size;
        vec![FleetVersion::primary(&template.self_link)]
    } else {
        vec![
            FleetVersion::primary(primary),
            FleetVersion::canary(&template.self_link, new_canary_size),
        ]
    };

    // Regional groups reject a fixed surge between 0 and the zone count.
    let max_surge = new_canary_size
        .saturating_sub(old_canary_size)
        .max(fleet.zone_count());

    Ok(ScalePlan {
        old_canary_size,
        new_canary_size,
        collapses,
        patch: FleetPatch {
            versions,
            update_policy: UpdatePolicy {
                kind: UpdateType::Proactive,
                max_surge,
                max_unavailable: 0,
            },
        },
    })
}

/// True once the group runs `template` and nothing else.
pub fn is_done(fleet: &FleetSnapshot, template: &TemplateRef) -> bool {
    matches!(fleet.versions.as_slice(), [only] if only.template == template.self_link)
}
