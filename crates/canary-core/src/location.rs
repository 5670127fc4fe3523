//! Region-or-zone discriminator for managed instance groups.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};

/// Where a managed instance group lives: a whole region or a single zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Region(String),
    Zone(String),
}

impl Location {
    pub fn region(name: impl Into<String>) -> Self {
        Self::Region(name.into())
    }

    pub fn zone(name: impl Into<String>) -> Self {
        Self::Zone(name.into())
    }

    /// Build a location from optional region and zone inputs.
    ///
    /// Exactly one of the two must be present and non-blank.
    pub fn from_parts(region: Option<&str>, zone: Option<&str>) -> FleetResult<Self> {
        let region = region.map(str::trim).filter(|r| !r.is_empty());
        let zone = zone.map(str::trim).filter(|z| !z.is_empty());

        match (region, zone) {
            (Some(r), None) => Ok(Self::region(r)),
            (None, Some(z)) => Ok(Self::zone(z)),
            (Some(r), Some(z)) => Err(FleetError::Location(format!(
                "both region '{r}' and zone '{z}' specified, expected exactly one"
            ))),
            (None, None) => Err(FleetError::Location(
                "must specify either region or zone".to_string(),
            )),
        }
    }

    /// Reject locations whose identifier is blank.
    ///
    /// Every adapter operation calls this before touching the network.
    pub fn validate(&self) -> FleetResult<()> {
        if self.name().trim().is_empty() {
            return Err(FleetError::Location(format!(
                "{} identifier must not be empty",
                self.scope()
            )));
        }
        Ok(())
    }

    /// The region or zone identifier.
    pub fn name(&self) -> &str {
        match self {
            Self::Region(r) => r,
            Self::Zone(z) => z,
        }
    }

    /// "region" or "zone".
    pub fn scope(&self) -> &'static str {
        match self {
            Self::Region(_) => "region",
            Self::Zone(_) => "zone",
        }
    }

    pub fn is_regional(&self) -> bool {
        matches!(self, Self::Region(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_only() {
        let loc = Location::from_parts(Some("us-central1"), None).unwrap();
        assert_eq!(loc, Location::region("us-central1"));
        assert!(loc.is_regional());
    }

    #[test]
    fn zone_only() {
        let loc = Location::from_parts(None, Some("us-central1-a")).unwrap();
        assert_eq!(loc, Location::zone("us-central1-a"));
        assert_eq!(loc.to_string(), "zone/us-central1-a");
    }

    #[test]
    fn both_set_is_rejected() {
        let err = Location::from_parts(Some("us-central1"), Some("us-central1-a")).unwrap_err();
        assert!(matches!(err, FleetError::Location(_)));
    }

    #[test]
    fn neither_set_is_rejected() {
        assert!(matches!(
            Location::from_parts(None, None),
            Err(FleetError::Location(_))
        ));
        // Blank strings count as unset.
        assert!(matches!(
            Location::from_parts(Some("  "), Some("")),
            Err(FleetError::Location(_))
        ));
    }

    #[test]
    fn blank_identifier_fails_validation() {
        assert!(Location::region("").validate().is_err());
        assert!(Location::zone("europe-west1-b").validate().is_ok());
    }
}
