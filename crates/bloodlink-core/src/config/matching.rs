//! Donor selection configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tiered radius search and eligibility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Search radii in kilometres, tightest first. The last tier is the
    /// city-wide net.
    #[serde(default = "default_tiers")]
    pub tier_radii_km: Vec<f64>,
    /// Expand to the next tier while fewer candidates than this were found.
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,
    /// Donors who gave blood more recently than this are skipped.
    #[serde(default = "default_interval")]
    pub min_donation_interval_days: i64,
}

impl MatchingConfig {
    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.tier_radii_km.is_empty() {
            return Err(AppError::configuration(
                "matching.tier_radii_km needs at least one tier",
            ));
        }
        if self.tier_radii_km.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(AppError::configuration(
                "matching.tier_radii_km entries must be positive",
            ));
        }
        if self.tier_radii_km.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::configuration(
                "matching.tier_radii_km must be strictly increasing",
            ));
        }
        Ok(())
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tier_radii_km: default_tiers(),
            min_candidates: default_min_candidates(),
            min_donation_interval_days: default_interval(),
        }
    }
}

fn default_tiers() -> Vec<f64> {
    vec![10.0, 25.0, 50.0]
}

fn default_min_candidates() -> usize {
    5
}

fn default_interval() -> i64 {
    56
}
