//! Risk tier classification
//!
//! Maps a distance (plus a containment flag) onto an ordered tier using a
//! configurable threshold table. Two tables ship as presets:
//! - **Five-tier:** ON-SITE, ADJACENT (500 ft), NEAR (1/4 mi), OFF-SITE (1/2 mi),
//!   DISTANT (1 mi)
//! - **ASTM:** ON-SITE, ADJACENT (500 ft), NEAR OFF-SITE (1/8 mi), OFF-SITE
//!   (1/4 mi), DISTANT (1/2 mi), REGIONAL (1 mi)
//!
//! ON-SITE is assigned from containment alone. Distances beyond the loosest
//! band classify as OUT-OF-RANGE, which is not a statement of safety.

use serde::{Deserialize, Serialize};
use siteguard_common::units::feet_to_miles;
use siteguard_common::{Error, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

pub const ON_SITE: &str = "ON-SITE";
pub const OUT_OF_RANGE: &str = "OUT-OF-RANGE";

const OUT_OF_RANGE_SEVERITY: u8 = u8::MAX;

/// Ordered risk tier; lower severity value means more severe
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RiskTier {
    name: String,
    severity: u8,
}

impl RiskTier {
    pub fn on_site() -> Self {
        Self {
            name: ON_SITE.to_string(),
            severity: 0,
        }
    }

    pub fn out_of_range() -> Self {
        Self {
            name: OUT_OF_RANGE.to_string(),
            severity: OUT_OF_RANGE_SEVERITY,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0 for ON-SITE, 1.. for distance bands, 255 for OUT-OF-RANGE
    pub fn severity(&self) -> u8 {
        self.severity
    }

    pub fn is_on_site(&self) -> bool {
        self.severity == 0
    }

    pub fn is_out_of_range(&self) -> bool {
        self.severity == OUT_OF_RANGE_SEVERITY
    }

    /// True when this tier is as severe as `other` or more
    pub fn at_or_above(&self, other: &RiskTier) -> bool {
        self.severity <= other.severity
    }
}

impl Ord for RiskTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for RiskTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One distance band: (tier name, inclusive max distance in miles)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub name: String,
    pub max_miles: f64,
}

impl ThresholdBand {
    pub fn new(name: impl Into<String>, max_miles: f64) -> Self {
        Self {
            name: name.into(),
            max_miles,
        }
    }
}

/// Distance bands in severity order (most severe first)
///
/// Validated at construction: non-empty, unique names, no reserved names,
/// finite non-negative distances, non-decreasing in severity order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTable {
    bands: Vec<ThresholdBand>,
}

impl ThresholdTable {
    pub fn new(bands: Vec<ThresholdBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::Config("threshold table is empty".to_string()));
        }
        if bands.len() >= usize::from(OUT_OF_RANGE_SEVERITY) {
            return Err(Error::Config(format!(
                "threshold table has {} bands, limit is {}",
                bands.len(),
                OUT_OF_RANGE_SEVERITY - 1
            )));
        }

        let mut seen = HashSet::new();
        let mut previous = 0.0_f64;
        for band in &bands {
            let name = band.name.trim();
            if name.is_empty() {
                return Err(Error::Config("threshold band with empty name".to_string()));
            }
            if name.eq_ignore_ascii_case(ON_SITE) || name.eq_ignore_ascii_case(OUT_OF_RANGE) {
                return Err(Error::Config(format!("tier name '{}' is reserved", name)));
            }
            if !seen.insert(name.to_ascii_uppercase()) {
                return Err(Error::Config(format!("duplicate tier name '{}'", name)));
            }
            if !band.max_miles.is_finite() || band.max_miles < 0.0 {
                return Err(Error::Config(format!(
                    "tier '{}' has invalid max distance {}",
                    name, band.max_miles
                )));
            }
            if band.max_miles < previous {
                return Err(Error::Config(format!(
                    "tier '{}' max distance {} is below the previous tier's {}; \
                     distances must be non-decreasing in severity order",
                    name, band.max_miles, previous
                )));
            }
            previous = band.max_miles;
        }

        Ok(Self { bands })
    }

    /// ADJACENT 500 ft, NEAR 1/4 mi, OFF-SITE 1/2 mi, DISTANT 1 mi
    pub fn five_tier() -> Self {
        Self {
            bands: vec![
                ThresholdBand::new("ADJACENT", feet_to_miles(500.0)),
                ThresholdBand::new("NEAR", 0.25),
                ThresholdBand::new("OFF-SITE", 0.5),
                ThresholdBand::new("DISTANT", 1.0),
            ],
        }
    }

    /// ASTM-style table with the extra NEAR OFF-SITE band at 1/8 mile
    pub fn astm() -> Self {
        Self {
            bands: vec![
                ThresholdBand::new("ADJACENT", feet_to_miles(500.0)),
                ThresholdBand::new("NEAR OFF-SITE", 0.125),
                ThresholdBand::new("OFF-SITE", 0.25),
                ThresholdBand::new("DISTANT", 0.5),
                ThresholdBand::new("REGIONAL", 1.0),
            ],
        }
    }

    pub fn bands(&self) -> &[ThresholdBand] {
        &self.bands
    }

    fn band_tier(&self, index: usize) -> RiskTier {
        RiskTier {
            name: self.bands[index].name.clone(),
            // Bounded by the band limit checked in `new`
            severity: (index + 1) as u8,
        }
    }

    /// Every tier of this table, most severe first, including ON-SITE and
    /// OUT-OF-RANGE
    pub fn tiers(&self) -> Vec<RiskTier> {
        let mut tiers = Vec::with_capacity(self.bands.len() + 2);
        tiers.push(RiskTier::on_site());
        tiers.extend((0..self.bands.len()).map(|i| self.band_tier(i)));
        tiers.push(RiskTier::out_of_range());
        tiers
    }

    /// Look up a tier by name (case-insensitive)
    pub fn tier(&self, name: &str) -> Option<RiskTier> {
        let name = name.trim();
        self.tiers()
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn classify(&self, distance_miles: f64, inside_polygon: bool) -> RiskTier {
        classify(distance_miles, inside_polygon, self)
    }
}

/// Classify a distance against a threshold table
///
/// Containment always yields ON-SITE. Otherwise the first band whose max
/// distance covers `distance_miles` wins; nothing matching (including NaN)
/// yields OUT-OF-RANGE.
pub fn classify(distance_miles: f64, inside_polygon: bool, table: &ThresholdTable) -> RiskTier {
    if inside_polygon {
        return RiskTier::on_site();
    }
    table
        .bands
        .iter()
        .position(|band| distance_miles <= band.max_miles)
        .map(|i| table.band_tier(i))
        .unwrap_or_else(RiskTier::out_of_range)
}
