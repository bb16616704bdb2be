//! Regional heuristic provider
//!
//! One provider per geographic sub-region (typically a county). When the
//! site falls inside the region, simple coordinate-range rules assign a coarse
//! risk level. Used as a fallback when no authoritative source responded, so
//! confidence is capped at Medium.

use super::into_outcome;
use crate::types::{
    BoundingBox, Confidence, ProviderError, ProviderOutcome, RiskLabel, SiteRecord,
    SourceProvider, SourceResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use siteguard_common::{Error, Result};

/// Coordinate-range rule inside a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionZone {
    pub name: String,
    pub bounds: BoundingBox,
    pub label: String,
    #[serde(default = "default_zone_confidence")]
    pub confidence: Confidence,
}

fn default_zone_confidence() -> Confidence {
    Confidence::Medium
}

/// Configured region: bounds, rules and the fallback label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDefinition {
    pub name: String,
    pub bounds: BoundingBox,
    #[serde(default)]
    pub zones: Vec<RegionZone>,
    #[serde(default)]
    pub fallback_label: Option<String>,
}

impl RegionDefinition {
    pub fn build(&self) -> Result<RegionalHeuristicProvider> {
        RegionalHeuristicProvider::new(
            self.name.clone(),
            self.bounds,
            self.zones.clone(),
            self.fallback_label.clone(),
        )
    }
}

fn bbox(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> BoundingBox {
    BoundingBox {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}

/// Compiled-in regions
pub fn default_regions() -> Vec<RegionDefinition> {
    vec![
        RegionDefinition {
            name: "Harris County, TX".to_string(),
            bounds: bbox(29.5, 30.2, -95.9, -94.9),
            zones: vec![RegionZone {
                name: "Ship Channel".to_string(),
                bounds: bbox(29.6, 29.8, -95.3, -94.9),
                label: "High".to_string(),
                confidence: Confidence::Medium,
            }],
            fallback_label: Some("Moderate".to_string()),
        },
        RegionDefinition {
            name: "Miami-Dade County, FL".to_string(),
            bounds: bbox(25.1, 25.98, -80.9, -80.1),
            zones: vec![RegionZone {
                name: "Biscayne Bay shoreline".to_string(),
                bounds: bbox(25.1, 25.98, -80.25, -80.1),
                label: "High".to_string(),
                confidence: Confidence::Medium,
            }],
            fallback_label: Some("Moderate".to_string()),
        },
    ]
}

pub struct RegionalHeuristicProvider {
    name: String,
    region: String,
    bounds: BoundingBox,
    zones: Vec<RegionZone>,
    /// Label for sites inside the region but outside every zone
    fallback_label: Option<String>,
}

impl RegionalHeuristicProvider {
    /// Build a regional provider
    ///
    /// Fails if any rule claims High confidence or any box is malformed.
    pub fn new(
        region: impl Into<String>,
        bounds: BoundingBox,
        zones: Vec<RegionZone>,
        fallback_label: Option<String>,
    ) -> Result<Self> {
        let region = region.into();
        if !bounds.is_valid() {
            return Err(Error::Config(format!("region '{}' has invalid bounds", region)));
        }
        for zone in &zones {
            if zone.confidence > Confidence::Medium {
                return Err(Error::Config(format!(
                    "region '{}' zone '{}' claims {} confidence; regional heuristics are capped at Medium",
                    region, zone.name, zone.confidence
                )));
            }
            if !zone.bounds.is_valid() {
                return Err(Error::Config(format!(
                    "region '{}' zone '{}' has invalid bounds",
                    region, zone.name
                )));
            }
        }

        Ok(Self {
            name: format!("regional:{}", region),
            region,
            bounds,
            zones,
            fallback_label: fallback_label.filter(|l| !l.trim().is_empty()),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn lookup(&self, record: &SiteRecord) -> Option<SourceResult> {
        let centroid = record.site.centroid();
        if !self.bounds.contains(centroid) {
            return None;
        }

        let (zone_name, label, confidence) = match self.zones.iter().find(|z| z.bounds.contains(centroid)) {
            Some(zone) => (Some(zone.name.as_str()), zone.label.clone(), zone.confidence),
            None => (None, self.fallback_label.clone()?, Confidence::Low),
        };

        Some(SourceResult {
            label: RiskLabel::RiskLevel(label),
            confidence,
            raw: json!({
                "region": self.region,
                "zone": zone_name,
                "lat": centroid.lat,
                "lon": centroid.lon,
            }),
            source_name: self.name.clone(),
        })
    }
}

#[async_trait]
impl SourceProvider for RegionalHeuristicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, record: &SiteRecord) -> ProviderOutcome {
        into_outcome(&self.name, record, Ok::<_, ProviderError>(self.lookup(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Site;

    fn harris() -> RegionalHeuristicProvider {
        RegionalHeuristicProvider::new(
            "Harris County, TX",
            bbox(29.5, 30.2, -95.9, -94.9),
            vec![RegionZone {
                name: "Ship Channel".to_string(),
                bounds: bbox(29.6, 29.8, -95.3, -94.9),
                label: "High".to_string(),
                confidence: Confidence::Medium,
            }],
            Some("Moderate".to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_zone_match() {
        let record = SiteRecord::new("p", Site::point(29.7, -95.1));
        match harris().query(&record).await {
            ProviderOutcome::Found(result) => {
                assert_eq!(result.label, RiskLabel::RiskLevel("High".to_string()));
                assert_eq!(result.confidence, Confidence::Medium);
                assert_eq!(result.source_name, "regional:Harris County, TX");
                assert_eq!(result.raw["zone"], "Ship Channel");
            }
            ProviderOutcome::NoData => panic!("expected zone match"),
        }
    }

    #[tokio::test]
    async fn test_region_fallback_is_low_confidence() {
        let record = SiteRecord::new("p", Site::point(30.0, -95.6));
        match harris().query(&record).await {
            ProviderOutcome::Found(result) => {
                assert_eq!(result.label, RiskLabel::RiskLevel("Moderate".to_string()));
                assert_eq!(result.confidence, Confidence::Low);
            }
            ProviderOutcome::NoData => panic!("expected fallback"),
        }
    }

    #[tokio::test]
    async fn test_outside_region_is_no_data() {
        let record = SiteRecord::new("p", Site::point(34.05, -118.24));
        assert_eq!(harris().query(&record).await, ProviderOutcome::NoData);
    }

    #[test]
    fn test_default_regions_build() {
        let providers: Vec<_> = default_regions()
            .iter()
            .map(|r| r.build().unwrap())
            .collect();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].region(), "Harris County, TX");
    }

    #[test]
    fn test_high_confidence_rule_rejected() {
        let result = RegionalHeuristicProvider::new(
            "Somewhere",
            bbox(0.0, 1.0, 0.0, 1.0),
            vec![RegionZone {
                name: "z".to_string(),
                bounds: bbox(0.0, 0.5, 0.0, 0.5),
                label: "High".to_string(),
                confidence: Confidence::High,
            }],
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
