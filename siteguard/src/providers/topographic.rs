//! Topographic model provider
//!
//! Last-resort fallback using coarse latitude/longitude bands (low-lying
//! coastal plains, river deltas, interior uplands). Confidence is always Low.

use super::into_outcome;
use crate::types::{
    BoundingBox, Confidence, ProviderError, ProviderOutcome, RiskLabel, SiteRecord,
    SourceProvider, SourceResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use siteguard_common::{Error, Result};

pub const PROVIDER_NAME: &str = "topographic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopographicBand {
    pub name: String,
    pub bounds: BoundingBox,
    pub label: String,
}

impl TopographicBand {
    fn new(name: &str, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64, label: &str) -> Self {
        Self {
            name: name.to_string(),
            bounds: BoundingBox {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            },
            label: label.to_string(),
        }
    }
}

/// Coarse contiguous-US bands; earlier bands take precedence
pub fn default_bands() -> Vec<TopographicBand> {
    vec![
        TopographicBand::new("Mississippi Delta", 29.0, 33.0, -92.0, -89.5, "High"),
        TopographicBand::new("South Florida", 24.5, 27.5, -82.0, -80.0, "High"),
        TopographicBand::new("Gulf Coastal Plain", 25.0, 31.0, -98.0, -80.0, "Moderate"),
        TopographicBand::new("Atlantic Coastal Plain", 31.0, 39.5, -81.5, -74.5, "Moderate"),
        TopographicBand::new("Pacific Coast", 32.5, 48.5, -124.8, -122.0, "Moderate"),
        TopographicBand::new("Interior", 24.5, 49.5, -124.8, -66.9, "Low"),
    ]
}

pub struct TopographicModelProvider {
    bands: Vec<TopographicBand>,
}

impl Default for TopographicModelProvider {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

impl TopographicModelProvider {
    pub fn new(bands: Vec<TopographicBand>) -> Result<Self> {
        if let Some(band) = bands.iter().find(|b| !b.bounds.is_valid()) {
            return Err(Error::Config(format!(
                "topographic band '{}' has invalid bounds",
                band.name
            )));
        }
        Ok(Self { bands })
    }

    fn lookup(&self, record: &SiteRecord) -> Option<SourceResult> {
        let centroid = record.site.centroid();
        let band = self.bands.iter().find(|b| b.bounds.contains(centroid))?;

        Some(SourceResult {
            label: RiskLabel::RiskLevel(band.label.clone()),
            confidence: Confidence::Low,
            raw: json!({
                "band": band.name,
                "lat": centroid.lat,
                "lon": centroid.lon,
            }),
            source_name: PROVIDER_NAME.to_string(),
        })
    }
}

#[async_trait]
impl SourceProvider for TopographicModelProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn query(&self, record: &SiteRecord) -> ProviderOutcome {
        into_outcome(PROVIDER_NAME, record, Ok::<_, ProviderError>(self.lookup(record)))
    }
}
