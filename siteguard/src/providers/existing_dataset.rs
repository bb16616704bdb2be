//! Existing dataset provider
//!
//! Consults fields the caller already holds for a site (a prior flood
//! screening column set). Data counts as reliable only when the hazard
//! presence flag AND at least one of the risk area / zone code fields are
//! populated; anything less defers to the next provider.
//!
//! A set presence flag is authoritative: when the zone or area alone would
//! not read as a hazard hit, the result is labeled "High Risk" so the site
//! is never kept on weaker evidence than the caller's own flag.

use super::into_outcome;
use crate::flood_zone;
use crate::types::{
    Confidence, ProviderError, ProviderOutcome, RiskLabel, SiteRecord, SourceProvider,
    SourceResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const PROVIDER_NAME: &str = "existing_dataset";

/// Column names consulted on the input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingDatasetFields {
    /// Boolean hazard presence flag
    #[serde(default = "default_presence_field")]
    pub presence_field: String,
    /// Risk area description ("High Risk", "Minimal Risk")
    #[serde(default = "default_area_field")]
    pub area_field: String,
    /// Flood zone code ("AE", "X")
    #[serde(default = "default_zone_field")]
    pub zone_field: String,
}

impl Default for ExistingDatasetFields {
    fn default() -> Self {
        Self {
            presence_field: default_presence_field(),
            area_field: default_area_field(),
            zone_field: default_zone_field(),
        }
    }
}

fn default_presence_field() -> String {
    "In SFHA".to_string()
}

fn default_area_field() -> String {
    "Flood Risk Area".to_string()
}

fn default_zone_field() -> String {
    "FEMA Zone".to_string()
}

/// Label reported when the presence flag is set but zone and area disagree
pub const PRESENCE_LABEL: &str = "High Risk";

/// Parse a yes/no style flag; anything else is treated as unknown
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExistingDatasetProvider {
    fields: ExistingDatasetFields,
}

impl ExistingDatasetProvider {
    pub fn new(fields: ExistingDatasetFields) -> Self {
        Self { fields }
    }

    /// Whether the record already carries reliable hazard data
    pub fn is_reliable(&self, record: &SiteRecord) -> bool {
        self.lookup(record).is_some()
    }

    fn lookup(&self, record: &SiteRecord) -> Option<SourceResult> {
        let presence = record
            .field(&self.fields.presence_field)
            .and_then(parse_flag)?;
        let area = record.field(&self.fields.area_field);
        let zone = record.field(&self.fields.zone_field);

        let label = match (zone, area) {
            (Some(zone), _) => RiskLabel::ZoneCode(zone.to_string()),
            (None, Some(area)) => RiskLabel::RiskLevel(area.to_string()),
            (None, None) => return None,
        };
        let label = if presence && !is_hazard_hit(&label) {
            RiskLabel::RiskLevel(PRESENCE_LABEL.to_string())
        } else {
            label
        };

        Some(SourceResult {
            label,
            confidence: Confidence::High,
            raw: json!({
                "in_hazard_area": presence,
                "risk_area": area,
                "zone": zone,
            }),
            source_name: PROVIDER_NAME.to_string(),
        })
    }
}

fn is_hazard_hit(label: &RiskLabel) -> bool {
    match label {
        RiskLabel::ZoneCode(code) => flood_zone::is_sfha_zone(code),
        RiskLabel::RiskLevel(level) => flood_zone::is_high_risk_level(level),
        RiskLabel::Tier(_) => false,
    }
}

#[async_trait]
impl SourceProvider for ExistingDatasetProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn query(&self, record: &SiteRecord) -> ProviderOutcome {
        into_outcome(PROVIDER_NAME, record, Ok::<_, ProviderError>(self.lookup(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Site;

    fn record() -> SiteRecord {
        SiteRecord::new("parcel-1", Site::point(29.76, -95.37))
    }

    #[tokio::test]
    async fn test_reliable_with_presence_and_zone() {
        let provider = ExistingDatasetProvider::default();
        let rec = record().with_field("In SFHA", "Yes").with_field("FEMA Zone", "AE");

        match provider.query(&rec).await {
            ProviderOutcome::Found(result) => {
                assert_eq!(result.label, RiskLabel::ZoneCode("AE".to_string()));
                assert_eq!(result.confidence, Confidence::High);
                assert_eq!(result.source_name, PROVIDER_NAME);
                assert_eq!(result.raw["in_hazard_area"], true);
            }
            ProviderOutcome::NoData => panic!("expected reliable data"),
        }
    }

    #[tokio::test]
    async fn test_reliable_with_presence_and_area_only() {
        let provider = ExistingDatasetProvider::default();
        let rec = record()
            .with_field("In SFHA", "false")
            .with_field("Flood Risk Area", "Minimal Risk");

        match provider.query(&rec).await {
            ProviderOutcome::Found(result) => {
                assert_eq!(result.label, RiskLabel::RiskLevel("Minimal Risk".to_string()));
            }
            ProviderOutcome::NoData => panic!("expected reliable data"),
        }
    }

    #[tokio::test]
    async fn test_presence_overrides_moderate_area() {
        let provider = ExistingDatasetProvider::default();
        let rec = record()
            .with_field("In SFHA", "Yes")
            .with_field("Flood Risk Area", "Moderate Risk");

        match provider.query(&rec).await {
            ProviderOutcome::Found(result) => {
                assert_eq!(result.label, RiskLabel::RiskLevel(PRESENCE_LABEL.to_string()));
                assert_eq!(result.raw["risk_area"], "Moderate Risk");
            }
            ProviderOutcome::NoData => panic!("expected reliable data"),
        }
    }

    #[tokio::test]
    async fn test_presence_overrides_zone_x() {
        let provider = ExistingDatasetProvider::default();
        let rec = record().with_field("In SFHA", "y").with_field("FEMA Zone", "X");

        match provider.query(&rec).await {
            ProviderOutcome::Found(result) => {
                assert_eq!(result.label, RiskLabel::RiskLevel(PRESENCE_LABEL.to_string()));
                assert_eq!(result.raw["zone"], "X");
            }
            ProviderOutcome::NoData => panic!("expected reliable data"),
        }
    }

    #[tokio::test]
    async fn test_presence_alone_is_not_reliable() {
        let provider = ExistingDatasetProvider::default();
        let rec = record().with_field("In SFHA", "Yes");
        assert_eq!(provider.query(&rec).await, ProviderOutcome::NoData);
    }

    #[tokio::test]
    async fn test_unknown_presence_is_not_reliable() {
        let provider = ExistingDatasetProvider::default();
        let rec = record()
            .with_field("In SFHA", "Unknown")
            .with_field("FEMA Zone", "AE");
        assert_eq!(provider.query(&rec).await, ProviderOutcome::NoData);

        let rec = record()
            .with_field("In SFHA", "maybe")
            .with_field("FEMA Zone", "AE");
        assert!(!provider.is_reliable(&rec));
    }

    #[test]
    fn test_custom_field_names() {
        let provider = ExistingDatasetProvider::new(ExistingDatasetFields {
            presence_field: "sfha".to_string(),
            area_field: "risk".to_string(),
            zone_field: "zone".to_string(),
        });
        let rec = record().with_field("sfha", "1").with_field("zone", "X");
        assert!(provider.is_reliable(&rec));
    }
}
