//! Feature density provider
//!
//! Counts the features of an ArcGIS layer inside a small envelope around the
//! site and maps the count onto a risk level. The default configuration
//! targets the USFWS National Wetlands Inventory: wetlands close to a parcel
//! are a proxy for flood exposure where no zone data responded.

use super::arcgis::{envelope_filter, ArcGisClient, CountResponse, HttpSettings};
use super::into_outcome;
use crate::types::{
    BoundingBox, Confidence, ProviderError, ProviderOutcome, RiskLabel, SiteRecord,
    SourceProvider, SourceResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use siteguard_common::{Error, Result};

/// National Wetlands Inventory polygons
pub const DEFAULT_WETLANDS_URL: &str =
    "https://fwspublicservices.wim.usgs.gov/wetlandsmapservice/rest/services/Wetlands/MapServer/0/query";

/// Envelope half-size in degrees (~0.35 mi of latitude)
pub const DEFAULT_ENVELOPE_DEGREES: f64 = 0.005;

/// Count threshold: `min_count` or more features yields `label`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityRule {
    pub min_count: u64,
    pub label: String,
}

impl DensityRule {
    pub fn new(min_count: u64, label: impl Into<String>) -> Self {
        Self {
            min_count,
            label: label.into(),
        }
    }
}

pub fn default_wetland_rules() -> Vec<DensityRule> {
    vec![
        DensityRule::new(5, "High"),
        DensityRule::new(1, "Moderate"),
        DensityRule::new(0, "Minimal"),
    ]
}

/// Map a feature count onto the first rule it satisfies
///
/// Rules are evaluated from the highest `min_count` down.
pub fn classify_count(count: u64, rules: &[DensityRule]) -> Option<&DensityRule> {
    rules.iter().find(|rule| count >= rule.min_count)
}

pub struct FeatureDensityProvider {
    name: String,
    client: ArcGisClient,
    url: String,
    envelope_degrees: f64,
    rules: Vec<DensityRule>,
}

impl FeatureDensityProvider {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        envelope_degrees: f64,
        mut rules: Vec<DensityRule>,
        settings: &HttpSettings,
    ) -> Result<Self> {
        let name = name.into();
        if rules.is_empty() {
            return Err(Error::Config(format!("provider '{}' has no density rules", name)));
        }
        if let Some(rule) = rules.iter().find(|r| r.label.trim().is_empty()) {
            return Err(Error::Config(format!(
                "provider '{}' has a rule with empty label (min_count {})",
                name, rule.min_count
            )));
        }
        if !envelope_degrees.is_finite() || envelope_degrees <= 0.0 || envelope_degrees > 1.0 {
            return Err(Error::Config(format!(
                "provider '{}' envelope must be within (0, 1] degrees, got {}",
                name, envelope_degrees
            )));
        }
        rules.sort_by(|a, b| b.min_count.cmp(&a.min_count));

        let client = ArcGisClient::new(settings).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            name,
            client,
            url: url.into(),
            envelope_degrees,
            rules,
        })
    }

    pub fn rules(&self) -> &[DensityRule] {
        &self.rules
    }

    fn envelope(&self, record: &SiteRecord) -> BoundingBox {
        let bounds = record.site.bounds();
        BoundingBox {
            min_lat: (bounds.min_lat - self.envelope_degrees).max(-90.0),
            max_lat: (bounds.max_lat + self.envelope_degrees).min(90.0),
            min_lon: (bounds.min_lon - self.envelope_degrees).max(-180.0),
            max_lon: (bounds.max_lon + self.envelope_degrees).min(180.0),
        }
    }

    async fn lookup(
        &self,
        record: &SiteRecord,
    ) -> std::result::Result<Option<SourceResult>, ProviderError> {
        let mut params = envelope_filter(self.envelope(record));
        params.push(("returnCountOnly", "true".to_string()));

        let response: CountResponse = self.client.query(&self.url, &params).await?;
        let count = response
            .count
            .ok_or_else(|| ProviderError::Parse("response has no count".to_string()))?;

        Ok(classify_count(count, &self.rules).map(|rule| SourceResult {
            label: RiskLabel::RiskLevel(rule.label.clone()),
            confidence: Confidence::Medium,
            raw: json!({
                "feature_count": count,
                "envelope_degrees": self.envelope_degrees,
            }),
            source_name: self.name.clone(),
        }))
    }
}

#[async_trait]
impl SourceProvider for FeatureDensityProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, record: &SiteRecord) -> ProviderOutcome {
        into_outcome(&self.name, record, self.lookup(record).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::arcgis::parse_response;
    use crate::types::Site;
    use std::time::Duration;

    #[test]
    fn test_classify_count_default_rules() {
        let rules = default_wetland_rules();
        assert_eq!(classify_count(0, &rules).unwrap().label, "Minimal");
        assert_eq!(classify_count(3, &rules).unwrap().label, "Moderate");
        assert_eq!(classify_count(12, &rules).unwrap().label, "High");
    }

    #[test]
    fn test_classify_count_without_floor_rule() {
        let rules = vec![DensityRule::new(2, "Moderate")];
        assert!(classify_count(1, &rules).is_none());
    }

    #[test]
    fn test_parse_count_response() {
        let response: CountResponse = parse_response(r#"{"count":7}"#).unwrap();
        assert_eq!(response.count, Some(7));
    }

    #[test]
    fn test_rules_sorted_descending() {
        let provider = FeatureDensityProvider::new(
            "wetlands",
            DEFAULT_WETLANDS_URL,
            DEFAULT_ENVELOPE_DEGREES,
            vec![DensityRule::new(0, "Minimal"), DensityRule::new(5, "High")],
            &HttpSettings::default(),
        )
        .unwrap();
        assert_eq!(provider.rules()[0].min_count, 5);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let settings = HttpSettings::default();
        assert!(FeatureDensityProvider::new("w", DEFAULT_WETLANDS_URL, 0.005, vec![], &settings).is_err());
        assert!(FeatureDensityProvider::new(
            "w",
            DEFAULT_WETLANDS_URL,
            0.0,
            default_wetland_rules(),
            &settings
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_no_data() {
        let settings = HttpSettings {
            timeout: Duration::from_secs(2),
            ..HttpSettings::default()
        };
        let provider = FeatureDensityProvider::new(
            "wetlands",
            "http://127.0.0.1:9/query",
            DEFAULT_ENVELOPE_DEGREES,
            default_wetland_rules(),
            &settings,
        )
        .unwrap();
        let record = SiteRecord::new("parcel-1", Site::point(29.76, -95.37));

        assert_eq!(provider.query(&record).await, ProviderOutcome::NoData);
    }
}
