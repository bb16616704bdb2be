//! FEMA National Flood Hazard Layer provider
//!
//! Queries the NFHL flood hazard zones layer (S_FLD_HAZ_AR) at the site and
//! reports the most severe `FLD_ZONE` returned.
//!
//! # API Reference
//! - Endpoint: https://hazards.fema.gov/arcgis/rest/services/public/NFHL/MapServer/28/query
//! - Point sites are queried as a point, polygon sites as their envelope.
//! - No features means the site lies outside mapped panels: no data.

use super::arcgis::{site_filter, ArcGisClient, Feature, FeatureSet, HttpSettings};
use super::into_outcome;
use crate::flood_zone;
use crate::types::{
    Confidence, ProviderError, ProviderOutcome, RiskLabel, SiteRecord, SourceProvider,
    SourceResult,
};
use async_trait::async_trait;
use serde_json::json;

pub const PROVIDER_NAME: &str = "fema_nfhl";

/// NFHL flood hazard zones layer
pub const DEFAULT_NFHL_URL: &str =
    "https://hazards.fema.gov/arcgis/rest/services/public/NFHL/MapServer/28/query";

const OUT_FIELDS: &str = "FLD_ZONE,ZONE_SUBTY,SFHA_TF";

pub struct FemaFloodZoneProvider {
    client: ArcGisClient,
    url: String,
}

impl FemaFloodZoneProvider {
    pub fn new(url: impl Into<String>, settings: &HttpSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: ArcGisClient::new(settings)?,
            url: url.into(),
        })
    }

    async fn lookup(&self, record: &SiteRecord) -> Result<Option<SourceResult>, ProviderError> {
        let mut params = site_filter(&record.site);
        params.push(("outFields", OUT_FIELDS.to_string()));
        params.push(("returnGeometry", "false".to_string()));

        let set: FeatureSet = self.client.query(&self.url, &params).await?;
        Ok(interpret(&set.features))
    }
}

/// Pick the most severe zone among the returned features
pub fn interpret(features: &[Feature]) -> Option<SourceResult> {
    let (zone, feature) = features
        .iter()
        .filter_map(|f| f.text("FLD_ZONE").map(|zone| (zone, f)))
        .min_by_key(|(zone, _)| flood_zone::zone_rank(zone))?;

    let raw = json!({
        "zone": zone,
        "zone_subtype": feature.text("ZONE_SUBTY"),
        "sfha": feature.text("SFHA_TF"),
        "risk_level": flood_zone::zone_risk_level(&zone),
        "feature_count": features.len(),
    });

    Some(SourceResult {
        raw,
        label: RiskLabel::ZoneCode(zone),
        confidence: Confidence::High,
        source_name: PROVIDER_NAME.to_string(),
    })
}

#[async_trait]
impl SourceProvider for FemaFloodZoneProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn query(&self, record: &SiteRecord) -> ProviderOutcome {
        into_outcome(PROVIDER_NAME, record, self.lookup(record).await)
    }
}
