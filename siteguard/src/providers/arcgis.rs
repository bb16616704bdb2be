//! ArcGIS REST query client
//!
//! Shared by the remote providers. Issues `query` requests against a feature
//! layer, scoped to a point or a small envelope around the site.
//!
//! ArcGIS servers report many failures as HTTP 200 with an `error` object in
//! the body; those are surfaced as `ProviderError::Api`.

use crate::types::{BoundingBox, Coordinate, ProviderError, Site};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Default timeout for remote provider requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// User-Agent header sent with every request
pub const USER_AGENT: &str = concat!("SiteGuard/", env!("CARGO_PKG_VERSION"));

type DirectRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP settings for one remote provider
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub requests_per_second: NonZeroU32,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            requests_per_second: NonZeroU32::MIN.saturating_add(1),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Error object embedded in an ArcGIS response body
#[derive(Debug, Deserialize)]
pub struct ArcGisError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Feature set returned by a layer query
#[derive(Debug, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    /// String attribute, trimmed; `None` when missing, null or blank
    pub fn text(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Response to a `returnCountOnly=true` query
#[derive(Debug, Deserialize)]
pub struct CountResponse {
    pub count: Option<u64>,
}

/// Parse an ArcGIS response body
pub fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("invalid JSON: {}", e)))?;

    if let Some(err) = value.get("error") {
        let err: ArcGisError = serde_json::from_value(err.clone())
            .map_err(|e| ProviderError::Parse(format!("invalid error object: {}", e)))?;
        return Err(ProviderError::Api(format!("ArcGIS error {}: {}", err.code, err.message)));
    }

    serde_json::from_value(value).map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Spatial filter parameters for a point
pub fn point_filter(c: Coordinate) -> Vec<(&'static str, String)> {
    vec![
        ("geometry", format!("{},{}", c.lon, c.lat)),
        ("geometryType", "esriGeometryPoint".to_string()),
        ("inSR", "4326".to_string()),
        ("spatialRel", "esriSpatialRelIntersects".to_string()),
    ]
}

/// Spatial filter parameters for an envelope
pub fn envelope_filter(b: BoundingBox) -> Vec<(&'static str, String)> {
    vec![
        (
            "geometry",
            format!("{},{},{},{}", b.min_lon, b.min_lat, b.max_lon, b.max_lat),
        ),
        ("geometryType", "esriGeometryEnvelope".to_string()),
        ("inSR", "4326".to_string()),
        ("spatialRel", "esriSpatialRelIntersects".to_string()),
    ]
}

/// Spatial filter covering a site: a point for point sites, the bounding
/// envelope for polygon sites
pub fn site_filter(site: &Site) -> Vec<(&'static str, String)> {
    match site {
        Site::Point { centroid } => point_filter(*centroid),
        Site::Polygon { .. } => envelope_filter(site.bounds()),
    }
}

/// Rate-limited ArcGIS REST client with a bounded per-request timeout
pub struct ArcGisClient {
    http_client: Client,
    rate_limiter: DirectRateLimiter,
}

impl ArcGisClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {}", e)))?;

        let quota = governor::Quota::per_second(settings.requests_per_second);

        Ok(Self {
            http_client,
            rate_limiter: governor::RateLimiter::direct(quota),
        })
    }

    /// GET `url` with the given query parameters plus `f=json`
    pub async fn query<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        self.rate_limiter.until_ready().await;

        debug!(url, "Querying ArcGIS layer");

        let response = self
            .http_client
            .get(url)
            .query(params)
            .query(&[("f", "json")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api(format!("HTTP {} from {}", status, url)));
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}
