//! Core Types and Trait Definitions for SiteGuard
//!
//! Defines the data model shared by the geometry kernel, the tier classifier,
//! the source providers and the verdict builder:
//! - **Geometry:** Coordinate, Site, HazardFeature, DistanceResult
//! - **Resolution:** Confidence, RiskLabel, SourceResult, ProviderOutcome
//! - **Provider seam:** the `SourceProvider` trait

use crate::classifier::RiskTier;
use crate::geometry::GeometryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Geometry Types
// ============================================================================

/// WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both components are finite and within WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn validate(&self) -> Result<Self, GeometryError> {
        if self.is_valid() {
            Ok(*self)
        } else {
            Err(GeometryError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Axis-aligned latitude/longitude box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Inclusive on all four edges
    pub fn contains(&self, c: Coordinate) -> bool {
        c.lat >= self.min_lat && c.lat <= self.max_lat && c.lon >= self.min_lon && c.lon <= self.max_lon
    }

    pub fn is_valid(&self) -> bool {
        Coordinate::new(self.min_lat, self.min_lon).is_valid()
            && Coordinate::new(self.max_lat, self.max_lon).is_valid()
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }

    /// Smallest box around a set of coordinates
    pub fn around(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BoundingBox {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        for p in &points[1..] {
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lat = bbox.max_lat.max(p.lat);
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.max_lon = bbox.max_lon.max(p.lon);
        }
        Some(bbox)
    }

    /// Box of `half_degrees` around a point, clamped to WGS84 ranges
    pub fn padded(center: Coordinate, half_degrees: f64) -> Self {
        BoundingBox {
            min_lat: (center.lat - half_degrees).max(-90.0),
            max_lat: (center.lat + half_degrees).min(90.0),
            min_lon: (center.lon - half_degrees).max(-180.0),
            max_lon: (center.lon + half_degrees).min(180.0),
        }
    }
}

/// A parcel: either a single centroid or a polygon of corners
///
/// Polygon rings are implicitly closed; repeating the first corner at the end
/// is allowed but not required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Site {
    Point { centroid: Coordinate },
    Polygon { corners: Vec<Coordinate> },
}

impl Site {
    pub fn point(lat: f64, lon: f64) -> Self {
        Site::Point {
            centroid: Coordinate::new(lat, lon),
        }
    }

    /// Build a polygon site; requires at least 3 valid corners
    pub fn polygon(corners: Vec<Coordinate>) -> Result<Self, GeometryError> {
        let site = Site::Polygon { corners };
        site.validate()?;
        Ok(site)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Site::Point { centroid } => centroid.validate().map(|_| ()),
            Site::Polygon { corners } => {
                if corners.len() < 3 {
                    return Err(GeometryError::InsufficientPoints {
                        required: 3,
                        actual: corners.len(),
                    });
                }
                corners.iter().try_for_each(|c| c.validate().map(|_| ()))
            }
        }
    }

    /// Representative point used for remote lookups
    ///
    /// Polygon sites use the vertex average, which lies inside any convex parcel.
    pub fn centroid(&self) -> Coordinate {
        match self {
            Site::Point { centroid } => *centroid,
            Site::Polygon { corners } => {
                let n = corners.len().max(1) as f64;
                let (lat, lon) = corners
                    .iter()
                    .fold((0.0, 0.0), |(lat, lon), c| (lat + c.lat, lon + c.lon));
                Coordinate::new(lat / n, lon / n)
            }
        }
    }

    /// Bounding box of the site (degenerate box for point sites)
    pub fn bounds(&self) -> BoundingBox {
        match self {
            Site::Point { centroid } => BoundingBox::padded(*centroid, 0.0),
            Site::Polygon { corners } => {
                BoundingBox::around(corners).unwrap_or_else(|| BoundingBox::padded(self.centroid(), 0.0))
            }
        }
    }
}

/// Regulated feature loaded from an external dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardFeature {
    pub location: Coordinate,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Dataset the feature was loaded from (e.g. "EPA ECHO", "UST Registry")
    pub dataset: String,
    /// Free-form attributes (existing risk fields and the like)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Which distance a `DistanceResult` measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Great-circle distance from the site centroid
    Centroid,
    /// Distance to the nearest point on the polygon boundary
    Edge,
}

/// Distance between a site and a hazard feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub metric: DistanceMetric,
    pub miles: f64,
    /// Nearest site point; `None` when the feature lies inside the polygon
    pub closest_point: Option<Coordinate>,
}

// ============================================================================
// Resolution Types
// ============================================================================

/// Confidence label attached to every source result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Unknown,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
            Confidence::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a source reported: a distance tier or a provider-native label
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RiskLabel {
    /// Tier from the distance classifier
    Tier(RiskTier),
    /// Flood zone code such as "AE", "VE", "X"
    ZoneCode(String),
    /// Risk level string such as "High", "Moderate", "Minimal"
    RiskLevel(String),
}

impl RiskLabel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLabel::Tier(tier) => tier.name(),
            RiskLabel::ZoneCode(code) => code,
            RiskLabel::RiskLevel(level) => level,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLabel::Tier(tier) => write!(f, "{} tier", tier.name()),
            RiskLabel::ZoneCode(code) => write!(f, "zone {}", code),
            RiskLabel::RiskLevel(level) => write!(f, "{} risk", level),
        }
    }
}

/// Usable answer from one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    pub label: RiskLabel,
    pub confidence: Confidence,
    /// Provider payload retained for audit
    pub raw: serde_json::Value,
    pub source_name: String,
}

/// Provider answer: a result, or the "nothing usable" sentinel
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Found(SourceResult),
    NoData,
}

/// Site plus the fields the caller already holds for it
///
/// `fields` carries columns from the caller's own dataset (e.g. "In SFHA",
/// "Flood Risk Area"), consulted before any remote provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: String,
    pub site: Site,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl SiteRecord {
    pub fn new(id: impl Into<String>, site: Site) -> Self {
        Self {
            id: id.into(),
            site,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Field value, treating blanks and unknown markers as absent
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = self.fields.get(name)?.trim();
        if is_unknown_marker(value) {
            None
        } else {
            Some(value)
        }
    }
}

fn is_unknown_marker(value: &str) -> bool {
    value.is_empty()
        || ["unknown", "n/a", "na", "nan", "none", "null", "-"]
            .iter()
            .any(|m| value.eq_ignore_ascii_case(m))
}

// ============================================================================
// Provider Seam
// ============================================================================

/// One source of hazard/risk information
///
/// Providers never fail: expected failure modes (timeouts, missing data,
/// malformed responses) are logged and reported as `ProviderOutcome::NoData`.
/// Providers hold no per-site state; success counters live in
/// `ResolutionStats`, owned by the caller of the engine.
///
/// # Example
/// ```rust,ignore
/// use siteguard::types::{ProviderOutcome, SiteRecord, SourceProvider};
///
/// pub struct AlwaysEmpty;
///
/// #[async_trait::async_trait]
/// impl SourceProvider for AlwaysEmpty {
///     fn name(&self) -> &str { "always_empty" }
///
///     async fn query(&self, _record: &SiteRecord) -> ProviderOutcome {
///         ProviderOutcome::NoData
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Provider name used for provenance and statistics
    fn name(&self) -> &str;

    /// Query this source for the given site
    async fn query(&self, record: &SiteRecord) -> ProviderOutcome;
}

/// Failure inside a provider; never escapes it
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request exceeded the provider's timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// External service returned an error
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Api(format!("HTTP {}", status))
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
