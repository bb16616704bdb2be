//! Source providers
//!
//! Each provider implements the `SourceProvider` trait from the `types`
//! module and is tried in priority order by the `ResolutionEngine`.
//!
//! # Providers
//! 1. **existing_dataset** - Fields the caller already holds for the site
//! 2. **fema_flood** - FEMA National Flood Hazard Layer zone lookup
//! 3. **feature_density** - Feature count heuristic over an ArcGIS layer
//!    (wetlands by default)
//! 4. **regional** - Per-region bounding box rules (Medium confidence or lower)
//! 5. **topographic** - Coarse latitude/longitude bands (Low confidence)
//!
//! Remote providers own their HTTP client, timeout and rate limiter. All
//! request failures are logged and degrade to `ProviderOutcome::NoData`.

pub mod arcgis;
pub mod existing_dataset;
pub mod feature_density;
pub mod fema_flood;
pub mod regional;
pub mod topographic;

pub use arcgis::{ArcGisClient, HttpSettings};
pub use existing_dataset::{ExistingDatasetFields, ExistingDatasetProvider};
pub use feature_density::{DensityRule, FeatureDensityProvider};
pub use fema_flood::FemaFloodZoneProvider;
pub use regional::{RegionDefinition, RegionZone, RegionalHeuristicProvider};
pub use topographic::{TopographicBand, TopographicModelProvider};

use crate::types::{ProviderError, ProviderOutcome, SiteRecord, SourceResult};
use tracing::{debug, warn};

/// Convert a provider-internal result into the engine-facing outcome
///
/// Errors are logged here and never propagate to the engine.
pub(crate) fn into_outcome(
    provider: &str,
    record: &SiteRecord,
    result: Result<Option<SourceResult>, ProviderError>,
) -> ProviderOutcome {
    match result {
        Ok(Some(found)) => ProviderOutcome::Found(found),
        Ok(None) => {
            debug!(provider, site_id = %record.id, "Provider returned no usable data");
            ProviderOutcome::NoData
        }
        Err(e) => {
            warn!(
                provider,
                site_id = %record.id,
                error = %e,
                "Provider query failed, treating as no data"
            );
            ProviderOutcome::NoData
        }
    }
}
