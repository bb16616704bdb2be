//! SiteGuard library interface
//!
//! Environmental hazard screening for candidate property sites: distance
//! tiers against regulated features, and flood classification resolved
//! through an ordered chain of data sources.

pub mod classifier;
pub mod config;
pub mod flood_zone;
pub mod geometry;
pub mod providers;
pub mod resolution;
pub mod screening;
pub mod types;
pub mod verdict;

pub use classifier::{classify, RiskTier, ThresholdBand, ThresholdTable};
pub use config::SiteGuardToml;
pub use geometry::{measure, GeometryError, Proximity};
pub use resolution::{Resolution, ResolutionEngine, ResolutionStats, StatsSnapshot};
pub use screening::{Screener, SiteVerdict};
pub use types::{
    Confidence, Coordinate, HazardFeature, ProviderOutcome, RiskLabel, Site, SiteRecord,
    SourceProvider, SourceResult,
};
pub use verdict::{EliminationPolicy, Verdict, VerdictBuilder};
