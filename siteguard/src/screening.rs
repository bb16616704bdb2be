//! End-to-end site screening
//!
//! `Screener` ties the geometry kernel, the tier classifier, the resolution
//! engine and the verdict builder together:
//!
//! - **Proximity:** measure every hazard feature against the site, keep the
//!   most severe tier (ties broken by the smaller distance), build a verdict.
//! - **Flood:** resolve the site through the provider chain, build a verdict
//!   from the first result or a manual verification verdict.
//!
//! Batches keep input order. Flood batches evaluate up to `concurrency`
//! sites at once; providers for a single site still run in sequence.

use crate::classifier::{RiskTier, ThresholdTable};
use crate::config::SiteGuardToml;
use crate::geometry::{self, Proximity};
use crate::resolution::{ResolutionEngine, ResolutionStats};
use crate::types::{Confidence, HazardFeature, RiskLabel, Site, SiteRecord};
use crate::verdict::{EliminationPolicy, Verdict, VerdictBuilder};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use siteguard_common::{Error, Result};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Source name on verdicts with no hazard in range
pub const PROXIMITY_SOURCE: &str = "proximity";

/// Default number of sites resolved concurrently in a flood batch
pub const DEFAULT_CONCURRENCY: usize = 4;

/// The hazard that decided a proximity verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestHazard {
    pub name: String,
    pub dataset: String,
    pub tier: RiskTier,
    pub proximity: Proximity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityReport {
    pub verdict: Verdict,
    pub nearest: Option<NearestHazard>,
}

/// Verdict for one site of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteVerdict {
    pub site_id: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest: Option<NearestHazard>,
}

pub struct Screener {
    table: ThresholdTable,
    policy: EliminationPolicy,
    engine: Option<ResolutionEngine>,
}

impl Screener {
    /// Proximity-only screener; call `with_engine` to enable flood screening
    pub fn new(table: ThresholdTable, policy: EliminationPolicy) -> Self {
        Self {
            table,
            policy,
            engine: None,
        }
    }

    pub fn with_engine(mut self, engine: ResolutionEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Build table, policy and provider chain from a loaded config
    pub fn from_config(config: &SiteGuardToml) -> Result<Self> {
        let table = config.threshold_table()?;
        let policy = config.policy(&table)?;
        let engine = config.build_engine()?;
        info!(
            tiers = table.bands().len() + 2,
            policy = policy.name(),
            providers = ?engine.provider_names(),
            "Screener configured"
        );
        Ok(Self::new(table, policy).with_engine(engine))
    }

    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    pub fn policy(&self) -> &EliminationPolicy {
        &self.policy
    }

    fn engine(&self) -> Result<&ResolutionEngine> {
        self.engine
            .as_ref()
            .ok_or_else(|| Error::Config("flood screening requires a resolution engine".to_string()))
    }

    /// Screen one site against a set of hazard features
    ///
    /// Fails only for an invalid site. Features with invalid coordinates are
    /// skipped. With nothing measurable the site is OUT-OF-RANGE.
    pub fn screen_proximity(&self, site: &Site, hazards: &[HazardFeature]) -> Result<ProximityReport> {
        site.validate()?;

        let mut nearest: Option<NearestHazard> = None;
        for feature in hazards {
            let proximity = match geometry::measure(site, feature) {
                Ok(p) => p,
                Err(e) => {
                    warn!(feature = %feature.name, dataset = %feature.dataset, error = %e, "Skipping hazard feature");
                    continue;
                }
            };
            let tier = self.table.classify(proximity.distance.miles, proximity.inside);
            let candidate = NearestHazard {
                name: feature.name.clone(),
                dataset: feature.dataset.clone(),
                tier,
                proximity,
            };
            if nearest.as_ref().map_or(true, |current| is_worse(&candidate, current)) {
                nearest = Some(candidate);
            }
        }

        let verdict = match &nearest {
            Some(hazard) => VerdictBuilder::build(
                &RiskLabel::Tier(hazard.tier.clone()),
                Some(hazard.proximity.distance.miles),
                hazard.dataset.clone(),
                Confidence::High,
                &self.policy,
            ),
            None => VerdictBuilder::build(
                &RiskLabel::Tier(RiskTier::out_of_range()),
                None,
                PROXIMITY_SOURCE,
                Confidence::High,
                &self.policy,
            ),
        };

        debug!(tier = verdict.tier(), eliminate = verdict.eliminate(), "Proximity screened");
        Ok(ProximityReport { verdict, nearest })
    }

    /// Screen every site; stops at the first invalid site
    pub fn screen_proximity_batch(
        &self,
        records: &[SiteRecord],
        hazards: &[HazardFeature],
    ) -> Result<Vec<SiteVerdict>> {
        records
            .iter()
            .map(|record| {
                let report = self
                    .screen_proximity(&record.site, hazards)
                    .map_err(|e| Error::InvalidInput(format!("site {}: {}", record.id, e)))?;
                Ok(SiteVerdict {
                    site_id: record.id.clone(),
                    verdict: report.verdict,
                    nearest: report.nearest,
                })
            })
            .collect()
    }

    /// Resolve one site's flood classification and apply the policy
    pub async fn screen_flood(&self, record: &SiteRecord, stats: &ResolutionStats) -> Result<Verdict> {
        let engine = self.engine()?;
        record
            .site
            .validate()
            .map_err(|e| Error::InvalidInput(format!("site {}: {}", record.id, e)))?;

        let resolution = engine.resolve(record, stats).await;
        Ok(VerdictBuilder::from_resolution(&resolution, &self.policy))
    }

    /// Flood-screen a batch with at most `concurrency` sites in flight
    ///
    /// All sites are validated before any provider is queried.
    pub async fn screen_flood_batch(
        &self,
        records: &[SiteRecord],
        stats: &ResolutionStats,
        concurrency: usize,
    ) -> Result<Vec<SiteVerdict>> {
        let engine = self.engine()?;
        for record in records {
            record
                .site
                .validate()
                .map_err(|e| Error::InvalidInput(format!("site {}: {}", record.id, e)))?;
        }

        let policy = &self.policy;
        let verdicts = stream::iter(records)
            .map(|record| async move {
                let resolution = engine.resolve(record, stats).await;
                SiteVerdict {
                    site_id: record.id.clone(),
                    verdict: VerdictBuilder::from_resolution(&resolution, policy),
                    nearest: None,
                }
            })
            .buffered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        info!(sites = verdicts.len(), "{}", stats.snapshot().display_string());
        Ok(verdicts)
    }
}

/// More severe tier first, then the smaller distance
fn is_worse(candidate: &NearestHazard, current: &NearestHazard) -> bool {
    match candidate.tier.severity().cmp(&current.tier.severity()) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => {
            candidate
                .proximity
                .distance
                .miles
                .total_cmp(&current.proximity.distance.miles)
                == Ordering::Less
        }
    }
}
