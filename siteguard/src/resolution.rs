//! Multi-source resolution engine
//!
//! Tries an ordered list of providers for one site, stopping at the first
//! that returns usable data:
//!
//! ```text
//! existing data reliable? --yes--> RESOLVED
//!        | no
//!        v
//! TRYING(1) --NoData--> TRYING(2) --NoData--> ... TRYING(n) --NoData--> MANUAL_VERIFICATION
//!     |                     |                        |
//!     +------Found----------+----------Found---------+--> RESOLVED
//! ```
//!
//! First success wins; a later provider with higher confidence is never
//! consulted. Providers for one site run strictly in sequence.

use crate::providers::ExistingDatasetProvider;
use crate::types::{Coordinate, ProviderOutcome, SiteRecord, SourceProvider, SourceResult};
use serde::Serialize;
use siteguard_common::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Default manual verification lookups; `{lat}`/`{lon}` are substituted
pub const DEFAULT_VERIFICATION_TEMPLATES: &[&str] = &[
    "https://msc.fema.gov/portal/search?AddressQuery={lat}%2C{lon}",
    "https://hazards-fema.maps.arcgis.com/apps/webappviewer/index.html?id=8b0adb51996444d4879338b5529aa9cd&center={lon},{lat}",
    "https://fwsprimary.wim.usgs.gov/wetlands/apps/wetlands-mapper/?center={lon},{lat}",
];

/// Terminal state of one resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A provider returned usable data
    Resolved(SourceResult),
    /// Every provider came back empty; a human must check the site
    ManualVerification { verification_urls: Vec<String> },
}

/// Process-wide resolution counters
///
/// Observability only: never consulted by classification. Safe to share
/// across concurrently evaluated sites.
#[derive(Debug, Default)]
pub struct ResolutionStats {
    total_queries: AtomicU64,
    manual_verification_needed: AtomicU64,
    provider_successes: Mutex<BTreeMap<String, u64>>,
}

/// Point-in-time copy of `ResolutionStats`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_queries: u64,
    pub manual_verification_needed: u64,
    pub provider_successes: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    pub fn display_string(&self) -> String {
        let per_provider: Vec<String> = self
            .provider_successes
            .iter()
            .map(|(name, count)| format!("{}={}", name, count))
            .collect();
        format!(
            "{} sites queried, {} need manual verification [{}]",
            self.total_queries,
            self.manual_verification_needed,
            per_provider.join(", ")
        )
    }
}

impl ResolutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_query(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self, provider: &str) {
        let mut successes = self
            .provider_successes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *successes.entry(provider.to_string()).or_insert(0) += 1;
    }

    fn record_manual_verification(&self) {
        self.manual_verification_needed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::Relaxed)
    }

    pub fn manual_verification_needed(&self) -> u64 {
        self.manual_verification_needed.load(Ordering::Relaxed)
    }

    pub fn successes_for(&self, provider: &str) -> u64 {
        self.provider_successes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(provider)
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_queries: self.total_queries(),
            manual_verification_needed: self.manual_verification_needed(),
            provider_successes: self
                .provider_successes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }
}

/// Ordered provider chain with an existing-data short-circuit
pub struct ResolutionEngine {
    existing: ExistingDatasetProvider,
    providers: Vec<Arc<dyn SourceProvider>>,
    verification_templates: Vec<String>,
}

impl ResolutionEngine {
    /// Build an engine over providers in priority order
    ///
    /// Fails on an empty list or duplicate provider names.
    pub fn new(providers: Vec<Arc<dyn SourceProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::Config("resolution engine needs at least one provider".to_string()));
        }
        let mut names = HashSet::new();
        for provider in &providers {
            if !names.insert(provider.name().to_string()) {
                return Err(Error::Config(format!(
                    "provider '{}' listed more than once",
                    provider.name()
                )));
            }
        }

        Ok(Self {
            existing: ExistingDatasetProvider::default(),
            providers,
            verification_templates: DEFAULT_VERIFICATION_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        })
    }

    pub fn with_existing(mut self, existing: ExistingDatasetProvider) -> Self {
        self.existing = existing;
        self
    }

    pub fn with_verification_templates(mut self, templates: Vec<String>) -> Self {
        self.verification_templates = templates;
        self
    }

    /// Provider names in priority order (excluding the existing-data check)
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve one site
    pub async fn resolve(&self, record: &SiteRecord, stats: &ResolutionStats) -> Resolution {
        stats.record_query();

        if let ProviderOutcome::Found(result) = self.existing.query(record).await {
            debug!(site_id = %record.id, "Existing dataset is reliable, skipping providers");
            stats.record_success(&result.source_name);
            return Resolution::Resolved(result);
        }

        for (index, provider) in self.providers.iter().enumerate() {
            debug!(
                site_id = %record.id,
                provider = provider.name(),
                attempt = index + 1,
                of = self.providers.len(),
                "Trying provider"
            );

            if let ProviderOutcome::Found(result) = provider.query(record).await {
                info!(
                    site_id = %record.id,
                    provider = provider.name(),
                    label = %result.label,
                    confidence = %result.confidence,
                    "Resolved"
                );
                stats.record_success(provider.name());
                return Resolution::Resolved(result);
            }
        }

        warn!(
            site_id = %record.id,
            providers = self.providers.len(),
            "All providers returned no data, manual verification required"
        );
        stats.record_manual_verification();
        Resolution::ManualVerification {
            verification_urls: self.verification_urls(record.site.centroid()),
        }
    }

    /// Verification templates filled in for a coordinate
    pub fn verification_urls(&self, at: Coordinate) -> Vec<String> {
        self.verification_templates
            .iter()
            .map(|t| {
                t.replace("{lat}", &format!("{:.6}", at.lat))
                    .replace("{lon}", &format!("{:.6}", at.lon))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, RiskLabel, Site};
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        outcome: ProviderOutcome,
    }

    #[async_trait]
    impl SourceProvider for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn query(&self, _record: &SiteRecord) -> ProviderOutcome {
            self.outcome.clone()
        }
    }

    fn found(name: &str) -> ProviderOutcome {
        ProviderOutcome::Found(SourceResult {
            label: RiskLabel::RiskLevel("Moderate".to_string()),
            confidence: Confidence::Medium,
            raw: serde_json::Value::Null,
            source_name: name.to_string(),
        })
    }

    #[test]
    fn test_empty_provider_list_rejected() {
        assert!(matches!(ResolutionEngine::new(vec![]), Err(Error::Config(_))));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(Fixed { name: "a", outcome: ProviderOutcome::NoData }),
            Arc::new(Fixed { name: "a", outcome: ProviderOutcome::NoData }),
        ];
        assert!(ResolutionEngine::new(providers).is_err());
    }

    #[tokio::test]
    async fn test_existing_data_short_circuits() {
        let providers: Vec<Arc<dyn SourceProvider>> =
            vec![Arc::new(Fixed { name: "remote", outcome: found("remote") })];
        let engine = ResolutionEngine::new(providers).unwrap();
        let stats = ResolutionStats::new();
        let record = SiteRecord::new("p", Site::point(29.7, -95.3))
            .with_field("In SFHA", "No")
            .with_field("FEMA Zone", "X");

        match engine.resolve(&record, &stats).await {
            Resolution::Resolved(result) => assert_eq!(result.source_name, "existing_dataset"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(stats.successes_for("existing_dataset"), 1);
        assert_eq!(stats.successes_for("remote"), 0);
    }

    #[test]
    fn test_verification_url_substitution() {
        let providers: Vec<Arc<dyn SourceProvider>> =
            vec![Arc::new(Fixed { name: "a", outcome: ProviderOutcome::NoData })];
        let engine = ResolutionEngine::new(providers)
            .unwrap()
            .with_verification_templates(vec!["https://example.test/?ll={lat},{lon}".to_string()]);

        let urls = engine.verification_urls(Coordinate::new(29.5, -95.25));
        assert_eq!(urls, vec!["https://example.test/?ll=29.500000,-95.250000".to_string()]);
    }

    #[test]
    fn test_snapshot_display() {
        let stats = ResolutionStats::new();
        stats.record_query();
        stats.record_success("fema_nfhl");
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.display_string(), "1 sites queried, 0 need manual verification [fema_nfhl=1]");
    }
}
