//! Screening configuration
//!
//! Loaded from the TOML file located by `siteguard_common::config`. Every
//! section is optional; compiled defaults reproduce the five-tier table, the
//! tiered policy cutting off at NEAR, and the full provider chain.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [screening]
//! scheme = "astm"
//!
//! [screening.policy]
//! kind = "tiered"
//! eliminate_through = "NEAR OFF-SITE"
//!
//! [resolution]
//! providers = ["fema_nfhl", "topographic"]
//! timeout_secs = 10
//! ```
//!
//! Validation happens when the config is turned into runtime objects
//! (`threshold_table`, `policy`, `build_engine`), not at parse time.

use crate::classifier::{ThresholdBand, ThresholdTable};
use crate::providers::existing_dataset::ExistingDatasetFields;
use crate::providers::feature_density::{
    default_wetland_rules, DensityRule, DEFAULT_ENVELOPE_DEGREES, DEFAULT_WETLANDS_URL,
};
use crate::providers::fema_flood::DEFAULT_NFHL_URL;
use crate::providers::regional::{default_regions, RegionDefinition};
use crate::providers::topographic::{default_bands, TopographicBand};
use crate::providers::{
    ExistingDatasetProvider, FeatureDensityProvider, FemaFloodZoneProvider, HttpSettings,
    TopographicModelProvider,
};
use crate::resolution::{ResolutionEngine, DEFAULT_VERIFICATION_TEMPLATES};
use crate::types::SourceProvider;
use crate::verdict::EliminationPolicy;
use serde::Deserialize;
use siteguard_common::config::LoggingConfig;
use siteguard_common::{Error, Result};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const PROVIDER_FEMA: &str = "fema_nfhl";
pub const PROVIDER_WETLANDS: &str = "wetlands";
pub const PROVIDER_REGIONAL: &str = "regional";
pub const PROVIDER_TOPOGRAPHIC: &str = "topographic";

/// Provider names accepted in `[resolution] providers`
pub const KNOWN_PROVIDERS: &[&str] = &[
    PROVIDER_FEMA,
    PROVIDER_WETLANDS,
    PROVIDER_REGIONAL,
    PROVIDER_TOPOGRAPHIC,
];

/// Root of the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteGuardToml {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub screening: ScreeningConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScheme {
    #[default]
    FiveTier,
    Astm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Tiered,
    UltraConservative,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub kind: PolicyKind,
    /// Least severe tier still eliminated under the tiered policy
    #[serde(default = "default_cutoff")]
    pub eliminate_through: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::default(),
            eliminate_through: default_cutoff(),
        }
    }
}

fn default_cutoff() -> String {
    "NEAR".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScreeningConfig {
    #[serde(default)]
    pub scheme: ThresholdScheme,
    /// Custom bands; overrides `scheme` when present
    #[serde(default)]
    pub thresholds: Option<Vec<ThresholdBand>>,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WetlandsConfig {
    #[serde(default = "default_wetlands_url")]
    pub url: String,
    #[serde(default = "default_envelope")]
    pub envelope_degrees: f64,
    #[serde(default = "default_wetland_rules")]
    pub rules: Vec<DensityRule>,
}

impl Default for WetlandsConfig {
    fn default() -> Self {
        Self {
            url: default_wetlands_url(),
            envelope_degrees: default_envelope(),
            rules: default_wetland_rules(),
        }
    }
}

fn default_wetlands_url() -> String {
    DEFAULT_WETLANDS_URL.to_string()
}

fn default_envelope() -> f64 {
    DEFAULT_ENVELOPE_DEGREES
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolutionConfig {
    /// Provider priority order
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_fema_url")]
    pub fema_url: String,
    #[serde(default)]
    pub wetlands: WetlandsConfig,
    /// `{lat}`/`{lon}` templates attached to manual verification verdicts
    #[serde(default = "default_verification_urls")]
    pub manual_verification_urls: Vec<String>,
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionDefinition>,
    #[serde(default = "default_bands")]
    pub bands: Vec<TopographicBand>,
    #[serde(default)]
    pub existing: ExistingDatasetFields,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            timeout_secs: default_timeout_secs(),
            requests_per_second: default_requests_per_second(),
            user_agent: None,
            fema_url: default_fema_url(),
            wetlands: WetlandsConfig::default(),
            manual_verification_urls: default_verification_urls(),
            regions: default_regions(),
            bands: default_bands(),
            existing: ExistingDatasetFields::default(),
        }
    }
}

fn default_providers() -> Vec<String> {
    KNOWN_PROVIDERS.iter().map(|p| p.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_requests_per_second() -> u32 {
    2
}

fn default_fema_url() -> String {
    DEFAULT_NFHL_URL.to_string()
}

fn default_verification_urls() -> Vec<String> {
    DEFAULT_VERIFICATION_TEMPLATES
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl SiteGuardToml {
    pub fn load(path: &Path) -> Result<Self> {
        siteguard_common::config::load_toml(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Threshold table from custom bands or the named scheme
    pub fn threshold_table(&self) -> Result<ThresholdTable> {
        match &self.screening.thresholds {
            Some(bands) => ThresholdTable::new(bands.clone()),
            None => Ok(match self.screening.scheme {
                ThresholdScheme::FiveTier => ThresholdTable::five_tier(),
                ThresholdScheme::Astm => ThresholdTable::astm(),
            }),
        }
    }

    /// Elimination policy; the tiered cutoff must name a tier of `table`
    pub fn policy(&self, table: &ThresholdTable) -> Result<EliminationPolicy> {
        let policy = &self.screening.policy;
        match policy.kind {
            PolicyKind::UltraConservative => Ok(EliminationPolicy::UltraConservative),
            PolicyKind::Tiered => {
                let cutoff = table.tier(&policy.eliminate_through).ok_or_else(|| {
                    Error::Config(format!(
                        "eliminate_through names unknown tier '{}'",
                        policy.eliminate_through
                    ))
                })?;
                Ok(EliminationPolicy::Tiered { cutoff })
            }
        }
    }

    pub fn http_settings(&self) -> Result<HttpSettings> {
        let res = &self.resolution;
        if res.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        let requests_per_second = NonZeroU32::new(res.requests_per_second)
            .ok_or_else(|| Error::Config("requests_per_second must be at least 1".to_string()))?;

        let mut settings = HttpSettings {
            timeout: Duration::from_secs(res.timeout_secs),
            requests_per_second,
            ..HttpSettings::default()
        };
        if let Some(agent) = res.user_agent.as_ref().filter(|a| !a.trim().is_empty()) {
            settings.user_agent = agent.clone();
        }
        Ok(settings)
    }

    /// Build the configured provider chain
    ///
    /// `regional` expands to one provider per configured region, in order.
    pub fn build_providers(&self) -> Result<Vec<Arc<dyn SourceProvider>>> {
        let res = &self.resolution;
        if res.providers.is_empty() {
            return Err(Error::Config("[resolution] providers is empty".to_string()));
        }

        let settings = self.http_settings()?;
        let mut providers: Vec<Arc<dyn SourceProvider>> = Vec::new();

        for name in &res.providers {
            match name.trim() {
                PROVIDER_FEMA => {
                    let provider = FemaFloodZoneProvider::new(res.fema_url.clone(), &settings)
                        .map_err(|e| Error::Config(format!("{}: {}", PROVIDER_FEMA, e)))?;
                    providers.push(Arc::new(provider));
                }
                PROVIDER_WETLANDS => {
                    providers.push(Arc::new(FeatureDensityProvider::new(
                        PROVIDER_WETLANDS,
                        res.wetlands.url.clone(),
                        res.wetlands.envelope_degrees,
                        res.wetlands.rules.clone(),
                        &settings,
                    )?));
                }
                PROVIDER_REGIONAL => {
                    if res.regions.is_empty() {
                        warn!("Provider 'regional' listed but no regions configured");
                    }
                    for region in &res.regions {
                        providers.push(Arc::new(region.build()?));
                    }
                }
                PROVIDER_TOPOGRAPHIC => {
                    providers.push(Arc::new(TopographicModelProvider::new(res.bands.clone())?));
                }
                other => {
                    return Err(Error::Config(format!(
                        "unknown provider '{}' (expected one of: {})",
                        other,
                        KNOWN_PROVIDERS.join(", ")
                    )));
                }
            }
        }

        debug!(count = providers.len(), "Built provider chain");
        Ok(providers)
    }

    pub fn build_engine(&self) -> Result<ResolutionEngine> {
        Ok(ResolutionEngine::new(self.build_providers()?)?
            .with_existing(ExistingDatasetProvider::new(self.resolution.existing.clone()))
            .with_verification_templates(self.resolution.manual_verification_urls.clone()))
    }
}
