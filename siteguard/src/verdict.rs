//! Verdict building and elimination policies
//!
//! Two policies coexist and the caller picks one:
//! - **Tiered:** eliminate when the tier is at or above a severity cutoff.
//! - **Ultra-conservative:** eliminate whenever any flood classification is
//!   present at all, including minimal-risk zone X.
//!
//! Verdicts are built once per site evaluation and never mutated.

use crate::classifier::RiskTier;
use crate::flood_zone;
use crate::resolution::Resolution;
use crate::types::{Confidence, RiskLabel, SourceResult};
use serde::Serialize;

pub const MANUAL_VERIFICATION_SOURCE: &str = "manual_verification";
pub const MANUAL_VERIFICATION_TIER: &str = "MANUAL VERIFICATION REQUIRED";

/// Elimination policy selector
#[derive(Debug, Clone, PartialEq)]
pub enum EliminationPolicy {
    /// Eliminate tiers at or above `cutoff` in severity
    Tiered { cutoff: RiskTier },
    /// Eliminate on any recognized (or unrecognized) classification
    UltraConservative,
}

impl EliminationPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            EliminationPolicy::Tiered { .. } => "tiered",
            EliminationPolicy::UltraConservative => "ultra-conservative",
        }
    }

    /// Apply this policy; returns the elimination reason, if any
    pub fn evaluate(&self, label: &RiskLabel) -> Option<String> {
        match self {
            EliminationPolicy::Tiered { cutoff } => tiered_policy(label, cutoff),
            EliminationPolicy::UltraConservative => ultra_conservative_policy(label),
        }
    }
}

/// Tiered policy
///
/// Distance tiers are compared to the cutoff. Provider-native labels count
/// as at/above any cutoff only for SFHA zones (A and V families) and High
/// risk levels.
pub fn tiered_policy(label: &RiskLabel, cutoff: &RiskTier) -> Option<String> {
    match label {
        RiskLabel::Tier(tier) if !tier.is_out_of_range() && tier.at_or_above(cutoff) => Some(format!(
            "{} tier is at or above the {} cutoff (tiered policy)",
            tier.name(),
            cutoff.name()
        )),
        RiskLabel::ZoneCode(code) if flood_zone::is_sfha_zone(code) => Some(format!(
            "zone {} is a Special Flood Hazard Area (tiered policy)",
            code
        )),
        RiskLabel::RiskLevel(level) if flood_zone::is_high_risk_level(level) => {
            Some(format!("{} risk level (tiered policy)", level))
        }
        _ => None,
    }
}

/// Ultra-conservative policy: when uncertain, eliminate
///
/// Any zone code or risk level string eliminates, zone X included. Distance
/// tiers eliminate unless OUT-OF-RANGE. Only an empty label is kept.
pub fn ultra_conservative_policy(label: &RiskLabel) -> Option<String> {
    match label {
        RiskLabel::Tier(tier) if tier.is_out_of_range() => None,
        RiskLabel::Tier(tier) => Some(format!(
            "hazard within range at {} tier (ultra-conservative policy)",
            tier.name()
        )),
        RiskLabel::ZoneCode(code) if code.trim().is_empty() => None,
        RiskLabel::ZoneCode(code) if flood_zone::is_recognized_zone(code) => Some(format!(
            "flood zone {} present (ultra-conservative policy)",
            code
        )),
        RiskLabel::RiskLevel(level) if level.trim().is_empty() => None,
        RiskLabel::RiskLevel(level) if flood_zone::is_recognized_risk_level(level) => Some(format!(
            "flood risk level {} present (ultra-conservative policy)",
            level
        )),
        other => Some(format!(
            "unrecognized flood classification '{}' (ultra-conservative policy)",
            other.as_str()
        )),
    }
}

/// Final screening decision for one site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    tier: String,
    distance_miles: Option<f64>,
    source_name: String,
    confidence: Confidence,
    eliminate: bool,
    reason: Option<String>,
    requires_manual_verification: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    verification_urls: Vec<String>,
}

impl Verdict {
    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn distance_miles(&self) -> Option<f64> {
        self.distance_miles
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn eliminate(&self) -> bool {
        self.eliminate
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn requires_manual_verification(&self) -> bool {
        self.requires_manual_verification
    }

    pub fn verification_urls(&self) -> &[String] {
        &self.verification_urls
    }
}

pub struct VerdictBuilder;

impl VerdictBuilder {
    /// Combine a tier or provider label with the elimination policy
    pub fn build(
        label: &RiskLabel,
        distance_miles: Option<f64>,
        source_name: impl Into<String>,
        confidence: Confidence,
        policy: &EliminationPolicy,
    ) -> Verdict {
        let reason = policy.evaluate(label);
        Verdict {
            tier: label.as_str().to_string(),
            distance_miles,
            source_name: source_name.into(),
            confidence,
            eliminate: reason.is_some(),
            reason,
            requires_manual_verification: false,
            verification_urls: Vec::new(),
        }
    }

    /// Verdict for a site no provider could resolve
    ///
    /// Never defaults to safe: the ultra-conservative policy eliminates, the
    /// tiered policy keeps the site but flags it for review.
    pub fn manual_verification(verification_urls: Vec<String>, policy: &EliminationPolicy) -> Verdict {
        let reason = match policy {
            EliminationPolicy::UltraConservative => Some(
                "no provider could classify the site; manual verification required \
                 (ultra-conservative policy)"
                    .to_string(),
            ),
            EliminationPolicy::Tiered { .. } => None,
        };
        Verdict {
            tier: MANUAL_VERIFICATION_TIER.to_string(),
            distance_miles: None,
            source_name: MANUAL_VERIFICATION_SOURCE.to_string(),
            confidence: Confidence::Unknown,
            eliminate: reason.is_some(),
            reason,
            requires_manual_verification: true,
            verification_urls,
        }
    }

    pub fn from_source(result: &SourceResult, distance_miles: Option<f64>, policy: &EliminationPolicy) -> Verdict {
        Self::build(
            &result.label,
            distance_miles,
            result.source_name.clone(),
            result.confidence,
            policy,
        )
    }

    pub fn from_resolution(resolution: &Resolution, policy: &EliminationPolicy) -> Verdict {
        match resolution {
            Resolution::Resolved(result) => Self::from_source(result, None, policy),
            Resolution::ManualVerification { verification_urls } => {
                Self::manual_verification(verification_urls.clone(), policy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ThresholdTable;

    fn tiered_near() -> EliminationPolicy {
        EliminationPolicy::Tiered {
            cutoff: ThresholdTable::five_tier().tier("NEAR").unwrap(),
        }
    }

    fn tier(name: &str) -> RiskLabel {
        RiskLabel::Tier(ThresholdTable::five_tier().tier(name).unwrap())
    }

    #[test]
    fn test_tiered_eliminates_at_or_above_cutoff() {
        let policy = tiered_near();
        for name in ["ON-SITE", "ADJACENT", "NEAR"] {
            let v = VerdictBuilder::build(&tier(name), Some(0.1), "echo", Confidence::High, &policy);
            assert!(v.eliminate(), "{} should be eliminated", name);
            let reason = v.reason().unwrap();
            assert!(reason.contains(name) && reason.contains("tiered"));
        }
        for name in ["OFF-SITE", "DISTANT", "OUT-OF-RANGE"] {
            let v = VerdictBuilder::build(&tier(name), Some(0.7), "echo", Confidence::High, &policy);
            assert!(!v.eliminate(), "{} should be kept", name);
            assert!(v.reason().is_none());
        }
    }

    #[test]
    fn test_tiered_with_provider_labels() {
        let cutoff = ThresholdTable::five_tier().tier("NEAR").unwrap();
        assert!(tiered_policy(&RiskLabel::ZoneCode("AE".into()), &cutoff).is_some());
        assert!(tiered_policy(&RiskLabel::ZoneCode("X".into()), &cutoff).is_none());
        assert!(tiered_policy(&RiskLabel::RiskLevel("High".into()), &cutoff).is_some());
        assert!(tiered_policy(&RiskLabel::RiskLevel("Moderate".into()), &cutoff).is_none());
    }

    #[test]
    fn test_ultra_conservative_eliminates_zone_x() {
        let v = VerdictBuilder::build(
            &RiskLabel::ZoneCode("X".to_string()),
            None,
            "fema_nfhl",
            Confidence::High,
            &EliminationPolicy::UltraConservative,
        );
        assert!(v.eliminate());
        let reason = v.reason().unwrap();
        assert!(reason.contains("X"));
        assert!(reason.contains("ultra-conservative"));
    }

    #[test]
    fn test_ultra_conservative_labels() {
        assert!(ultra_conservative_policy(&RiskLabel::RiskLevel("Minimal Risk".into())).is_some());
        assert!(ultra_conservative_policy(&RiskLabel::ZoneCode("Q9".into()))
            .unwrap()
            .contains("unrecognized"));
        assert!(ultra_conservative_policy(&RiskLabel::ZoneCode("  ".into())).is_none());
        assert!(ultra_conservative_policy(&RiskLabel::Tier(crate::classifier::RiskTier::out_of_range())).is_none());
        assert!(ultra_conservative_policy(&tier("DISTANT")).is_some());
    }

    #[test]
    fn test_manual_verification_never_safe() {
        let urls = vec!["https://msc.fema.gov/portal/search?AddressQuery=1,2".to_string()];

        let ultra = VerdictBuilder::manual_verification(urls.clone(), &EliminationPolicy::UltraConservative);
        assert!(ultra.requires_manual_verification());
        assert!(ultra.eliminate());
        assert!(ultra.reason().is_some());
        assert_eq!(ultra.confidence(), Confidence::Unknown);

        let tiered = VerdictBuilder::manual_verification(urls, &tiered_near());
        assert!(tiered.requires_manual_verification());
        assert!(!tiered.eliminate());
        assert!(tiered.reason().is_none());
        assert_eq!(tiered.verification_urls().len(), 1);
    }

    #[test]
    fn test_verdict_serialization_shape() {
        let v = VerdictBuilder::build(&tier("ADJACENT"), Some(0.05), "echo", Confidence::High, &tiered_near());
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["tier"], "ADJACENT");
        assert_eq!(json["confidence"], "High");
        assert_eq!(json["eliminate"], true);
        assert_eq!(json["requires_manual_verification"], false);
        assert!(json.get("verification_urls").is_none());
    }
}
