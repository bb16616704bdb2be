//! Test Helper Utilities
//!
//! Scripted `SourceProvider` implementations for exercising the resolution
//! engine without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use siteguard::types::{
    Confidence, ProviderOutcome, RiskLabel, SiteRecord, SourceProvider, SourceResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared log of provider names in the order they were queried
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Provider returning a fixed outcome and recording each call
pub struct MockProvider {
    name: String,
    outcome: ProviderOutcome,
    delay: Option<Duration>,
    calls: AtomicUsize,
    log: Option<CallLog>,
}

impl MockProvider {
    pub fn no_data(name: &str) -> Self {
        Self::with_outcome(name, ProviderOutcome::NoData)
    }

    pub fn found(name: &str, label: RiskLabel, confidence: Confidence) -> Self {
        Self::with_outcome(
            name,
            ProviderOutcome::Found(SourceResult {
                label,
                confidence,
                raw: serde_json::json!({ "mock": name }),
                source_name: name.to_string(),
            }),
        )
    }

    fn with_outcome(name: &str, outcome: ProviderOutcome) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
            log: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _record: &SiteRecord) -> ProviderOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.name.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

pub fn level(value: &str) -> RiskLabel {
    RiskLabel::RiskLevel(value.to_string())
}

pub fn zone(value: &str) -> RiskLabel {
    RiskLabel::ZoneCode(value.to_string())
}
