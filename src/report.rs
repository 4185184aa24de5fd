use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Categories the model is asked to fill, in wire order.
pub const REQUIRED_KEYS: [&str; 3] = ["alerts", "events", "news"];

/// Number of items per category requested from the model.
pub const MIN_ITEMS: usize = 5;

/// The payload served on `/api/traffic-updates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficReport {
    pub alerts: Vec<String>,
    pub events: Vec<String>,
    pub news: Vec<String>,
}

impl TrafficReport {
    /// Categories holding fewer than [`MIN_ITEMS`] entries.
    pub fn short_categories(&self) -> Vec<&'static str> {
        [&self.alerts, &self.events, &self.news]
            .iter()
            .zip(REQUIRED_KEYS)
            .filter(|(items, _)| items.len() < MIN_ITEMS)
            .map(|(_, key)| key)
            .collect()
    }
}

/// Where a served report came from. Not part of the JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    Live,
    Fallback,
}

impl ReportSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportSource::Live => "live",
            ReportSource::Fallback => "fallback",
        }
    }
}

static FALLBACK: LazyLock<TrafficReport> = LazyLock::new(|| TrafficReport {
    alerts: to_owned(&[
        "Heavy traffic on Outer Ring Road due to construction.",
        "Accident near Electronic City causing lane closure.",
        "Signal maintenance on Brigade Road causing delays.",
        "Water logging at Silk Board junction causing delays.",
        "Road closure on MG Road for metro construction work.",
        "Diversion at Hebbal flyover for emergency repairs.",
    ]),
    events: to_owned(&[
        "VIP movement on MG Road, expect diversions.",
        "Exhibition at BELR Center causing increased traffic.",
        "Marathon route affecting Cubbon Park Road.",
        "Cricket match at Chinnaswamy Stadium, expect traffic.",
        "Cultural event at Palace Grounds affecting Sankey Road.",
    ]),
    news: to_owned(&[
        "Metro extension work to begin on Bannerghatta Road.",
        "New traffic signals installed at 20 junctions.",
        "BMTC introduces 10 new bus routes to reduce congestion.",
        "Traffic police deployment increased during peak hours.",
        "Digital advisory boards installed on major highways.",
    ]),
});

/// Process-wide catalog served whenever the live pipeline fails.
pub fn fallback() -> &'static TrafficReport {
    &FALLBACK
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Tests ──
