//! Ad schedule computation.
//!
//! Combines a video's manually placed ads with the global injection rule
//! into one ordered list of [`AdInsertion`]s. See [`merge`] for the rules.

pub mod merge;

pub use merge::{check_rule, merge, merge_for_video};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum separation between a global candidate and any existing entry.
pub const CONFLICT_WINDOW_SECS: f64 = 30.0;

/// Upper bound on generated global candidates for one video.
pub const MAX_GLOBAL_CANDIDATES: u64 = 100_000;

/// Where an insertion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdOrigin {
    Manual,
    GlobalDirect,
    GlobalCampaign,
}

/// A resolved ad break the playback machine can fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdInsertion {
    pub id: String,
    /// Seconds into the primary stream at which the ad fires
    pub start_time: f64,
    /// Seconds the ad stream plays for
    pub duration: f64,
    /// Seconds into the ad after which skipping is permitted
    pub skip_after: f64,
    pub ad_stream_locator: String,
    pub click_through: Option<String>,
    pub label: String,
    pub origin: AdOrigin,
}

/// Problems with the ad configuration. Never fatal: the merger drops the
/// offending input and reports it alongside the schedule.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConfigurationError {
    #[error("Global ad interval must be positive, got {0}")]
    NonPositiveInterval(f64),

    #[error("Global ad rule is in campaign mode but no campaign is selected")]
    EmptyCampaignId,

    #[error("Global ad rule references unknown campaign '{0}'")]
    UnknownCampaign(String),

    #[error("Global ad rule is in direct mode but has no ad stream locator")]
    EmptyDirectLocator,

    #[error("Global ad duration must be positive, got {0}")]
    NonPositiveAdDuration(f64),

    #[error("Manual ad '{0}' has an invalid start time or duration")]
    InvalidManualAd(String),

    #[error("Ad id '{0}' is used more than once")]
    DuplicateAdId(String),

    #[error("Global ad rule would generate more than {0} insertions")]
    TooManyCandidates(u64),
}

/// Output of a merge: ordered insertions plus configuration warnings for the
/// caller to surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schedule {
    pub insertions: Vec<AdInsertion>,
    pub warnings: Vec<ConfigurationError>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.insertions.len()
    }

    /// Start times in schedule order.
    pub fn start_times(&self) -> Vec<f64> {
        self.insertions.iter().map(|ad| ad.start_time).collect()
    }
}
