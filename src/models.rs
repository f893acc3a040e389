//! Catalog records shared by the schedule merger, the playback machine and
//! the HTTP layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A manually placed ad on a single video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdConfig {
    pub id: String,
    /// When the ad starts in the primary stream (seconds)
    pub start_time: f64,
    /// How long the ad plays (seconds)
    pub duration: f64,
    /// Seconds into the ad after which skipping is allowed
    pub skip_after: f64,
    /// Click-through target; empty means none
    #[serde(default)]
    pub redirect_url: String,
    /// Ad media locator
    pub video_src: String,
    pub title: String,
}

/// Sponsored creative that the global rule can point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub video_src: String,
    #[serde(default)]
    pub redirect_url: String,
    pub default_duration: f64,
    pub default_skip_after: f64,
    /// Display counters only, never aggregated here
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
}

/// Where globally injected ads come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InjectionSource {
    /// Creative configured inline on the rule
    Direct {
        ad_stream_locator: String,
        #[serde(default)]
        click_through: Option<String>,
        duration: f64,
        skip_after: f64,
    },
    /// Creative taken from the campaign catalog
    Campaign { campaign_id: String },
}

/// Recurring ad rule applied to every video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalInjectionRule {
    pub enabled: bool,
    /// Recurrence period in seconds
    pub interval_seconds: f64,
    pub source: InjectionSource,
}

impl GlobalInjectionRule {
    /// Build a rule from a period expressed in minutes, the unit the admin
    /// console uses.
    pub fn every_minutes(minutes: f64, source: InjectionSource) -> Self {
        Self {
            enabled: true,
            interval_seconds: minutes * 60.0,
            source,
        }
    }
}

impl Default for GlobalInjectionRule {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 300.0,
            source: InjectionSource::Direct {
                ad_stream_locator: String::new(),
                click_through: None,
                duration: 15.0,
                skip_after: 5.0,
            },
        }
    }
}

/// Publication status of a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    #[default]
    Active,
    Processing,
    Error,
    Inactive,
}

/// A hosted video and its manually placed ads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    pub url: String,
    /// Total duration in seconds
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub upload_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default)]
    pub ads: Vec<AdConfig>,
}

/// Corner the watermark logo is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Player branding. Only `auto_play` influences playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSettings {
    pub primary_color: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub logo_position: LogoPosition,
    pub logo_opacity: f64,
    #[serde(default)]
    pub auto_play: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            primary_color: "#ef4444".to_string(),
            logo_url: String::new(),
            logo_position: LogoPosition::TopRight,
            logo_opacity: 0.8,
            auto_play: false,
        }
    }
}
