//! In-memory catalog of videos, campaigns and player/ad settings.
//!
//! Seeded from a JSON snapshot file (or built-in demo data in dev) and
//! written back on settings changes. Persistence is best effort.

use crate::error::{Result, StreamflowError};
use crate::metrics;
use crate::models::{
    AdConfig, Campaign, GlobalInjectionRule, InjectionSource, PlayerSettings, Video, VideoStatus,
};
use crate::schedule::{self, Schedule};
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// On-disk shape of the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub ad_settings: GlobalInjectionRule,
    #[serde(default)]
    pub player_settings: PlayerSettings,
}

struct CatalogInner {
    videos: DashMap<String, Video>,
    campaigns: DashMap<String, Campaign>,
    ad_settings: RwLock<GlobalInjectionRule>,
    player_settings: RwLock<PlayerSettings>,
    path: Option<PathBuf>,
}

/// Shared handle to the catalog
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

impl Catalog {
    /// Build a catalog from a snapshot. `path` is where [`Catalog::persist`]
    /// writes; `None` keeps everything in memory.
    pub fn from_snapshot(snapshot: CatalogSnapshot, path: Option<PathBuf>) -> Self {
        let videos = snapshot
            .videos
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();
        let campaigns = snapshot
            .campaigns
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        Self {
            inner: Arc::new(CatalogInner {
                videos,
                campaigns,
                ad_settings: RwLock::new(snapshot.ad_settings),
                player_settings: RwLock::new(snapshot.player_settings),
                path,
            }),
        }
    }

    /// Load a snapshot file. A missing file yields the demo catalog bound to
    /// that path, so the first write creates it.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let snapshot: CatalogSnapshot = serde_json::from_str(&content)?;
                info!(
                    "Loaded catalog from {}: {} videos, {} campaigns",
                    path.display(),
                    snapshot.videos.len(),
                    snapshot.campaigns.len()
                );
                Ok(Self::from_snapshot(snapshot, Some(path.to_path_buf())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No catalog at {}, starting from demo data",
                    path.display()
                );
                Ok(Self::from_snapshot(
                    demo_snapshot(),
                    Some(path.to_path_buf()),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Demo catalog kept in memory only.
    pub fn demo() -> Self {
        Self::from_snapshot(demo_snapshot(), None)
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            videos: self.videos(),
            campaigns: self.campaigns(),
            ad_settings: self.ad_settings(),
            player_settings: self.player_settings(),
        }
    }

    /// Write the catalog back to its snapshot file, if it has one.
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        let body = serde_json::to_string_pretty(&self.snapshot())?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Catalog written to {}", path.display());
        Ok(())
    }

    /// All videos ordered by id
    pub fn videos(&self) -> Vec<Video> {
        let mut videos: Vec<Video> = self.inner.videos.iter().map(|v| v.clone()).collect();
        videos.sort_by(|a, b| a.id.cmp(&b.id));
        videos
    }

    pub fn video(&self, id: &str) -> Option<Video> {
        self.inner.videos.get(id).map(|v| v.clone())
    }

    pub fn video_count(&self) -> usize {
        self.inner.videos.len()
    }

    /// All campaigns ordered by id
    pub fn campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> =
            self.inner.campaigns.iter().map(|c| c.clone()).collect();
        campaigns.sort_by(|a, b| a.id.cmp(&b.id));
        campaigns
    }

    pub fn ad_settings(&self) -> GlobalInjectionRule {
        self.inner
            .ad_settings
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set_ad_settings(&self, rule: GlobalInjectionRule) {
        info!(
            "Global ad rule updated: enabled={} interval={}s",
            rule.enabled, rule.interval_seconds
        );
        *self
            .inner
            .ad_settings
            .write()
            .unwrap_or_else(|p| p.into_inner()) = rule;
    }

    pub fn player_settings(&self) -> PlayerSettings {
        self.inner
            .player_settings
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set_player_settings(&self, settings: PlayerSettings) {
        *self
            .inner
            .player_settings
            .write()
            .unwrap_or_else(|p| p.into_inner()) = settings;
    }

    /// Resolve a video and merge its schedule against the current rule and
    /// campaigns.
    pub fn schedule_for(&self, video_id: &str) -> Result<(Video, Schedule)> {
        let video = self
            .video(video_id)
            .ok_or_else(|| StreamflowError::VideoNotFound(video_id.to_string()))?;
        let schedule =
            schedule::merge_for_video(&video, &self.ad_settings(), &self.campaigns());
        metrics::record_schedule_warnings(schedule.warnings.len());
        Ok((video, schedule))
    }
}

const SAMPLE_BASE: &str = "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample";

fn sample(file: &str) -> String {
    format!("{}/{}", SAMPLE_BASE, file)
}

fn demo_video(id: &str, title: &str, file: &str, duration: f64, views: u64, day: u32) -> Video {
    Video {
        id: id.to_string(),
        title: title.to_string(),
        thumbnail: format!("https://picsum.photos/800/450?random={}", id),
        url: sample(file),
        duration,
        views,
        upload_date: NaiveDate::from_ymd_opt(2023, 10, day),
        status: VideoStatus::Active,
        ads: Vec::new(),
    }
}

/// Sample catalog used in dev mode and for a fresh snapshot file.
pub fn demo_snapshot() -> CatalogSnapshot {
    let mut forest = demo_video(
        "1",
        "Nature Documentary: The Forest",
        "BigBuckBunny.mp4",
        596.0,
        12543,
        24,
    );
    forest.ads.push(AdConfig {
        id: "ad1".to_string(),
        start_time: 10.0,
        duration: 15.0,
        skip_after: 5.0,
        redirect_url: "https://example.com/store".to_string(),
        video_src: sample("ForBiggerJoyrides.mp4"),
        title: "Tech Store Promo".to_string(),
    });

    let mut mars = demo_video(
        "3",
        "Space Exploration: Mars",
        "TearsOfSteel.mp4",
        734.0,
        5432,
        26,
    );
    mars.status = VideoStatus::Inactive;

    CatalogSnapshot {
        videos: vec![
            forest,
            demo_video(
                "2",
                "Coding Tutorial: React Basics",
                "ElephantsDream.mp4",
                653.0,
                8900,
                25,
            ),
            mars,
            demo_video(
                "4",
                "Cooking Masterclass: Pasta",
                "Sintel.mp4",
                888.0,
                1200,
                27,
            ),
        ],
        campaigns: vec![
            Campaign {
                id: "c1".to_string(),
                name: "Betting App Promo (Winter)".to_string(),
                video_src: sample("ForBiggerJoyrides.mp4"),
                redirect_url: "https://betting-site-example.com".to_string(),
                default_duration: 15.0,
                default_skip_after: 5.0,
                impressions: 45000,
                clicks: 1200,
            },
            Campaign {
                id: "c2".to_string(),
                name: "Tech Store Sale 11.11".to_string(),
                video_src: sample("ForBiggerEscapes.mp4"),
                redirect_url: "https://tech-store-example.com/sale".to_string(),
                default_duration: 30.0,
                default_skip_after: 10.0,
                impressions: 22000,
                clicks: 800,
            },
        ],
        ad_settings: GlobalInjectionRule {
            enabled: false,
            interval_seconds: 300.0,
            source: InjectionSource::Direct {
                ad_stream_locator: sample("ForBiggerJoyrides.mp4"),
                click_through: Some("https://adsterra.com/example".to_string()),
                duration: 15.0,
                skip_after: 5.0,
            },
        },
        player_settings: PlayerSettings::default(),
    }
}
