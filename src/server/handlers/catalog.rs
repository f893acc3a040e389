use crate::{
    error::{Result, StreamflowError},
    metrics,
    models::{Campaign, GlobalInjectionRule, InjectionSource, PlayerSettings, Video},
    schedule::{self, ConfigurationError},
    server::{state::AppState, url_validation},
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Global rule plus the warnings it would raise on every merge
#[derive(Debug, Serialize)]
pub struct AdSettingsResponse {
    pub rule: GlobalInjectionRule,
    pub warnings: Vec<ConfigurationError>,
}

pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<Video>> {
    metrics::record_request("videos", 200);
    Json(state.catalog.videos())
}

pub async fn get_video(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Video>> {
    let video = state
        .catalog
        .video(&id)
        .ok_or(StreamflowError::VideoNotFound(id))?;
    metrics::record_request("video", 200);
    Ok(Json(video))
}

pub async fn list_campaigns(State(state): State<AppState>) -> Json<Vec<Campaign>> {
    metrics::record_request("campaigns", 200);
    Json(state.catalog.campaigns())
}

pub async fn get_ad_settings(State(state): State<AppState>) -> Json<AdSettingsResponse> {
    let rule = state.catalog.ad_settings();
    let warnings = schedule::check_rule(&rule, &state.catalog.campaigns());
    Json(AdSettingsResponse { rule, warnings })
}

/// Replace the global injection rule.
///
/// Malformed URLs are rejected. Rule problems the merger tolerates (empty
/// source, unknown campaign, non-positive interval) are stored and reported
/// back as warnings.
pub async fn put_ad_settings(
    State(state): State<AppState>,
    Json(rule): Json<GlobalInjectionRule>,
) -> Result<Json<AdSettingsResponse>> {
    let start = Instant::now();

    if let InjectionSource::Direct {
        ad_stream_locator,
        click_through,
        duration,
        skip_after,
    } = &rule.source
    {
        url_validation::validate_optional_url(Some(ad_stream_locator.as_str()))?;
        url_validation::validate_optional_url(click_through.as_deref())?;
        if !duration.is_finite() || !skip_after.is_finite() {
            return Err(StreamflowError::InvalidRequest(
                "Ad duration and skip offset must be finite".to_string(),
            ));
        }
    }

    let warnings = schedule::check_rule(&rule, &state.catalog.campaigns());
    if !warnings.is_empty() {
        info!("Storing global ad rule with {} warnings", warnings.len());
    }
    state.catalog.set_ad_settings(rule.clone());
    persist(&state).await;

    metrics::record_request("settings_ads", 200);
    metrics::record_duration("settings_ads", start);
    Ok(Json(AdSettingsResponse { rule, warnings }))
}

pub async fn get_player_settings(State(state): State<AppState>) -> Json<PlayerSettings> {
    Json(state.catalog.player_settings())
}

pub async fn put_player_settings(
    State(state): State<AppState>,
    Json(settings): Json<PlayerSettings>,
) -> Result<Json<PlayerSettings>> {
    if !(0.0..=1.0).contains(&settings.logo_opacity) {
        return Err(StreamflowError::InvalidRequest(format!(
            "logo_opacity must be within 0..=1, got {}",
            settings.logo_opacity
        )));
    }
    if settings.primary_color.trim().is_empty() {
        return Err(StreamflowError::InvalidRequest(
            "primary_color must not be empty".to_string(),
        ));
    }
    url_validation::validate_optional_url(Some(settings.logo_url.as_str()))?;

    info!("Player settings updated");
    state.catalog.set_player_settings(settings.clone());
    persist(&state).await;

    metrics::record_request("settings_player", 200);
    Ok(Json(settings))
}

/// Settings stay applied in memory even if the snapshot cannot be written.
async fn persist(state: &AppState) {
    if let Err(e) = state.catalog.persist().await {
        warn!("Failed to persist catalog: {}", e);
    }
}
