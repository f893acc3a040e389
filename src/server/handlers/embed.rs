use crate::{
    error::{Result, StreamflowError},
    metrics,
    models::{PlayerSettings, Video},
    schedule::{AdInsertion, ConfigurationError},
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct EmbedParams {
    mode: Option<String>,
    id: Option<String>,
}

/// Everything an embedded player needs to mount
#[derive(Debug, Serialize)]
pub struct EmbedPayload {
    pub video: Video,
    pub schedule: Vec<AdInsertion>,
    pub warnings: Vec<ConfigurationError>,
    pub player: PlayerSettings,
    /// Link to paste into an iframe `src`
    pub embed_url: String,
}

/// Resolve `?mode=embed&id=<videoId>` into a video, its schedule and the
/// player branding.
pub async fn serve_embed(
    Query(params): Query<EmbedParams>,
    State(state): State<AppState>,
) -> Result<Json<EmbedPayload>> {
    if params.mode.as_deref() != Some("embed") {
        return Err(StreamflowError::InvalidRequest(
            "Expected mode=embed".to_string(),
        ));
    }
    let id = params
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StreamflowError::InvalidRequest("Missing video id".to_string()))?;

    let (video, schedule) = state.catalog.schedule_for(&id)?;
    info!("Embedding video {}", video.id);
    metrics::record_request("embed", 200);

    let embed_url = embed_url(&state.config.base_url, &video.id);
    Ok(Json(EmbedPayload {
        video,
        schedule: schedule.insertions,
        warnings: schedule.warnings,
        player: state.catalog.player_settings(),
        embed_url,
    }))
}

fn embed_url(base_url: &str, video_id: &str) -> String {
    let mut url = format!("{}/embed", base_url.trim_end_matches('/'));
    url.push_str("?mode=embed&id=");
    url.push_str(&url::form_urlencoded::byte_serialize(video_id.as_bytes()).collect::<String>());
    url
}
