use crate::{
    error::Result,
    metrics,
    schedule::{AdInsertion, ConfigurationError},
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub video_id: String,
    pub duration: f64,
    pub insertions: Vec<AdInsertion>,
    pub warnings: Vec<ConfigurationError>,
}

/// Merged ad schedule for a video under the current global rule
pub async fn serve_schedule(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ScheduleResponse>> {
    let start = Instant::now();
    let (video, schedule) = state.catalog.schedule_for(&id)?;

    info!(
        "Serving ad schedule for video {}: {} insertions",
        video.id,
        schedule.len()
    );
    metrics::record_request("schedule", 200);
    metrics::record_duration("schedule", start);

    Ok(Json(ScheduleResponse {
        video_id: video.id,
        duration: video.duration,
        insertions: schedule.insertions,
        warnings: schedule.warnings,
    }))
}
