use crate::{
    error::{Result, StreamflowError},
    metrics,
    playback::PlayerEvent,
    schedule::{AdInsertion, ConfigurationError},
    server::state::AppState,
    session::{SessionInfo, SessionReply},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub video_id: String,
    /// Session to tear down once the new one is mounted (video swap)
    #[serde(default)]
    pub replaces: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session: SessionInfo,
    pub schedule: Vec<AdInsertion>,
    pub warnings: Vec<ConfigurationError>,
}

/// Mount a player for a video. The schedule is merged once, here, and stays
/// fixed for the session's lifetime.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>)> {
    let start = Instant::now();
    let (video, schedule) = state.catalog.schedule_for(&req.video_id)?;

    let session = state.sessions.create(
        &video.id,
        schedule.insertions.clone(),
        &state.catalog.player_settings(),
    );

    if let Some(old) = req.replaces.as_deref()
        && state.sessions.remove(old).is_some()
    {
        info!("Session {} replaced by {}", old, session.session_id);
    }

    metrics::record_request("session_create", 201);
    metrics::record_duration("session_create", start);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session,
            schedule: schedule.insertions,
            warnings: schedule.warnings,
        }),
    ))
}

/// Status plus commands queued since the last reply
pub async fn poll_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionReply>> {
    let reply = state.sessions.poll(&id).await?;
    metrics::record_request("session_poll", 200);
    Ok(Json(reply))
}

/// Feed one shell event into the session's state machine
pub async fn post_event(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(event): Json<PlayerEvent>,
) -> Result<Json<SessionReply>> {
    let start = Instant::now();
    debug!("Event for session {}: {:?}", id, event);

    let reply = state.sessions.send(&id, event).await?;

    metrics::record_request("session_event", 200);
    metrics::record_duration("session_event", start);
    Ok(Json(reply))
}

pub async fn delete_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    state
        .sessions
        .remove(&id)
        .ok_or(StreamflowError::SessionNotFound(id))?;
    metrics::record_request("session_delete", 204);
    Ok(StatusCode::NO_CONTENT)
}
