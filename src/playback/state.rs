use serde::Serialize;
use std::fmt;

/// Leaf states while the primary stream owns the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryState {
    Idle,
    Playing,
    Paused,
    Buffering,
    Error,
}

/// Leaf states while an ad interrupts the primary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdState {
    Playing,
    Paused,
}

/// The machine's current leaf state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    Primary(PrimaryState),
    Ad(AdState),
}

impl PlaybackState {
    pub fn is_ad(&self) -> bool {
        matches!(self, PlaybackState::Ad(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Primary(state) => write!(f, "primary.{:?}", state),
            PlaybackState::Ad(state) => write!(f, "ad.{:?}", state),
        }
    }
}

/// Progress of the ad currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdStatus {
    pub insertion_id: String,
    pub label: String,
    pub elapsed: f64,
    pub remaining: f64,
    pub skip_available: bool,
    /// Seconds until skipping unlocks, zero once it has
    pub skip_in: f64,
    pub click_through: Option<String>,
}

/// Read-only view of a playback session for the shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub volume: f64,
    pub muted: bool,
    pub fullscreen: bool,
    pub ad: Option<AdStatus>,
    pub fired_ads: Vec<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_leaf_state() {
        assert_eq!(
            PlaybackState::Primary(PrimaryState::Buffering).to_string(),
            "primary.Buffering"
        );
        assert_eq!(PlaybackState::Ad(AdState::Paused).to_string(), "ad.Paused");
    }

    #[test]
    fn serializes_with_mode_tag() {
        let json = serde_json::to_value(PlaybackState::Ad(AdState::Playing)).unwrap();
        assert_eq!(json["mode"], "ad");
        assert_eq!(json["state"], "playing");
    }
}
