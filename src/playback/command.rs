use serde::{Deserialize, Serialize};

/// Input delivered by the player shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Elapsed-time notification from the primary transport
    TimeUpdate { time: f64 },
    /// Primary metadata became available
    LoadedMetadata { duration: f64 },
    Play,
    Pause,
    TogglePlay,
    Seek { time: f64 },
    /// User pressed the skip button
    Skip,
    /// User clicked the ad surface or the advertiser link
    AdClick,
    SetVolume { volume: f64 },
    SetMuted { muted: bool },
    ToggleMute,
    /// Primary transport is waiting for data
    Buffering,
    /// Primary transport has enough data to continue
    CanPlay,
    /// Primary transport reached the end of the stream
    Ended,
    PrimaryError { message: String },
    AdError { message: String },
    EnterFullscreen,
    ExitFullscreen,
}

/// Transport instruction for the shell to carry out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    PlayPrimary,
    PausePrimary,
    SeekPrimary { time: f64 },
    /// Applies to both transports
    SetMuted { muted: bool },
    /// Applies to both transports
    SetVolume { volume: f64 },
    /// Load and start the ad transport
    StartAd { insertion_id: String, locator: String },
    PlayAd,
    PauseAd,
    /// Unload the ad transport
    StopAd,
    /// Open a link in a new browsing context
    OpenExternalLink { url: String },
    EnterFullscreen,
    ExitFullscreen,
    ReportError { message: String },
}
