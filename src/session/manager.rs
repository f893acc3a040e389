use super::actor::{self, SessionMsg, SessionReply};
use super::timer::TokioAdTimer;
use crate::error::{Result, StreamflowError};
use crate::metrics;
use crate::models::PlayerSettings;
use crate::playback::{PlaybackMachine, PlayerEvent};
use crate::schedule::AdInsertion;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Mailbox depth per session.
const MAILBOX_CAPACITY: usize = 64;

/// Metadata kept for each live player session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub video_id: String,
    #[serde(with = "epoch_secs")]
    pub created_at: SystemTime,
    #[serde(with = "epoch_secs")]
    pub last_accessed: SystemTime,
}

/// Serde helper: SystemTime ↔ u64 epoch seconds
mod epoch_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        serializer.serialize_u64(secs)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

struct SessionHandle {
    info: SessionInfo,
    tx: mpsc::Sender<SessionMsg>,
    cancel: CancellationToken,
}

/// Registry of live playback sessions, one task each
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, SessionHandle>>,
    ttl: Duration,
    tick_period: Duration,
}

impl SessionManager {
    /// Create a manager whose ad countdowns tick every `tick_period`.
    pub fn new(ttl: Duration, tick_period: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
            tick_period,
        }
    }

    /// Mount a player for `video_id` over an already merged schedule and
    /// spawn its session task. Must be called inside a tokio runtime.
    pub fn create(
        &self,
        video_id: &str,
        schedule: Vec<AdInsertion>,
        settings: &PlayerSettings,
    ) -> SessionInfo {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let cancel = CancellationToken::new();

        let timer = TokioAdTimer::new(tx.clone(), self.tick_period);
        let machine = PlaybackMachine::new(schedule, settings, Box::new(timer));
        tokio::spawn(actor::run(
            session_id.clone(),
            machine,
            rx,
            cancel.clone(),
        ));

        let now = SystemTime::now();
        let info = SessionInfo {
            session_id: session_id.clone(),
            video_id: video_id.to_string(),
            created_at: now,
            last_accessed: now,
        };
        self.sessions.insert(
            session_id.clone(),
            SessionHandle {
                info: info.clone(),
                tx,
                cancel,
            },
        );

        info!("Created session {} for video {}", session_id, video_id);
        metrics::set_active_sessions(self.sessions.len());
        info
    }

    /// Deliver a shell event and wait for the session's reply.
    pub async fn send(&self, session_id: &str, event: PlayerEvent) -> Result<SessionReply> {
        let tx = self.sender(session_id)?;
        let (reply, rx) = oneshot::channel();
        tx.send(SessionMsg::Event { event, reply })
            .await
            .map_err(|_| StreamflowError::SessionClosed(session_id.to_string()))?;
        rx.await
            .map_err(|_| StreamflowError::SessionClosed(session_id.to_string()))
    }

    /// Current status plus commands produced since the last reply.
    pub async fn poll(&self, session_id: &str) -> Result<SessionReply> {
        let tx = self.sender(session_id)?;
        let (reply, rx) = oneshot::channel();
        tx.send(SessionMsg::Status { reply })
            .await
            .map_err(|_| StreamflowError::SessionClosed(session_id.to_string()))?;
        rx.await
            .map_err(|_| StreamflowError::SessionClosed(session_id.to_string()))
    }

    /// Get a session's metadata by ID
    pub fn get(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.get(session_id).map(|h| h.info.clone())
    }

    /// Tear down a session. Its task stops and any ad countdown is cancelled.
    pub fn remove(&self, session_id: &str) -> Option<SessionInfo> {
        let removed = self.sessions.remove(session_id).map(|(_, handle)| {
            handle.cancel.cancel();
            info!("Removed session {}", session_id);
            handle.info
        });
        metrics::set_active_sessions(self.sessions.len());
        removed
    }

    /// Tear down sessions idle for longer than the TTL
    pub fn cleanup_expired(&self) {
        let now = SystemTime::now();
        self.sessions.retain(|_, handle| {
            let alive = match now.duration_since(handle.info.last_accessed) {
                Ok(elapsed) => elapsed < self.ttl,
                Err(_) => true,
            };
            if !alive {
                info!("Expiring idle session {}", handle.info.session_id);
                handle.cancel.cancel();
            }
            alive
        });
        metrics::set_active_sessions(self.sessions.len());
    }

    /// Get the count of active sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Tear down every session, e.g. on server shutdown
    pub fn shutdown_all(&self) {
        for entry in self.sessions.iter() {
            entry.cancel.cancel();
        }
        self.sessions.clear();
        metrics::set_active_sessions(0);
    }

    /// Refresh the access time and clone the mailbox sender. The map guard
    /// is released before any await.
    fn sender(&self, session_id: &str) -> Result<mpsc::Sender<SessionMsg>> {
        let mut handle = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StreamflowError::SessionNotFound(session_id.to_string()))?;
        handle.info.last_accessed = SystemTime::now();
        Ok(handle.tx.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GlobalInjectionRule, InjectionSource};
    use crate::playback::{AdState, PlaybackState, PlayerCommand, PrimaryState};
    use crate::schedule::merge;

    fn schedule() -> Vec<AdInsertion> {
        let rule = GlobalInjectionRule {
            enabled: true,
            interval_seconds: 300.0,
            source: InjectionSource::Direct {
                ad_stream_locator: "https://ads.example.com/a.mp4".to_string(),
                click_through: None,
                duration: 15.0,
                skip_after: 5.0,
            },
        };
        merge("1", &[], &rule, &[], 600.0).insertions
    }

    fn manager() -> SessionManager {
        SessionManager::new(Duration::from_secs(300), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_session_creation() {
        let manager = manager();
        let info = manager.create("1", schedule(), &PlayerSettings::default());

        assert_eq!(info.video_id, "1");
        assert_eq!(manager.session_count(), 1);
        assert!(manager.get(&info.session_id).is_some());
    }

    #[tokio::test]
    async fn test_session_removal() {
        let manager = manager();
        let info = manager.create("1", schedule(), &PlayerSettings::default());

        assert!(manager.remove(&info.session_id).is_some());
        assert_eq!(manager.session_count(), 0);

        let err = manager.poll(&info.session_id).await.unwrap_err();
        assert!(matches!(err, StreamflowError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn remove_nonexistent_returns_none() {
        let manager = manager();
        assert!(manager.remove("no-such-session").is_none());
    }

    #[tokio::test]
    async fn autoplay_command_is_delivered_on_first_poll() {
        let manager = manager();
        let settings = PlayerSettings {
            auto_play: true,
            ..Default::default()
        };
        let info = manager.create("1", schedule(), &settings);

        let reply = manager.poll(&info.session_id).await.unwrap();
        assert_eq!(reply.commands, vec![PlayerCommand::PlayPrimary]);
        assert_eq!(
            reply.status.state,
            PlaybackState::Primary(PrimaryState::Playing)
        );

        let reply = manager.poll(&info.session_id).await.unwrap();
        assert!(reply.commands.is_empty(), "commands are drained once");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_completes_ad_on_virtual_time() {
        let manager = manager();
        let info = manager.create("1", schedule(), &PlayerSettings::default());
        let id = info.session_id.as_str();

        manager.send(id, PlayerEvent::Play).await.unwrap();
        let reply = manager
            .send(id, PlayerEvent::TimeUpdate { time: 300.0 })
            .await
            .unwrap();
        assert_eq!(reply.status.state, PlaybackState::Ad(AdState::Playing));

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        let reply = manager.poll(id).await.unwrap();
        let ad = reply.status.ad.expect("ad should still be running");
        assert_eq!(ad.elapsed, 5.0);
        assert!(ad.skip_available);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let reply = manager.poll(id).await.unwrap();
        assert_eq!(
            reply.status.state,
            PlaybackState::Primary(PrimaryState::Playing)
        );
        assert_eq!(
            reply.commands,
            vec![PlayerCommand::StopAd, PlayerCommand::PlayPrimary]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn removed_session_stops_counting_down() {
        let manager = manager();
        let info = manager.create("1", schedule(), &PlayerSettings::default());
        let id = info.session_id.clone();

        manager.send(&id, PlayerEvent::Play).await.unwrap();
        let reply = manager
            .send(&id, PlayerEvent::TimeUpdate { time: 300.0 })
            .await
            .unwrap();
        assert_eq!(reply.status.state, PlaybackState::Ad(AdState::Playing));

        // Same mailbox the countdown task posts its ticks into
        let mailbox = manager.sender(&id).unwrap();
        manager.remove(&id);

        tokio::time::timeout(Duration::from_secs(5), mailbox.closed())
            .await
            .expect("session task should drop its mailbox on teardown");
        assert!(
            mailbox.send(SessionMsg::AdTick { epoch: 1 }).await.is_err(),
            "no tick can land after teardown"
        );
        assert!(manager.get(&id).is_none());
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn cleanup_expired_removes_stale_sessions() {
        // Very short TTL so sessions expire almost immediately.
        let manager = SessionManager::new(Duration::from_millis(1), Duration::from_secs(1));
        let info = manager.create("1", schedule(), &PlayerSettings::default());
        assert_eq!(manager.session_count(), 1);

        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.cleanup_expired();

        assert_eq!(
            manager.session_count(),
            0,
            "Stale session should be removed"
        );
        assert!(manager.get(&info.session_id).is_none());
    }

    #[tokio::test]
    async fn shutdown_all_clears_registry() {
        let manager = manager();
        manager.create("1", schedule(), &PlayerSettings::default());
        manager.create("2", Vec::new(), &PlayerSettings::default());
        manager.shutdown_all();
        assert_eq!(manager.session_count(), 0);
    }
}
