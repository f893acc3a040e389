//! Playback interruption state machine.
//!
//! One [`PlaybackMachine`] per mounted player. It consumes shell events and
//! countdown ticks, and answers each with the transport commands the shell
//! must carry out. All decisions are synchronous.

use super::command::{PlayerCommand, PlayerEvent};
use super::state::{AdState, AdStatus, PlaybackState, PlaybackStatus, PrimaryState};
use super::timer::{AdTimer, CountdownGuard};
use crate::metrics;
use crate::models::PlayerSettings;
use crate::schedule::AdInsertion;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An ad fires when a time update lands this close to its start time.
pub const DETECTION_TOLERANCE_SECS: f64 = 1.0;

/// Seconds removed from the ad countdown per tick.
pub const COUNTDOWN_STEP_SECS: f64 = 1.0;

enum AdPhase {
    /// Countdown running; dropping the guard stops it
    Playing(CountdownGuard),
    Paused,
}

struct ActiveAd {
    insertion: AdInsertion,
    remaining: f64,
    skip_available: bool,
    /// Epoch of the countdown this ad is listening to
    epoch: u64,
    phase: AdPhase,
}

impl ActiveAd {
    fn elapsed(&self) -> f64 {
        self.insertion.duration - self.remaining
    }
}

enum Mode {
    Primary(PrimaryState),
    Ad(ActiveAd),
}

/// Drives one player through primary playback and ad interruptions.
pub struct PlaybackMachine {
    schedule: Arc<[AdInsertion]>,
    timer: Box<dyn AdTimer>,
    mode: Mode,
    auto_play: bool,
    current_time: f64,
    duration: Option<f64>,
    fired: HashSet<String>,
    fired_order: Vec<String>,
    /// Whether the user wants the primary stream running; decides where
    /// `Buffering` returns to
    wants_play: bool,
    volume: f64,
    muted: bool,
    fullscreen: bool,
    error: Option<String>,
    epoch: u64,
}

impl PlaybackMachine {
    /// Create a machine over an already merged schedule. The schedule is
    /// fixed for the lifetime of the machine.
    pub fn new(
        schedule: impl Into<Arc<[AdInsertion]>>,
        settings: &PlayerSettings,
        timer: Box<dyn AdTimer>,
    ) -> Self {
        Self {
            schedule: schedule.into(),
            timer,
            mode: Mode::Primary(PrimaryState::Idle),
            auto_play: settings.auto_play,
            current_time: 0.0,
            duration: None,
            fired: HashSet::new(),
            fired_order: Vec::new(),
            wants_play: false,
            volume: 1.0,
            muted: false,
            fullscreen: false,
            error: None,
            epoch: 0,
        }
    }

    /// Commands to issue when the player mounts.
    pub fn start(&mut self) -> Vec<PlayerCommand> {
        if self.auto_play {
            debug!("Autoplay enabled, starting primary playback");
            self.play()
        } else {
            Vec::new()
        }
    }

    pub fn state(&self) -> PlaybackState {
        match &self.mode {
            Mode::Primary(state) => PlaybackState::Primary(*state),
            Mode::Ad(ad) => match ad.phase {
                AdPhase::Playing(_) => PlaybackState::Ad(AdState::Playing),
                AdPhase::Paused => PlaybackState::Ad(AdState::Paused),
            },
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        let ad = match &self.mode {
            Mode::Ad(ad) => Some(AdStatus {
                insertion_id: ad.insertion.id.clone(),
                label: ad.insertion.label.clone(),
                elapsed: ad.elapsed(),
                remaining: ad.remaining.max(0.0),
                skip_available: ad.skip_available,
                skip_in: (ad.insertion.skip_after - ad.elapsed()).max(0.0),
                click_through: ad.insertion.click_through.clone(),
            }),
            Mode::Primary(_) => None,
        };

        PlaybackStatus {
            state: self.state(),
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
            muted: self.muted,
            fullscreen: self.fullscreen,
            ad,
            fired_ads: self.fired_order.clone(),
            error: self.error.clone(),
        }
    }

    /// Apply one shell event.
    pub fn handle(&mut self, event: PlayerEvent) -> Vec<PlayerCommand> {
        if matches!(self.mode, Mode::Primary(PrimaryState::Error)) {
            debug!("Ignoring {:?}: session is in error state", event);
            return Vec::new();
        }

        match event {
            PlayerEvent::TimeUpdate { time } => self.on_time_update(time),
            PlayerEvent::LoadedMetadata { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    self.duration = Some(duration);
                }
                Vec::new()
            }
            PlayerEvent::Play => self.play(),
            PlayerEvent::Pause => self.pause(),
            PlayerEvent::TogglePlay => self.toggle_play(),
            PlayerEvent::Seek { time } => self.seek(time),
            PlayerEvent::Skip => self.skip(),
            PlayerEvent::AdClick => self.click_ad(),
            PlayerEvent::SetVolume { volume } => self.set_volume(volume),
            PlayerEvent::SetMuted { muted } => self.set_muted(muted),
            PlayerEvent::ToggleMute => self.set_muted(!self.muted),
            PlayerEvent::Buffering => self.on_buffering(),
            PlayerEvent::CanPlay => self.on_can_play(),
            PlayerEvent::Ended => self.on_ended(),
            PlayerEvent::PrimaryError { message } => self.on_primary_error(message),
            PlayerEvent::AdError { message } => self.on_ad_error(message),
            PlayerEvent::EnterFullscreen => self.set_fullscreen(true),
            PlayerEvent::ExitFullscreen => self.set_fullscreen(false),
        }
    }

    /// Advance the ad countdown. Ticks from a countdown other than the live
    /// one are ignored.
    pub fn on_ad_tick(&mut self, epoch: u64) -> Vec<PlayerCommand> {
        let finished = {
            let Mode::Ad(ad) = &mut self.mode else {
                debug!("Dropping countdown tick {}: no ad is playing", epoch);
                return Vec::new();
            };
            if ad.epoch != epoch || !matches!(ad.phase, AdPhase::Playing(_)) {
                debug!(
                    "Dropping stale countdown tick {} (live epoch {})",
                    epoch, ad.epoch
                );
                return Vec::new();
            }

            ad.remaining -= COUNTDOWN_STEP_SECS;
            if !ad.skip_available && ad.elapsed() >= ad.insertion.skip_after {
                ad.skip_available = true;
                debug!("Skip unlocked for ad {}", ad.insertion.id);
            }
            ad.remaining <= 0.0
        };

        if finished {
            metrics::record_ad_event("completed");
            self.finish_ad()
        } else {
            Vec::new()
        }
    }

    /// Drop any running ad and invalidate outstanding countdown ticks.
    /// Called when the player unmounts or swaps videos.
    pub fn teardown(&mut self) {
        if let Mode::Ad(ad) = &self.mode {
            debug!("Tearing down session during ad {}", ad.insertion.id);
        }
        self.epoch += 1;
        self.mode = Mode::Primary(PrimaryState::Idle);
        self.wants_play = false;
    }

    fn on_time_update(&mut self, time: f64) -> Vec<PlayerCommand> {
        let Mode::Primary(state) = self.mode else {
            return Vec::new();
        };
        if !time.is_finite() || time < 0.0 {
            return Vec::new();
        }
        self.current_time = time;

        if state != PrimaryState::Playing {
            return Vec::new();
        }

        let due = self
            .schedule
            .iter()
            .find(|ad| {
                !self.fired.contains(&ad.id)
                    && (ad.start_time - time).abs() < DETECTION_TOLERANCE_SECS
            })
            .cloned();

        match due {
            Some(insertion) => self.enter_ad(insertion),
            None => Vec::new(),
        }
    }

    fn enter_ad(&mut self, insertion: AdInsertion) -> Vec<PlayerCommand> {
        info!(
            "Starting ad {} ({}) at {:.2}s",
            insertion.id, insertion.label, self.current_time
        );
        metrics::record_ad_event("impression");

        self.fired.insert(insertion.id.clone());
        self.fired_order.push(insertion.id.clone());

        self.epoch += 1;
        let guard = self.timer.start(self.epoch);

        let commands = vec![
            PlayerCommand::PausePrimary,
            PlayerCommand::StartAd {
                insertion_id: insertion.id.clone(),
                locator: insertion.ad_stream_locator.clone(),
            },
        ];

        self.mode = Mode::Ad(ActiveAd {
            remaining: insertion.duration,
            skip_available: insertion.skip_after <= 0.0,
            epoch: self.epoch,
            phase: AdPhase::Playing(guard),
            insertion,
        });

        commands
    }

    /// Leave the ad and resume the primary stream. Replacing the mode drops
    /// the countdown guard.
    fn finish_ad(&mut self) -> Vec<PlayerCommand> {
        let previous = std::mem::replace(&mut self.mode, Mode::Primary(PrimaryState::Playing));
        if let Mode::Ad(ad) = previous {
            info!("Ad {} finished, resuming primary stream", ad.insertion.id);
        }
        self.wants_play = true;
        vec![PlayerCommand::StopAd, PlayerCommand::PlayPrimary]
    }

    fn play(&mut self) -> Vec<PlayerCommand> {
        match &mut self.mode {
            Mode::Ad(ad) => {
                if matches!(ad.phase, AdPhase::Paused) {
                    self.epoch += 1;
                    ad.epoch = self.epoch;
                    ad.phase = AdPhase::Playing(self.timer.start(self.epoch));
                    vec![PlayerCommand::PlayAd]
                } else {
                    Vec::new()
                }
            }
            Mode::Primary(PrimaryState::Idle | PrimaryState::Paused) => {
                self.mode = Mode::Primary(PrimaryState::Playing);
                self.wants_play = true;
                vec![PlayerCommand::PlayPrimary]
            }
            Mode::Primary(PrimaryState::Buffering) => {
                self.wants_play = true;
                vec![PlayerCommand::PlayPrimary]
            }
            Mode::Primary(PrimaryState::Playing | PrimaryState::Error) => Vec::new(),
        }
    }

    fn pause(&mut self) -> Vec<PlayerCommand> {
        match &mut self.mode {
            Mode::Ad(ad) => {
                if matches!(ad.phase, AdPhase::Playing(_)) {
                    ad.phase = AdPhase::Paused;
                    vec![PlayerCommand::PauseAd]
                } else {
                    Vec::new()
                }
            }
            Mode::Primary(PrimaryState::Playing) => {
                self.mode = Mode::Primary(PrimaryState::Paused);
                self.wants_play = false;
                vec![PlayerCommand::PausePrimary]
            }
            Mode::Primary(PrimaryState::Buffering) => {
                self.wants_play = false;
                vec![PlayerCommand::PausePrimary]
            }
            Mode::Primary(_) => Vec::new(),
        }
    }

    fn toggle_play(&mut self) -> Vec<PlayerCommand> {
        let running = match &self.mode {
            Mode::Ad(ad) => matches!(ad.phase, AdPhase::Playing(_)),
            Mode::Primary(PrimaryState::Playing) => true,
            Mode::Primary(PrimaryState::Buffering) => self.wants_play,
            Mode::Primary(_) => false,
        };
        if running { self.pause() } else { self.play() }
    }

    fn seek(&mut self, time: f64) -> Vec<PlayerCommand> {
        if matches!(self.mode, Mode::Ad(_)) {
            debug!("Ignoring seek to {}s during ad", time);
            return Vec::new();
        }
        if !time.is_finite() {
            return Vec::new();
        }
        let upper = self.duration.unwrap_or(f64::INFINITY);
        let time = time.clamp(0.0, upper);
        self.current_time = time;
        vec![PlayerCommand::SeekPrimary { time }]
    }

    fn skip(&mut self) -> Vec<PlayerCommand> {
        let Mode::Ad(ad) = &self.mode else {
            return Vec::new();
        };
        if !ad.skip_available {
            debug!(
                "Rejecting skip of ad {}: {:.0}s elapsed, skip unlocks at {:.0}s",
                ad.insertion.id,
                ad.elapsed(),
                ad.insertion.skip_after
            );
            return Vec::new();
        }

        metrics::record_ad_event("skipped");
        let mut commands = Vec::new();
        if let Some(url) = &ad.insertion.click_through {
            commands.push(PlayerCommand::OpenExternalLink { url: url.clone() });
        }
        commands.extend(self.finish_ad());
        commands
    }

    fn click_ad(&mut self) -> Vec<PlayerCommand> {
        let Mode::Ad(ad) = &self.mode else {
            return Vec::new();
        };
        match &ad.insertion.click_through {
            Some(url) => {
                metrics::record_ad_event("clicked");
                vec![PlayerCommand::OpenExternalLink { url: url.clone() }]
            }
            None => Vec::new(),
        }
    }

    fn set_volume(&mut self, volume: f64) -> Vec<PlayerCommand> {
        if !volume.is_finite() {
            return Vec::new();
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.muted = self.volume == 0.0;
        vec![
            PlayerCommand::SetVolume {
                volume: self.volume,
            },
            PlayerCommand::SetMuted { muted: self.muted },
        ]
    }

    fn set_muted(&mut self, muted: bool) -> Vec<PlayerCommand> {
        self.muted = muted;
        vec![PlayerCommand::SetMuted { muted }]
    }

    fn on_buffering(&mut self) -> Vec<PlayerCommand> {
        if let Mode::Primary(PrimaryState::Idle | PrimaryState::Playing | PrimaryState::Paused) =
            self.mode
        {
            self.mode = Mode::Primary(PrimaryState::Buffering);
        }
        Vec::new()
    }

    fn on_can_play(&mut self) -> Vec<PlayerCommand> {
        if let Mode::Primary(PrimaryState::Buffering) = self.mode {
            self.mode = Mode::Primary(if self.wants_play {
                PrimaryState::Playing
            } else {
                PrimaryState::Paused
            });
        }
        Vec::new()
    }

    fn on_ended(&mut self) -> Vec<PlayerCommand> {
        if let Mode::Primary(PrimaryState::Playing | PrimaryState::Buffering) = self.mode {
            self.mode = Mode::Primary(PrimaryState::Paused);
            self.wants_play = false;
        }
        Vec::new()
    }

    fn on_primary_error(&mut self, message: String) -> Vec<PlayerCommand> {
        error!("Primary transport failed: {}", message);
        let previous = std::mem::replace(&mut self.mode, Mode::Primary(PrimaryState::Error));
        self.wants_play = false;
        self.error = Some(message.clone());

        let mut commands = Vec::new();
        if matches!(previous, Mode::Ad(_)) {
            commands.push(PlayerCommand::StopAd);
        }
        commands.push(PlayerCommand::ReportError { message });
        commands
    }

    fn on_ad_error(&mut self, message: String) -> Vec<PlayerCommand> {
        let Mode::Ad(ad) = &self.mode else {
            return Vec::new();
        };
        warn!(
            "Ad {} failed to play ({}), resuming primary stream",
            ad.insertion.id, message
        );
        metrics::record_ad_event("failed");
        self.finish_ad()
    }

    fn set_fullscreen(&mut self, enter: bool) -> Vec<PlayerCommand> {
        if self.fullscreen == enter {
            return Vec::new();
        }
        self.fullscreen = enter;
        if enter {
            vec![PlayerCommand::EnterFullscreen]
        } else {
            vec![PlayerCommand::ExitFullscreen]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdConfig, GlobalInjectionRule, InjectionSource};
    use crate::playback::timer::ManualTimer;
    use crate::schedule::merge;

    const CLICK: &str = "https://advertiser.example.com";

    /// 600s video, global direct ad every 300s, 15s long, skippable after 5s.
    fn scenario_a_schedule() -> Vec<AdInsertion> {
        let rule = GlobalInjectionRule {
            enabled: true,
            interval_seconds: 300.0,
            source: InjectionSource::Direct {
                ad_stream_locator: "https://ads.example.com/a.mp4".to_string(),
                click_through: Some(CLICK.to_string()),
                duration: 15.0,
                skip_after: 5.0,
            },
        };
        merge("1", &[], &rule, &[], 600.0).insertions
    }

    fn machine_with(schedule: Vec<AdInsertion>) -> (PlaybackMachine, ManualTimer) {
        let timer = ManualTimer::new();
        let machine =
            PlaybackMachine::new(schedule, &PlayerSettings::default(), Box::new(timer.clone()));
        (machine, timer)
    }

    fn tick(machine: &mut PlaybackMachine, time: f64) -> Vec<PlayerCommand> {
        machine.handle(PlayerEvent::TimeUpdate { time })
    }

    fn countdown(
        machine: &mut PlaybackMachine,
        timer: &ManualTimer,
        ticks: usize,
    ) -> Vec<PlayerCommand> {
        let mut out = Vec::new();
        for _ in 0..ticks {
            let epoch = timer.last_epoch().expect("no countdown started");
            out.extend(machine.on_ad_tick(epoch));
        }
        out
    }

    fn playing_at(time: f64) -> (PlaybackMachine, ManualTimer) {
        let (mut machine, timer) = machine_with(scenario_a_schedule());
        machine.handle(PlayerEvent::Play);
        tick(&mut machine, time);
        (machine, timer)
    }

    #[test]
    fn starts_idle_without_autoplay() {
        let (mut machine, _) = machine_with(Vec::new());
        assert!(machine.start().is_empty());
        assert_eq!(machine.state(), PlaybackState::Primary(PrimaryState::Idle));
    }

    #[test]
    fn autoplay_issues_play_on_start() {
        let settings = PlayerSettings {
            auto_play: true,
            ..Default::default()
        };
        let mut machine = PlaybackMachine::new(Vec::new(), &settings, Box::new(ManualTimer::new()));
        assert_eq!(machine.start(), vec![PlayerCommand::PlayPrimary]);
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Playing)
        );
    }

    #[test]
    fn interrupts_primary_at_scheduled_time_and_resumes_after_duration() {
        let (mut machine, timer) = machine_with(scenario_a_schedule());
        machine.handle(PlayerEvent::Play);

        for t in [0.0, 150.0, 299.0] {
            assert!(tick(&mut machine, t).is_empty(), "no ad expected at {}", t);
        }

        let commands = tick(&mut machine, 300.0);
        assert_eq!(
            commands,
            vec![
                PlayerCommand::PausePrimary,
                PlayerCommand::StartAd {
                    insertion_id: "global_1_300".to_string(),
                    locator: "https://ads.example.com/a.mp4".to_string(),
                },
            ]
        );
        assert_eq!(machine.state(), PlaybackState::Ad(AdState::Playing));
        assert_eq!(timer.active(), 1);

        // Skip stays locked until five seconds have elapsed
        for elapsed in 1..5 {
            countdown(&mut machine, &timer, 1);
            let status = machine.status().ad.unwrap();
            assert!(!status.skip_available, "unlocked early at {}s", elapsed);
        }
        countdown(&mut machine, &timer, 1);
        let status = machine.status().ad.unwrap();
        assert!(status.skip_available);
        assert_eq!(status.elapsed, 5.0);
        assert_eq!(status.remaining, 10.0);

        assert!(countdown(&mut machine, &timer, 9).is_empty());
        let commands = countdown(&mut machine, &timer, 1);
        assert_eq!(
            commands,
            vec![PlayerCommand::StopAd, PlayerCommand::PlayPrimary]
        );
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Playing)
        );
        assert_eq!(timer.active(), 0, "countdown must stop with the ad");
    }

    #[test]
    fn skip_below_floor_is_a_no_op() {
        let (mut machine, timer) = playing_at(300.0);
        countdown(&mut machine, &timer, 3);

        assert!(machine.handle(PlayerEvent::Skip).is_empty());
        assert_eq!(machine.state(), PlaybackState::Ad(AdState::Playing));
        assert_eq!(machine.status().ad.unwrap().skip_in, 2.0);
        assert_eq!(timer.active(), 1);
    }

    #[test]
    fn skip_at_floor_opens_click_through_and_resumes() {
        let (mut machine, timer) = playing_at(300.0);
        countdown(&mut machine, &timer, 5);

        let commands = machine.handle(PlayerEvent::Skip);
        assert_eq!(
            commands,
            vec![
                PlayerCommand::OpenExternalLink {
                    url: CLICK.to_string()
                },
                PlayerCommand::StopAd,
                PlayerCommand::PlayPrimary,
            ]
        );
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Playing)
        );
        assert_eq!(timer.active(), 0);
    }

    #[test]
    fn zero_skip_after_allows_immediate_skip() {
        let ad = AdConfig {
            id: "now".to_string(),
            start_time: 10.0,
            duration: 6.0,
            skip_after: 0.0,
            redirect_url: String::new(),
            video_src: "https://ads.example.com/b.mp4".to_string(),
            title: "Instant".to_string(),
        };
        let schedule = merge("1", &[ad], &GlobalInjectionRule::default(), &[], 60.0).insertions;
        let (mut machine, _) = machine_with(schedule);
        machine.handle(PlayerEvent::Play);
        tick(&mut machine, 10.2);

        let commands = machine.handle(PlayerEvent::Skip);
        assert_eq!(
            commands,
            vec![PlayerCommand::StopAd, PlayerCommand::PlayPrimary]
        );
    }

    #[test]
    fn ad_click_opens_link_without_ending_ad() {
        let (mut machine, _) = playing_at(300.4);
        let commands = machine.handle(PlayerEvent::AdClick);
        assert_eq!(
            commands,
            vec![PlayerCommand::OpenExternalLink {
                url: CLICK.to_string()
            }]
        );
        assert_eq!(machine.state(), PlaybackState::Ad(AdState::Playing));
    }

    #[test]
    fn ad_fires_at_most_once_per_session() {
        let (mut machine, timer) = playing_at(299.5);
        assert!(machine.state().is_ad());
        countdown(&mut machine, &timer, 15);

        // Seek back into the same window twice
        for _ in 0..2 {
            machine.handle(PlayerEvent::Seek { time: 299.8 });
            assert!(tick(&mut machine, 299.8).is_empty());
            assert!(tick(&mut machine, 300.3).is_empty());
        }
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Playing)
        );
        assert_eq!(machine.status().fired_ads, vec!["global_1_300".to_string()]);
        assert_eq!(timer.epochs().len(), 1);
    }

    #[test]
    fn seeking_over_window_skips_the_ad_for_the_session() {
        let (mut machine, _) = playing_at(200.0);
        assert_eq!(
            machine.handle(PlayerEvent::Seek { time: 450.0 }),
            vec![PlayerCommand::SeekPrimary { time: 450.0 }]
        );
        assert!(tick(&mut machine, 450.0).is_empty());
        assert!(tick(&mut machine, 451.0).is_empty());
        assert!(machine.status().fired_ads.is_empty());
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Playing)
        );
    }

    #[test]
    fn paused_primary_does_not_fire_until_resumed() {
        let (mut machine, _) = machine_with(scenario_a_schedule());
        machine.handle(PlayerEvent::Play);
        machine.handle(PlayerEvent::Pause);
        assert!(tick(&mut machine, 300.0).is_empty());
        assert_eq!(machine.status().current_time, 300.0);

        machine.handle(PlayerEvent::Play);
        assert!(!tick(&mut machine, 300.2).is_empty());
        assert!(machine.state().is_ad());
    }

    #[test]
    fn pause_during_ad_acts_on_ad_transport() {
        let (mut machine, timer) = playing_at(300.0);
        countdown(&mut machine, &timer, 2);

        assert_eq!(
            machine.handle(PlayerEvent::Pause),
            vec![PlayerCommand::PauseAd]
        );
        assert_eq!(machine.state(), PlaybackState::Ad(AdState::Paused));
        assert_eq!(timer.active(), 0, "countdown stops while the ad is paused");

        // A tick from the old countdown is stale
        let old_epoch = timer.last_epoch().unwrap();
        assert!(machine.on_ad_tick(old_epoch).is_empty());
        assert_eq!(machine.status().ad.unwrap().elapsed, 2.0);

        assert_eq!(
            machine.handle(PlayerEvent::TogglePlay),
            vec![PlayerCommand::PlayAd]
        );
        assert_eq!(timer.active(), 1);
        assert_ne!(timer.last_epoch().unwrap(), old_epoch);

        countdown(&mut machine, &timer, 1);
        assert_eq!(machine.status().ad.unwrap().elapsed, 3.0);
    }

    #[test]
    fn primary_ignores_time_updates_and_seeks_during_ad() {
        let (mut machine, _) = playing_at(300.0);
        assert!(tick(&mut machine, 310.0).is_empty());
        assert!(machine.handle(PlayerEvent::Seek { time: 10.0 }).is_empty());
        assert_eq!(machine.status().current_time, 300.0);
    }

    #[test]
    fn stale_tick_after_completion_is_ignored() {
        let (mut machine, timer) = playing_at(300.0);
        let epoch = timer.last_epoch().unwrap();
        countdown(&mut machine, &timer, 15);
        assert!(machine.on_ad_tick(epoch).is_empty());
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Playing)
        );
    }

    #[test]
    fn teardown_cancels_countdown_and_invalidates_ticks() {
        let (mut machine, timer) = playing_at(300.0);
        let epoch = timer.last_epoch().unwrap();
        machine.teardown();
        assert_eq!(timer.active(), 0);
        assert!(machine.on_ad_tick(epoch).is_empty());
        assert_eq!(machine.state(), PlaybackState::Primary(PrimaryState::Idle));
    }

    #[test]
    fn dropping_machine_cancels_countdown() {
        let (machine, timer) = playing_at(300.0);
        assert_eq!(timer.active(), 1);
        drop(machine);
        assert_eq!(timer.active(), 0);
    }

    #[test]
    fn ad_error_resumes_primary() {
        let (mut machine, timer) = playing_at(300.0);
        let commands = machine.handle(PlayerEvent::AdError {
            message: "404".to_string(),
        });
        assert_eq!(
            commands,
            vec![PlayerCommand::StopAd, PlayerCommand::PlayPrimary]
        );
        assert_eq!(timer.active(), 0);
    }

    #[test]
    fn primary_error_is_terminal_and_reported_once() {
        let (mut machine, timer) = playing_at(300.0);
        let commands = machine.handle(PlayerEvent::PrimaryError {
            message: "network".to_string(),
        });
        assert_eq!(
            commands,
            vec![
                PlayerCommand::StopAd,
                PlayerCommand::ReportError {
                    message: "network".to_string()
                },
            ]
        );
        assert_eq!(machine.state(), PlaybackState::Primary(PrimaryState::Error));
        assert_eq!(timer.active(), 0);

        assert!(
            machine
                .handle(PlayerEvent::PrimaryError {
                    message: "again".to_string()
                })
                .is_empty()
        );
        assert!(machine.handle(PlayerEvent::Play).is_empty());
        assert_eq!(machine.status().error.as_deref(), Some("network"));
    }

    #[test]
    fn buffering_returns_to_play_intent() {
        let (mut machine, _) = machine_with(Vec::new());
        machine.handle(PlayerEvent::Play);
        machine.handle(PlayerEvent::Buffering);
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Buffering)
        );
        machine.handle(PlayerEvent::CanPlay);
        assert_eq!(
            machine.state(),
            PlaybackState::Primary(PrimaryState::Playing)
        );

        machine.handle(PlayerEvent::Buffering);
        assert_eq!(
            machine.handle(PlayerEvent::TogglePlay),
            vec![PlayerCommand::PausePrimary]
        );
        machine.handle(PlayerEvent::CanPlay);
        assert_eq!(machine.state(), PlaybackState::Primary(PrimaryState::Paused));
    }

    #[test]
    fn buffering_is_ignored_during_ad() {
        let (mut machine, _) = playing_at(300.0);
        machine.handle(PlayerEvent::Buffering);
        assert_eq!(machine.state(), PlaybackState::Ad(AdState::Playing));
    }

    #[test]
    fn volume_and_mute_apply_to_both_transports() {
        let (mut machine, _) = machine_with(Vec::new());
        assert_eq!(
            machine.handle(PlayerEvent::SetVolume { volume: 1.7 }),
            vec![
                PlayerCommand::SetVolume { volume: 1.0 },
                PlayerCommand::SetMuted { muted: false },
            ]
        );
        machine.handle(PlayerEvent::SetVolume { volume: 0.0 });
        assert!(machine.status().muted);

        assert_eq!(
            machine.handle(PlayerEvent::ToggleMute),
            vec![PlayerCommand::SetMuted { muted: false }]
        );
        assert!(
            machine
                .handle(PlayerEvent::SetVolume { volume: f64::NAN })
                .is_empty()
        );
    }

    #[test]
    fn seek_is_clamped_to_known_duration() {
        let (mut machine, _) = machine_with(Vec::new());
        machine.handle(PlayerEvent::LoadedMetadata { duration: 596.0 });
        assert_eq!(
            machine.handle(PlayerEvent::Seek { time: 1000.0 }),
            vec![PlayerCommand::SeekPrimary { time: 596.0 }]
        );
        assert_eq!(
            machine.handle(PlayerEvent::Seek { time: -3.0 }),
            vec![PlayerCommand::SeekPrimary { time: 0.0 }]
        );
    }

    #[test]
    fn fullscreen_is_passthrough_toggle() {
        let (mut machine, _) = playing_at(300.0);
        assert_eq!(
            machine.handle(PlayerEvent::EnterFullscreen),
            vec![PlayerCommand::EnterFullscreen]
        );
        assert!(machine.handle(PlayerEvent::EnterFullscreen).is_empty());
        assert_eq!(
            machine.handle(PlayerEvent::ExitFullscreen),
            vec![PlayerCommand::ExitFullscreen]
        );
    }

    #[test]
    fn ended_pauses_primary() {
        let (mut machine, _) = playing_at(590.0);
        machine.handle(PlayerEvent::Ended);
        assert_eq!(machine.state(), PlaybackState::Primary(PrimaryState::Paused));
    }
}
