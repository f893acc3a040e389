use super::actor::SessionMsg;
use crate::playback::{AdTimer, CountdownGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Countdown backed by a tokio interval task that posts ticks into the
/// owning session's mailbox.
///
/// Each countdown runs until its guard is dropped or the mailbox closes.
/// Ticks already queued when the guard drops still reach the machine, which
/// discards them by epoch.
pub struct TokioAdTimer {
    tx: mpsc::Sender<SessionMsg>,
    period: Duration,
}

impl TokioAdTimer {
    pub(crate) fn new(tx: mpsc::Sender<SessionMsg>, period: Duration) -> Self {
        Self { tx, period }
    }
}

impl AdTimer for TokioAdTimer {
    fn start(&self, epoch: u64) -> CountdownGuard {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(SessionMsg::AdTick { epoch }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        CountdownGuard::new(token)
    }
}
