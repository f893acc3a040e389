//! Ad countdown timer seam.
//!
//! The machine never owns a raw interval. It asks an [`AdTimer`] for a
//! countdown tagged with an epoch and stores the returned [`CountdownGuard`]
//! inside its `Ad.Playing` state. Dropping the guard cancels the countdown,
//! so leaving the state by any path tears the timer down.

#[cfg(test)]
use std::sync::{Arc, Mutex};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Starts one-second countdowns that report back with the given epoch.
pub trait AdTimer: Send {
    fn start(&self, epoch: u64) -> CountdownGuard;
}

/// Owns a running countdown. Cancels it on drop.
#[derive(Debug)]
pub struct CountdownGuard {
    _guard: DropGuard,
}

impl CountdownGuard {
    /// Wrap a token whose cancellation stops the countdown task.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            _guard: token.drop_guard(),
        }
    }
}

/// Timer that never ticks on its own. Records every countdown it hands out
/// so callers can drive ticks by hand and check cancellation.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ManualTimer {
    started: Arc<Mutex<Vec<(u64, CancellationToken)>>>,
}

#[cfg(test)]
impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epochs of every countdown started so far, oldest first.
    pub fn epochs(&self) -> Vec<u64> {
        self.lock().iter().map(|(epoch, _)| *epoch).collect()
    }

    /// Epoch of the most recent countdown.
    pub fn last_epoch(&self) -> Option<u64> {
        self.lock().last().map(|(epoch, _)| *epoch)
    }

    /// Number of countdowns that are still running.
    pub fn active(&self) -> usize {
        self.lock()
            .iter()
            .filter(|(_, token)| !token.is_cancelled())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, CancellationToken)>> {
        self.started.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
impl AdTimer for ManualTimer {
    fn start(&self, epoch: u64) -> CountdownGuard {
        let token = CancellationToken::new();
        self.lock().push((epoch, token.clone()));
        CountdownGuard::new(token)
    }
}
