//! Per-session task.
//!
//! Owns the [`PlaybackMachine`] and serialises shell events and countdown
//! ticks through one mailbox, so the machine has a single writer.

use crate::playback::{PlaybackMachine, PlaybackStatus, PlayerCommand, PlayerEvent};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Commands kept for a shell that stops polling. Oldest are dropped first.
pub const MAX_PENDING_COMMANDS: usize = 256;

/// Mailbox message for a session task.
pub(crate) enum SessionMsg {
    Event {
        event: PlayerEvent,
        reply: oneshot::Sender<SessionReply>,
    },
    Status {
        reply: oneshot::Sender<SessionReply>,
    },
    AdTick {
        epoch: u64,
    },
}

/// Status plus every command produced since the previous reply.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReply {
    pub status: PlaybackStatus,
    pub commands: Vec<PlayerCommand>,
}

struct Outbox {
    pending: Vec<PlayerCommand>,
}

impl Outbox {
    fn push(&mut self, session_id: &str, commands: Vec<PlayerCommand>) {
        self.pending.extend(commands);
        if self.pending.len() > MAX_PENDING_COMMANDS {
            let overflow = self.pending.len() - MAX_PENDING_COMMANDS;
            warn!(
                "Session {}: dropping {} unread commands",
                session_id, overflow
            );
            self.pending.drain(..overflow);
        }
    }

    fn take(&mut self) -> Vec<PlayerCommand> {
        std::mem::take(&mut self.pending)
    }
}

/// Run the session until it is cancelled or its mailbox closes.
pub(crate) async fn run(
    session_id: String,
    mut machine: PlaybackMachine,
    mut rx: mpsc::Receiver<SessionMsg>,
    cancel: CancellationToken,
) {
    let mut outbox = Outbox {
        pending: Vec::new(),
    };
    outbox.push(&session_id, machine.start());

    loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        match msg {
            SessionMsg::Event { event, reply } => {
                debug!("Session {}: {:?}", session_id, event);
                let commands = machine.handle(event);
                outbox.push(&session_id, commands);
                let _ = reply.send(SessionReply {
                    status: machine.status(),
                    commands: outbox.take(),
                });
            }
            SessionMsg::Status { reply } => {
                let _ = reply.send(SessionReply {
                    status: machine.status(),
                    commands: outbox.take(),
                });
            }
            SessionMsg::AdTick { epoch } => {
                let commands = machine.on_ad_tick(epoch);
                outbox.push(&session_id, commands);
            }
        }
    }

    machine.teardown();
    info!("Session {} stopped", session_id);
}
