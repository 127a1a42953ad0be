//! Real-time driver.
//!
//! The engine itself never sleeps; this module runs it against a tokio clock.
//! Each loop iteration waits on exactly one `sleep_until` for the earliest
//! pending deadline, so dropping the loop releases every timer. Commands are
//! polled before timers (`biased`), which makes a stop or a manual step
//! change win a tie with a timer due at the same instant.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

use crate::events::PresentationSink;
use crate::integrations::{SubmissionReceipt, Submitter};
use crate::session::{CompletionOutcome, FieldValue, SessionCoordinator, SessionPhase};
use crate::error::SessionError;
use crate::timer::BreathingCycler;

/// Monotonic millisecond clock anchored at session start.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    pub fn instant_at(&self, ms: u64) -> Instant {
        self.origin + Duration::from_millis(ms)
    }
}

/// User actions forwarded from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Next,
    Back,
    Reset,
    Record { step_index: usize, value: FieldValue },
    Breathing(bool),
    Complete,
    Abandon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExit {
    Completed(SubmissionReceipt),
    Abandoned,
    /// The coordinator had no running session to drive.
    NotRunning,
}

/// Drive a started session until it is completed or abandoned.
///
/// A closed command channel means the owning UI went away; the session is
/// abandoned so nothing keeps ticking in the background.
pub async fn run_session<S, P>(
    coordinator: &mut SessionCoordinator<S, P>,
    clock: &SessionClock,
    commands: &mut mpsc::Receiver<SessionCommand>,
) -> SessionExit
where
    S: Submitter,
    P: PresentationSink,
{
    loop {
        if !coordinator.is_running() {
            return match coordinator.phase() {
                SessionPhase::Abandoned => SessionExit::Abandoned,
                _ => SessionExit::NotRunning,
            };
        }

        let deadline = coordinator.next_deadline();
        tokio::select! {
            biased;

            command = commands.recv() => {
                let now = clock.now_ms();
                let Some(command) = command else {
                    tracing::debug!("command channel closed, abandoning session");
                    coordinator.abandon(now);
                    return SessionExit::Abandoned;
                };
                if let Some(exit) = apply(coordinator, command, now).await {
                    return exit;
                }
            }
            _ = sleep_until(clock.instant_at(deadline.unwrap_or_default())), if deadline.is_some() => {
                coordinator.advance_to(clock.now_ms());
            }
        }
    }
}

async fn apply<S, P>(
    coordinator: &mut SessionCoordinator<S, P>,
    command: SessionCommand,
    now: u64,
) -> Option<SessionExit>
where
    S: Submitter,
    P: PresentationSink,
{
    // Anything due up to now fires first; the command then acts on the
    // state the user was looking at.
    coordinator.advance_to(now.saturating_sub(1));

    match command {
        SessionCommand::Next => {
            coordinator.next(now);
        }
        SessionCommand::Back => {
            coordinator.back(now);
        }
        SessionCommand::Reset => {
            coordinator.reset(now);
        }
        SessionCommand::Record { step_index, value } => {
            if let Err(e) = coordinator.record_field(step_index, value, now) {
                tracing::warn!(error = %e, "answer not recorded");
            }
        }
        SessionCommand::Breathing(active) => {
            coordinator.set_breathing(active, now);
        }
        SessionCommand::Complete => match coordinator.complete(now).await {
            Ok(CompletionOutcome::Submitted(receipt)) => {
                return Some(SessionExit::Completed(receipt))
            }
            Ok(CompletionOutcome::AlreadySubmitted) | Err(SessionError::NotRunning) => {
                return Some(SessionExit::NotRunning)
            }
            // Already reported through the sink; the user may retry.
            Err(_) => {}
        },
        SessionCommand::Abandon => {
            coordinator.abandon(now);
            return Some(SessionExit::Abandoned);
        }
    }
    None
}

/// Drive a lone breathing cycler (home widget, guided exercise) until
/// `shutdown` resolves or the cycler stops on its own.
pub async fn run_breathing<P, F>(
    cycler: &mut BreathingCycler,
    sink: &mut P,
    clock: &SessionClock,
    shutdown: F,
) where
    P: PresentationSink,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    while cycler.is_active() {
        let Some(deadline) = cycler.next_deadline() else {
            break;
        };
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                if let Some(event) = cycler.stop(clock.now_ms()) {
                    sink.notify(&event);
                }
                break;
            }
            _ = sleep_until(clock.instant_at(deadline)) => {
                for event in cycler.advance_to(clock.now_ms()) {
                    sink.notify(&event);
                }
            }
        }
    }
}
