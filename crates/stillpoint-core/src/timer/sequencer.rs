//! Timed step sequencer.
//!
//! Operates on wall-clock deltas like a kitchen timer: every `tick(now_ms)`
//! flushes the time elapsed since the previous tick (or transition) into the
//! countdown. The sequencer owns one [`TimerSlot`] for its next tick; callers
//! either poll `advance_to(now_ms)` or call `tick` on their own cadence.
//!
//! ## Transitions
//!
//! ```text
//! begin -> step 0 -> (auto | next) -> step 1 -> ... -> last step (clamps at 0)
//!                  <-    back     <-
//! ```
//!
//! Every transition, manual or automatic, resets the countdown to the
//! destination step's full duration and restarts the flush origin. A tick
//! landing on the same instant as a manual transition therefore flushes
//! nothing, so the manual move is the only one that happens.

use serde::{Deserialize, Serialize};

use super::slot::TimerSlot;
use super::step::{Step, StepList};
use crate::error::TimelineError;
use crate::events::{Event, TransitionCause};

pub const DEFAULT_CADENCE_MS: u64 = 1_000;

/// What happens when a step's countdown runs out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvancePolicy {
    /// Move to the next step automatically; the last step clamps at zero.
    #[default]
    Auto,
    /// Clamp every step at zero and wait for manual navigation.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerState {
    pub current_step_index: usize,
    pub remaining_ms: u64,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutput {
    pub current_step_index: usize,
    pub remaining_ms: u64,
    pub step_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSequencer {
    steps: Option<StepList>,
    state: SequencerState,
    /// Instant the countdown was last flushed at.
    last_flush_ms: u64,
    cadence_ms: u64,
    policy: AdvancePolicy,
    timer: TimerSlot,
}

impl StepSequencer {
    pub fn new() -> Self {
        Self {
            steps: None,
            state: SequencerState {
                current_step_index: 0,
                remaining_ms: 0,
                running: false,
            },
            last_flush_ms: 0,
            cadence_ms: DEFAULT_CADENCE_MS,
            policy: AdvancePolicy::Auto,
            timer: TimerSlot::new(),
        }
    }

    pub fn with_cadence(mut self, cadence_ms: u64) -> Self {
        self.cadence_ms = cadence_ms.max(1);
        self
    }

    pub fn with_policy(mut self, policy: AdvancePolicy) -> Self {
        self.policy = policy;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn current_step_index(&self) -> usize {
        self.state.current_step_index
    }

    pub fn remaining_ms(&self) -> u64 {
        self.state.remaining_ms
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    pub fn cadence_ms(&self) -> u64 {
        self.cadence_ms
    }

    pub fn steps(&self) -> Option<&StepList> {
        self.steps.as_ref()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.as_ref()?.get(self.state.current_step_index)
    }

    pub fn is_last_step(&self) -> bool {
        self.steps
            .as_ref()
            .is_some_and(|s| self.state.current_step_index >= s.last_index())
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timer.due_ms()
    }

    pub fn output(&self) -> StepOutput {
        StepOutput {
            current_step_index: self.state.current_step_index,
            remaining_ms: self.state.remaining_ms,
            step_title: self
                .current_step()
                .map(|s| s.title.clone())
                .unwrap_or_default(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Load `steps` and start the countdown of step 0.
    pub fn begin(&mut self, steps: StepList, now_ms: u64) -> Result<Vec<Event>, TimelineError> {
        steps.validate()?;
        self.steps = Some(steps);
        let event = self.transition(0, TransitionCause::Begin, now_ms);
        Ok(event.into_iter().collect())
    }

    /// Flush elapsed time into the countdown and auto-advance on expiry.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        if !self.state.running {
            return Vec::new();
        }
        let elapsed = now_ms.saturating_sub(self.last_flush_ms);
        if elapsed == 0 {
            if !self.timer.is_armed() {
                self.timer.arm(now_ms.saturating_add(self.cadence_ms));
            }
            return Vec::new();
        }
        self.last_flush_ms = now_ms;
        let index = self.state.current_step_index;

        if self.state.remaining_ms > elapsed {
            self.state.remaining_ms -= elapsed;
            self.timer.arm(now_ms.saturating_add(self.cadence_ms));
            return vec![Event::CountdownTick {
                step_index: index,
                remaining_ms: self.state.remaining_ms,
                at_ms: now_ms,
            }];
        }

        if self.policy == AdvancePolicy::Auto && !self.is_last_step() {
            return self
                .transition(index + 1, TransitionCause::Auto, now_ms)
                .into_iter()
                .collect();
        }

        self.state.remaining_ms = 0;
        self.state.running = false;
        self.timer.cancel();
        tracing::debug!(step = index, "countdown expired, waiting for user");
        vec![
            Event::CountdownTick {
                step_index: index,
                remaining_ms: 0,
                at_ms: now_ms,
            },
            Event::CountdownExpired {
                step_index: index,
                at_ms: now_ms,
            },
        ]
    }

    /// Fire every tick due at or before `now_ms`.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(due) = self.timer.take_due(now_ms) {
            events.extend(self.tick(due));
        }
        events
    }

    /// Move forward one step. Saturates at the last step.
    pub fn next(&mut self, now_ms: u64) -> Option<Event> {
        if self.steps.is_none() || self.is_last_step() {
            return None;
        }
        self.transition(
            self.state.current_step_index + 1,
            TransitionCause::Next,
            now_ms,
        )
    }

    /// Move back one step. Saturates at step 0.
    pub fn back(&mut self, now_ms: u64) -> Option<Event> {
        if self.steps.is_none() || self.state.current_step_index == 0 {
            return None;
        }
        self.transition(
            self.state.current_step_index - 1,
            TransitionCause::Back,
            now_ms,
        )
    }

    /// Return to step 0 with its full countdown.
    pub fn reset(&mut self, now_ms: u64) -> Option<Event> {
        self.transition(0, TransitionCause::Reset, now_ms)
    }

    /// Freeze the countdown where it is and release the tick timer.
    pub fn halt(&mut self) {
        self.timer.cancel();
        self.state.running = false;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn transition(&mut self, to: usize, cause: TransitionCause, now_ms: u64) -> Option<Event> {
        let step = self.steps.as_ref()?.get(to)?;
        let title = step.title.clone();
        let duration_ms = step.duration_ms;
        let from = self.state.current_step_index;

        self.state = SequencerState {
            current_step_index: to,
            remaining_ms: duration_ms,
            running: true,
        };
        self.last_flush_ms = now_ms;
        self.timer.arm(now_ms.saturating_add(self.cadence_ms));
        tracing::debug!(from, to, ?cause, "step transition");

        Some(Event::StepChanged {
            from,
            to,
            title,
            duration_ms,
            cause,
            at_ms: now_ms,
        })
    }
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::new()
    }
}
