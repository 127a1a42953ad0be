//! Breathing phase cycler.
//!
//! Loops a [`PhaseTimeline`] forever while active. Like the step sequencer it
//! has no internal thread: it holds one [`TimerSlot`] for the next phase
//! boundary and the caller drives it with `advance_to(now_ms)`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active(phase 0) -> Active(phase 1) -> ... -> Active(phase 0) -> ...
//!   ^                                                        |
//!   +------------------------- stop() -----------------------+
//! ```
//!
//! `stop()` releases the pending timer before returning, so once it has run no
//! later `advance_to` can emit another phase, even for the same instant.

use serde::{Deserialize, Serialize};

use super::phase::{PhaseTimeline, DEFAULT_REST_TARGET, IDLE_LABEL};
use super::slot::TimerSlot;
use crate::error::TimelineError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclerState {
    pub active: bool,
    pub phase_index: usize,
    pub phase_started_at_ms: u64,
}

/// What the presentation layer should show right now.
///
/// Interpolating from `previous_target` to `visual_target` over
/// `duration_ms`, starting at `started_at_ms`, reproduces the animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseOutput {
    pub active: bool,
    pub name: String,
    pub duration_ms: u64,
    pub visual_target: f64,
    pub previous_target: f64,
    pub started_at_ms: u64,
}

impl PhaseOutput {
    /// Linear interpolation of the visual value at `now_ms`.
    pub fn value_at(&self, now_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return self.visual_target;
        }
        let elapsed = now_ms.saturating_sub(self.started_at_ms).min(self.duration_ms);
        let t = elapsed as f64 / self.duration_ms as f64;
        self.previous_target + (self.visual_target - self.previous_target) * t
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathingCycler {
    timeline: Option<PhaseTimeline>,
    state: CyclerState,
    timer: TimerSlot,
    cycles_completed: u32,
    /// Stop by itself after this many full cycles.
    #[serde(default)]
    cycle_limit: Option<u32>,
    previous_target: f64,
}

impl BreathingCycler {
    pub fn new() -> Self {
        Self {
            timeline: None,
            state: CyclerState {
                active: false,
                phase_index: 0,
                phase_started_at_ms: 0,
            },
            timer: TimerSlot::new(),
            cycles_completed: 0,
            cycle_limit: None,
            previous_target: DEFAULT_REST_TARGET,
        }
    }

    pub fn with_cycle_limit(mut self, limit: u32) -> Self {
        self.cycle_limit = Some(limit).filter(|l| *l > 0);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> CyclerState {
        self.state
    }

    pub fn phase_index(&self) -> usize {
        self.state.phase_index
    }

    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    pub fn timeline(&self) -> Option<&PhaseTimeline> {
        self.timeline.as_ref()
    }

    /// When the pending phase boundary is due, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timer.due_ms()
    }

    pub fn output(&self) -> PhaseOutput {
        let rest = self
            .timeline
            .as_ref()
            .map(|t| t.rest_target)
            .unwrap_or(DEFAULT_REST_TARGET);

        if !self.state.active {
            // Idle keeps phase 0's label but shows the rest value, not phase 0's target.
            let name = self
                .timeline
                .as_ref()
                .and_then(|t| t.get(0))
                .map(|p| p.name.clone())
                .unwrap_or_else(|| IDLE_LABEL.to_string());
            return PhaseOutput {
                active: false,
                name,
                duration_ms: 0,
                visual_target: rest,
                previous_target: self.previous_target,
                started_at_ms: self.state.phase_started_at_ms,
            };
        }

        match self
            .timeline
            .as_ref()
            .and_then(|t| t.get(self.state.phase_index))
        {
            Some(phase) => PhaseOutput {
                active: true,
                name: phase.name.clone(),
                duration_ms: phase.duration_ms,
                visual_target: phase.visual_target,
                previous_target: self.previous_target,
                started_at_ms: self.state.phase_started_at_ms,
            },
            None => PhaseOutput {
                active: false,
                name: IDLE_LABEL.to_string(),
                duration_ms: 0,
                visual_target: rest,
                previous_target: rest,
                started_at_ms: self.state.phase_started_at_ms,
            },
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin looping `timeline` from phase 0.
    ///
    /// Starting an already active cycler begins afresh without passing
    /// through idle.
    pub fn start(
        &mut self,
        timeline: PhaseTimeline,
        now_ms: u64,
    ) -> Result<Vec<Event>, TimelineError> {
        timeline.validate()?;
        Ok(self.begin_fresh(timeline, now_ms))
    }

    /// Stop and start again as one step. An invalid timeline leaves the
    /// current loop untouched.
    pub fn restart(
        &mut self,
        timeline: PhaseTimeline,
        now_ms: u64,
    ) -> Result<Vec<Event>, TimelineError> {
        self.start(timeline, now_ms)
    }

    /// Halt the loop, drop any pending phase boundary and go idle.
    /// Calling this on an idle cycler does nothing.
    pub fn stop(&mut self, now_ms: u64) -> Option<Event> {
        if !self.state.active {
            return None;
        }
        self.timer.cancel();
        self.previous_target = self.output().visual_target;
        self.state = CyclerState {
            active: false,
            phase_index: 0,
            phase_started_at_ms: now_ms,
        };
        let idle = self.output();
        tracing::debug!(cycles = self.cycles_completed, "breathing stopped");
        Some(Event::BreathingStopped {
            name: idle.name,
            visual_target: idle.visual_target,
            at_ms: now_ms,
        })
    }

    /// Fire every phase boundary due at or before `now_ms`.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(due) = self.timer.take_due(now_ms) {
            if !self.state.active {
                break;
            }
            self.enter_next_phase(due, &mut events);
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_fresh(&mut self, timeline: PhaseTimeline, now_ms: u64) -> Vec<Event> {
        self.timer.cancel();
        self.previous_target = if self.state.active {
            self.output().visual_target
        } else {
            timeline.rest_target
        };
        self.timeline = Some(timeline);
        self.cycles_completed = 0;
        self.state = CyclerState {
            active: true,
            phase_index: 0,
            phase_started_at_ms: now_ms,
        };
        tracing::debug!("breathing started");

        let mut events = vec![Event::BreathingStarted { at_ms: now_ms }];
        if let Some(event) = self.emit_current_phase(now_ms) {
            events.push(event);
        }
        events
    }

    fn enter_next_phase(&mut self, at_ms: u64, events: &mut Vec<Event>) {
        let len = match self.timeline.as_ref() {
            Some(t) => t.len(),
            None => return,
        };
        let next = (self.state.phase_index + 1) % len;

        if next == 0 {
            self.cycles_completed = self.cycles_completed.saturating_add(1);
            events.push(Event::CycleCompleted {
                cycles: self.cycles_completed,
                at_ms,
            });
            if self
                .cycle_limit
                .is_some_and(|limit| self.cycles_completed >= limit)
            {
                events.extend(self.stop(at_ms));
                return;
            }
        }

        self.previous_target = self.output().visual_target;
        self.state.phase_index = next;
        self.state.phase_started_at_ms = at_ms;
        if let Some(event) = self.emit_current_phase(at_ms) {
            events.push(event);
        }
    }

    /// Build the `PhaseChanged` event for the current phase and schedule
    /// the boundary at its end.
    fn emit_current_phase(&mut self, at_ms: u64) -> Option<Event> {
        let phase = self.timeline.as_ref()?.get(self.state.phase_index)?;
        let event = Event::PhaseChanged {
            phase_index: self.state.phase_index,
            name: phase.name.clone(),
            duration_ms: phase.duration_ms,
            visual_target: phase.visual_target,
            at_ms,
        };
        let due = at_ms.saturating_add(phase.duration_ms);
        tracing::debug!(phase = %phase.name, index = self.state.phase_index, due, "breathing phase");
        self.timer.arm(due);
        Some(event)
    }
}

impl Default for BreathingCycler {
    fn default() -> Self {
        Self::new()
    }
}
