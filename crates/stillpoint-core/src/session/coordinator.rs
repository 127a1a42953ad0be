//! Session coordinator.
//!
//! Owns one [`StepSequencer`], one [`BreathingCycler`] and the check-in draft.
//! The cycler only runs while the sequencer sits on the breathing step: every
//! step transition synchronously restarts it (entering) or stops it (leaving)
//! before the transition's events have all been delivered, so no breathing
//! phase is ever observed on another step.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::record::{FieldValue, QuickCheckIn, SessionRecord};
use crate::error::{CoreError, SessionError, TimelineError};
use crate::events::{Event, PresentationSink};
use crate::integrations::{AuthGate, SubmissionReceipt, Submitter};
use crate::timer::{
    AdvancePolicy, BreathingCycler, PhaseTimeline, StepList, StepSequencer, DEFAULT_CADENCE_MS,
};

fn default_cadence() -> u64 {
    DEFAULT_CADENCE_MS
}

/// Everything needed to run one check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub steps: StepList,
    pub breathing_step: usize,
    pub breathing_timeline: PhaseTimeline,
    #[serde(default)]
    pub policy: AdvancePolicy,
    #[serde(default = "default_cadence")]
    pub cadence_ms: u64,
}

impl SessionPlan {
    /// Mood, intensity, note, then breathing: 60 seconds in total.
    pub fn quick_checkin() -> Self {
        Self {
            steps: StepList::quick_checkin(),
            breathing_step: 3,
            breathing_timeline: PhaseTimeline::quick_checkin(),
            policy: AdvancePolicy::Auto,
            cadence_ms: DEFAULT_CADENCE_MS,
        }
    }

    pub fn validate(&self) -> Result<(), TimelineError> {
        self.steps.validate()?;
        if self.breathing_step >= self.steps.len() {
            return Err(TimelineError::InvalidStepList(format!(
                "breathing step {} is out of range for {} steps",
                self.breathing_step,
                self.steps.len()
            )));
        }
        self.breathing_timeline.validate()
    }
}

impl Default for SessionPlan {
    fn default() -> Self {
        Self::quick_checkin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Running,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Submitted(SubmissionReceipt),
    /// A repeated `complete()`; nothing was sent.
    AlreadySubmitted,
}

pub struct SessionCoordinator<S, P> {
    submitter: S,
    sink: P,
    sequencer: StepSequencer,
    cycler: BreathingCycler,
    plan: Option<SessionPlan>,
    record: SessionRecord,
    phase: SessionPhase,
}

impl<S, P> SessionCoordinator<S, P>
where
    S: Submitter,
    P: PresentationSink,
{
    pub fn new(submitter: S, sink: P) -> Self {
        Self {
            submitter,
            sink,
            sequencer: StepSequencer::new(),
            cycler: BreathingCycler::new(),
            plan: None,
            record: SessionRecord::new(),
            phase: SessionPhase::Idle,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    pub fn cycler(&self) -> &BreathingCycler {
        &self.cycler
    }

    pub fn plan(&self) -> Option<&SessionPlan> {
        self.plan.as_ref()
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn on_breathing_step(&self) -> bool {
        self.plan
            .as_ref()
            .is_some_and(|p| p.breathing_step == self.sequencer.current_step_index())
    }

    /// What would be submitted right now. A copy; the draft stays private.
    pub fn preview(&self) -> QuickCheckIn {
        self.record.finalize()
    }

    /// Earliest pending timer across both components.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.sequencer.next_deadline(), self.cycler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a check-in. Nothing is armed unless `auth` allows it and the
    /// plan validates. A session that is still running is abandoned first.
    pub fn start_session(
        &mut self,
        auth: &dyn AuthGate,
        plan: SessionPlan,
        now_ms: u64,
    ) -> Result<(), CoreError> {
        if !auth.is_authenticated() {
            tracing::info!("check-in refused: not authenticated");
            return Err(SessionError::AuthenticationRequired.into());
        }
        plan.validate()?;
        self.abandon(now_ms);

        let mut sequencer = StepSequencer::new()
            .with_cadence(plan.cadence_ms)
            .with_policy(plan.policy);
        let events = sequencer.begin(plan.steps.clone(), now_ms)?;

        self.sequencer = sequencer;
        self.cycler = BreathingCycler::new();
        self.record.clear();
        self.phase = SessionPhase::Running;
        tracing::info!(
            steps = plan.steps.len(),
            breathing_step = plan.breathing_step,
            "check-in started"
        );
        self.emit(&Event::SessionStarted {
            step_count: plan.steps.len(),
            breathing_step: plan.breathing_step,
            at_ms: now_ms,
        });
        self.plan = Some(plan);
        self.handle_step_events(events);
        Ok(())
    }

    /// Fire every timer due at or before `now_ms` in chronological order.
    /// When both components are due at the same instant the sequencer goes
    /// first, so a step change can stop the cycler before it emits.
    pub fn advance_to(&mut self, now_ms: u64) {
        if !self.is_running() {
            return;
        }
        loop {
            let seq_due = self.sequencer.next_deadline().filter(|d| *d <= now_ms);
            let cyc_due = self.cycler.next_deadline().filter(|d| *d <= now_ms);
            let (due, sequencer_first) = match (seq_due, cyc_due) {
                (None, None) => break,
                (Some(s), None) => (s, true),
                (None, Some(c)) => (c, false),
                (Some(s), Some(c)) => (s.min(c), s <= c),
            };
            if sequencer_first {
                let events = self.sequencer.advance_to(due);
                self.handle_step_events(events);
            } else {
                let events = self.cycler.advance_to(due);
                self.emit_all(&events);
            }
        }
    }

    pub fn next(&mut self, now_ms: u64) -> bool {
        if !self.is_running() {
            return false;
        }
        let event = self.sequencer.next(now_ms);
        self.handle_step_events(event.into_iter().collect())
    }

    pub fn back(&mut self, now_ms: u64) -> bool {
        if !self.is_running() {
            return false;
        }
        let event = self.sequencer.back(now_ms);
        self.handle_step_events(event.into_iter().collect())
    }

    /// Back to step 0 with a full countdown; collected answers are discarded.
    pub fn reset(&mut self, now_ms: u64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.record.clear();
        let event = self.sequencer.reset(now_ms);
        self.handle_step_events(event.into_iter().collect())
    }

    /// Store the answer for `step_index`, replacing any earlier one.
    pub fn record_field(
        &mut self,
        step_index: usize,
        value: FieldValue,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        let collects = self
            .plan
            .as_ref()
            .and_then(|p| p.steps.get(step_index))
            .ok_or_else(|| SessionError::InvalidField {
                step_index,
                message: "no such step".into(),
            })?
            .collects;

        let kind = value.kind();
        if collects != Some(kind) {
            return Err(SessionError::InvalidField {
                step_index,
                message: format!("step does not collect {kind:?}"),
            });
        }
        let value = value
            .normalized()
            .map_err(|message| SessionError::InvalidField {
                step_index,
                message,
            })?;

        self.record.record(step_index, value);
        self.emit(&Event::FieldRecorded {
            step_index,
            field: kind,
            at_ms: now_ms,
        });
        Ok(())
    }

    /// The user's Start/Stop control on the breathing step. Returns whether
    /// anything changed; off the breathing step it does nothing.
    pub fn set_breathing(&mut self, active: bool, now_ms: u64) -> bool {
        if !self.is_running() || !self.on_breathing_step() {
            return false;
        }
        match (active, self.cycler.is_active()) {
            (true, false) => self.start_breathing(now_ms),
            (false, true) => {
                if let Some(event) = self.cycler.stop(now_ms) {
                    self.emit(&event);
                }
                true
            }
            _ => false,
        }
    }

    /// Finalize the record and hand it to the submitter.
    ///
    /// Breathing is stopped and the countdown frozen regardless of outcome.
    /// A failed submission keeps the session running so the user can try
    /// again; a repeated call after success sends nothing.
    pub async fn complete(&mut self, now_ms: u64) -> Result<CompletionOutcome, SessionError> {
        match self.phase {
            SessionPhase::Completed => {
                tracing::debug!("duplicate completion ignored");
                return Ok(CompletionOutcome::AlreadySubmitted);
            }
            SessionPhase::Idle | SessionPhase::Abandoned => return Err(SessionError::NotRunning),
            SessionPhase::Running => {}
        }

        if let Some(event) = self.cycler.stop(now_ms) {
            self.emit(&event);
        }
        self.sequencer.halt();

        let record = self.record.finalize();
        match self.submitter.submit(&record).await {
            Ok(receipt) => {
                self.phase = SessionPhase::Completed;
                tracing::info!(id = ?receipt.id, "check-in submitted");
                self.emit(&Event::SessionCompleted {
                    record,
                    at_ms: now_ms,
                    at: Utc::now(),
                });
                Ok(CompletionOutcome::Submitted(receipt))
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "check-in submission failed");
                self.emit(&Event::SubmissionFailed {
                    message: message.clone(),
                    at_ms: now_ms,
                });
                Err(SessionError::SubmissionFailed(message))
            }
        }
    }

    /// Tear the session down without submitting. Returns `false` when no
    /// session was running.
    pub fn abandon(&mut self, now_ms: u64) -> bool {
        if !self.is_running() {
            return false;
        }
        if let Some(event) = self.cycler.stop(now_ms) {
            self.emit(&event);
        }
        self.sequencer.halt();
        self.record.clear();
        self.phase = SessionPhase::Abandoned;
        tracing::info!("check-in abandoned");
        self.emit(&Event::SessionAbandoned { at_ms: now_ms });
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Forward sequencer events, gating the cycler on every step change.
    fn handle_step_events(&mut self, events: Vec<Event>) -> bool {
        let mut transitioned = false;
        for event in events {
            self.emit(&event);
            if let Event::StepChanged { to, at_ms, .. } = event {
                transitioned = true;
                self.gate_breathing(to, at_ms);
            }
        }
        transitioned
    }

    fn gate_breathing(&mut self, step_index: usize, now_ms: u64) {
        let breathing_step = match self.plan.as_ref() {
            Some(p) => p.breathing_step,
            None => return,
        };
        if step_index == breathing_step {
            // Entering (or re-entering) always starts from phase 0.
            self.start_breathing(now_ms);
        } else if let Some(event) = self.cycler.stop(now_ms) {
            self.emit(&event);
        }
    }

    fn start_breathing(&mut self, now_ms: u64) -> bool {
        let Some(timeline) = self.plan.as_ref().map(|p| p.breathing_timeline.clone()) else {
            return false;
        };
        match self.cycler.restart(timeline, now_ms) {
            Ok(events) => {
                self.emit_all(&events);
                true
            }
            Err(e) => {
                // The plan was validated at start, so this is unreachable in practice.
                tracing::error!(error = %e, "breathing timeline rejected");
                false
            }
        }
    }

    fn emit(&mut self, event: &Event) {
        self.sink.notify(event);
    }

    fn emit_all(&mut self, events: &[Event]) {
        for event in events {
            self.sink.notify(event);
        }
    }
}
