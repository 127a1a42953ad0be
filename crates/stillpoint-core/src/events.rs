use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::QuickCheckIn;
use crate::timer::FieldKind;

/// What caused the sequencer to move between steps.
///
/// Observers get the same `StepChanged` shape for every cause; the field is
/// informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionCause {
    Begin,
    Auto,
    Next,
    Back,
    Reset,
}

/// Every observable change in the engine produces an Event.
/// Timestamps are on the caller's monotonic session clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        step_count: usize,
        breathing_step: usize,
        at_ms: u64,
    },
    StepChanged {
        from: usize,
        to: usize,
        title: String,
        duration_ms: u64,
        cause: TransitionCause,
        at_ms: u64,
    },
    CountdownTick {
        step_index: usize,
        remaining_ms: u64,
        at_ms: u64,
    },
    /// The countdown clamped at zero without advancing.
    CountdownExpired {
        step_index: usize,
        at_ms: u64,
    },
    BreathingStarted {
        at_ms: u64,
    },
    PhaseChanged {
        phase_index: usize,
        name: String,
        duration_ms: u64,
        visual_target: f64,
        at_ms: u64,
    },
    CycleCompleted {
        cycles: u32,
        at_ms: u64,
    },
    /// Cycler went idle; carries the rest output.
    BreathingStopped {
        name: String,
        visual_target: f64,
        at_ms: u64,
    },
    FieldRecorded {
        step_index: usize,
        field: FieldKind,
        at_ms: u64,
    },
    SubmissionFailed {
        message: String,
        at_ms: u64,
    },
    SessionCompleted {
        record: QuickCheckIn,
        at_ms: u64,
        at: DateTime<Utc>,
    },
    SessionAbandoned {
        at_ms: u64,
    },
}

/// Notification channel for the presentation layer. Never consulted for
/// control decisions.
pub trait PresentationSink {
    fn notify(&mut self, event: &Event);
}

impl<F> PresentationSink for F
where
    F: FnMut(&Event),
{
    fn notify(&mut self, event: &Event) {
        self(event)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn notify(&mut self, _event: &Event) {}
}

/// Records every event in order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Names of every `PhaseChanged` seen so far.
    pub fn phase_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::PhaseChanged { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Destination index of every `StepChanged` seen so far.
    pub fn step_path(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::StepChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

impl PresentationSink for EventLog {
    fn notify(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}
