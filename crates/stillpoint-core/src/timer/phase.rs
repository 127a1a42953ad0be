use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// Visual value shown while no breathing cycle is running.
pub const DEFAULT_REST_TARGET: f64 = 100.0;

/// Label used for the idle state when no timeline has been loaded yet.
pub const IDLE_LABEL: &str = "idle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub duration_ms: u64,
    /// Value the animation should reach by the end of this phase
    /// (the breathing circle's diameter).
    pub visual_target: f64,
}

impl Phase {
    pub fn new(name: impl Into<String>, duration_ms: u64, visual_target: f64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            visual_target,
        }
    }
}

/// Ordered, looping description of a breathing pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimeline {
    pub phases: Vec<Phase>,
    #[serde(default = "default_rest_target")]
    pub rest_target: f64,
}

fn default_rest_target() -> f64 {
    DEFAULT_REST_TARGET
}

impl PhaseTimeline {
    /// Build a validated timeline.
    pub fn new(phases: Vec<Phase>) -> Result<Self, TimelineError> {
        let timeline = Self {
            phases,
            rest_target: DEFAULT_REST_TARGET,
        };
        timeline.validate()?;
        Ok(timeline)
    }

    /// Timelines can also arrive through config deserialization, so the
    /// cycler re-checks on every `start`.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.phases.is_empty() {
            return Err(TimelineError::InvalidTimeline(
                "timeline has no phases".into(),
            ));
        }
        if let Some((i, phase)) = self
            .phases
            .iter()
            .enumerate()
            .find(|(_, p)| p.duration_ms == 0)
        {
            return Err(TimelineError::InvalidTimeline(format!(
                "phase {i} ('{}') has a zero duration",
                phase.name
            )));
        }
        if !self.rest_target.is_finite()
            || self.phases.iter().any(|p| !p.visual_target.is_finite())
        {
            return Err(TimelineError::InvalidTimeline(
                "visual targets must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    /// Duration of one full in-hold-out cycle.
    pub fn cycle_duration_ms(&self) -> u64 {
        self.phases
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.duration_ms))
    }

    /// Breathing widget on the home page: in 4s, hold 2s, out 6s.
    pub fn home_widget() -> Self {
        Self {
            phases: vec![
                Phase::new("Breathe in", 4_000, 150.0),
                Phase::new("Hold", 2_000, 150.0),
                Phase::new("Breathe out", 6_000, 80.0),
            ],
            rest_target: DEFAULT_REST_TARGET,
        }
    }

    /// Dedicated breathing exercise, with a larger circle.
    pub fn guided_exercise() -> Self {
        Self {
            phases: vec![
                Phase::new("Breathe in", 4_000, 180.0),
                Phase::new("Hold", 2_000, 180.0),
                Phase::new("Breathe out", 6_000, 80.0),
            ],
            rest_target: DEFAULT_REST_TARGET,
        }
    }

    /// Breathing step of the quick check-in wizard.
    pub fn quick_checkin() -> Self {
        Self::home_widget()
    }

    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "home" | "home_widget" => Some(Self::home_widget()),
            "exercise" | "guided_exercise" => Some(Self::guided_exercise()),
            "quick" | "quick_checkin" => Some(Self::quick_checkin()),
            _ => None,
        }
    }
}

impl Default for PhaseTimeline {
    fn default() -> Self {
        Self::home_widget()
    }
}
