use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// Which part of the check-in record a step asks the user for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Mood,
    Intensity,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub collects: Option<FieldKind>,
}

impl Step {
    pub fn new(title: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            title: title.into(),
            duration_ms,
            collects: None,
        }
    }

    pub fn collecting(mut self, kind: FieldKind) -> Self {
        self.collects = Some(kind);
        self
    }

    /// Get step duration in whole seconds, rounded up.
    pub fn duration_secs(&self) -> u64 {
        self.duration_ms.div_ceil(1000)
    }
}

/// Finite, non-wrapping list of timed steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepList {
    pub steps: Vec<Step>,
}

impl StepList {
    pub fn new(steps: Vec<Step>) -> Result<Self, TimelineError> {
        let list = Self { steps };
        list.validate()?;
        Ok(list)
    }

    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.steps.is_empty() {
            return Err(TimelineError::InvalidStepList("step list is empty".into()));
        }
        if let Some((i, step)) = self
            .steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.duration_ms == 0)
        {
            return Err(TimelineError::InvalidStepList(format!(
                "step {i} ('{}') has a zero duration",
                step.title
            )));
        }
        Ok(())
    }

    /// The four-step quick check-in: mood, intensity, note, breathing.
    pub fn quick_checkin() -> Self {
        Self {
            steps: vec![
                Step::new("How are you feeling?", 15_000).collecting(FieldKind::Mood),
                Step::new("Rate the intensity (1-10)", 10_000).collecting(FieldKind::Intensity),
                Step::new("Quick note (optional)", 15_000).collecting(FieldKind::Note),
                Step::new("Breathing exercise", 20_000),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// 0.0 ..= 100.0, counting `index` as reached.
    pub fn progress_pct(&self, index: usize) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        (index.min(self.last_index()) + 1) as f64 / self.steps.len() as f64 * 100.0
    }

    /// "Step 2/4" style position, 1-indexed.
    pub fn display_position(&self, index: usize) -> String {
        format!("Step {}/{}", index + 1, self.steps.len())
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.steps
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.duration_ms))
    }
}

impl Default for StepList {
    fn default() -> Self {
        Self::quick_checkin()
    }
}
