//! Check-in record accumulated over a session.
//!
//! The draft is owned by the coordinator and mutated only through it. Once
//! finalized into a [`QuickCheckIn`] and handed to the submitter it is never
//! touched again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::timer::FieldKind;

/// Emoji offered by the mood step.
pub const MOOD_CHOICES: [&str; 5] = ["😄", "🙂", "😐", "🙁", "😟"];

pub const DEFAULT_MOOD: &str = "😐";
pub const DEFAULT_INTENSITY: u8 = 5;
pub const DEFAULT_NOTE: &str = "Quick check-in completed";
pub const CHECKIN_TYPE: &str = "quick";

/// Server-side column limits.
pub const MOOD_MAX_CHARS: usize = 16;
pub const NOTE_MAX_CHARS: usize = 200;

pub const INTENSITY_MIN: i64 = 1;
pub const INTENSITY_MAX: i64 = 10;

/// A value collected by one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Mood(String),
    Intensity(i64),
    Note(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Mood(_) => FieldKind::Mood,
            FieldValue::Intensity(_) => FieldKind::Intensity,
            FieldValue::Note(_) => FieldKind::Note,
        }
    }

    /// Apply the per-field range rules: mood must be a short non-empty
    /// label, intensity is clamped to 1..=10, notes are cut at 200 chars.
    pub fn normalized(self) -> Result<Self, String> {
        match self {
            FieldValue::Mood(mood) => {
                let mood = mood.trim();
                if mood.is_empty() {
                    return Err("mood must not be empty".into());
                }
                if mood.chars().count() > MOOD_MAX_CHARS {
                    return Err(format!("mood is longer than {MOOD_MAX_CHARS} characters"));
                }
                Ok(FieldValue::Mood(mood.to_string()))
            }
            FieldValue::Intensity(n) => {
                Ok(FieldValue::Intensity(n.clamp(INTENSITY_MIN, INTENSITY_MAX)))
            }
            FieldValue::Note(note) => Ok(FieldValue::Note(
                note.chars().take(NOTE_MAX_CHARS).collect(),
            )),
        }
    }
}

/// Finalized payload handed to the submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickCheckIn {
    pub mood: String,
    pub intensity: u8,
    pub note: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Mutable draft keyed by step index.
#[derive(Debug, Clone, Default)]
pub struct SessionRecord {
    fields: BTreeMap<usize, FieldValue>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `step_index`, returning what it replaced.
    pub(crate) fn record(&mut self, step_index: usize, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(step_index, value)
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the submission payload, filling unanswered fields with defaults.
    /// If several steps collect the same kind, the later step wins.
    pub fn finalize(&self) -> QuickCheckIn {
        let mut mood = None;
        let mut intensity = None;
        let mut note = None;
        for value in self.fields.values() {
            match value {
                FieldValue::Mood(m) => mood = Some(m.clone()),
                FieldValue::Intensity(n) => intensity = Some(*n),
                FieldValue::Note(t) => note = Some(t.trim().to_string()),
            }
        }

        QuickCheckIn {
            mood: mood.unwrap_or_else(|| DEFAULT_MOOD.to_string()),
            intensity: intensity
                .map(|n| n.clamp(INTENSITY_MIN, INTENSITY_MAX) as u8)
                .unwrap_or(DEFAULT_INTENSITY),
            note: note
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_NOTE.to_string()),
            kind: CHECKIN_TYPE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_finalizes_to_defaults() {
        let record = SessionRecord::new().finalize();
        assert_eq!(record.mood, "😐");
        assert_eq!(record.intensity, 5);
        assert_eq!(record.note, DEFAULT_NOTE);
        assert_eq!(record.kind, "quick");
    }

    #[test]
    fn payload_serializes_type_discriminator() {
        let json = serde_json::to_value(SessionRecord::new().finalize()).unwrap();
        assert_eq!(json["type"], "quick");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn intensity_is_clamped() {
        assert_eq!(
            FieldValue::Intensity(42).normalized().unwrap(),
            FieldValue::Intensity(10)
        );
        assert_eq!(
            FieldValue::Intensity(-3).normalized().unwrap(),
            FieldValue::Intensity(1)
        );
    }

    #[test]
    fn mood_rules() {
        assert!(FieldValue::Mood("   ".into()).normalized().is_err());
        assert!(FieldValue::Mood("x".repeat(17)).normalized().is_err());
        assert_eq!(
            FieldValue::Mood(" 🙂 ".into()).normalized().unwrap(),
            FieldValue::Mood("🙂".into())
        );
    }

    #[test]
    fn note_is_truncated_on_char_boundary() {
        let long = "é".repeat(250);
        match FieldValue::Note(long).normalized().unwrap() {
            FieldValue::Note(n) => assert_eq!(n.chars().count(), NOTE_MAX_CHARS),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn later_value_overwrites_earlier_for_same_step() {
        let mut record = SessionRecord::new();
        record.record(0, FieldValue::Mood("🙁".into()));
        let previous = record.record(0, FieldValue::Mood("😄".into()));
        assert_eq!(previous, Some(FieldValue::Mood("🙁".into())));
        assert_eq!(record.len(), 1);
        assert_eq!(record.finalize().mood, "😄");
    }

    #[test]
    fn blank_note_falls_back_to_default() {
        let mut record = SessionRecord::new();
        record.record(2, FieldValue::Note("   ".into()));
        assert_eq!(record.finalize().note, DEFAULT_NOTE);
    }
}
