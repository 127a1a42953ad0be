mod coordinator;
mod record;

pub use coordinator::{CompletionOutcome, SessionCoordinator, SessionPhase, SessionPlan};
pub use record::{
    FieldValue, QuickCheckIn, SessionRecord, CHECKIN_TYPE, DEFAULT_INTENSITY, DEFAULT_MOOD,
    DEFAULT_NOTE, MOOD_CHOICES, MOOD_MAX_CHARS, NOTE_MAX_CHARS,
};
