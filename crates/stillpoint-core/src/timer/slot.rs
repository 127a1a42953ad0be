use serde::{Deserialize, Serialize};

/// The single one-shot timer a component may hold.
///
/// Arming replaces whatever was pending, so a component can never have more
/// than one outstanding timer. Firing and cancelling both release the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSlot {
    due_ms: Option<u64>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, due_ms: u64) {
        self.due_ms = Some(due_ms);
    }

    /// Returns `true` if a pending timer was released.
    pub fn cancel(&mut self) -> bool {
        self.due_ms.take().is_some()
    }

    pub fn due_ms(&self) -> Option<u64> {
        self.due_ms
    }

    pub fn is_armed(&self) -> bool {
        self.due_ms.is_some()
    }

    /// Fire the timer if it is due at `now_ms`, returning its scheduled instant.
    pub fn take_due(&mut self, now_ms: u64) -> Option<u64> {
        match self.due_ms {
            Some(due) if due <= now_ms => self.due_ms.take(),
            _ => None,
        }
    }
}
