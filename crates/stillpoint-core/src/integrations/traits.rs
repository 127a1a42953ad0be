use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::session::QuickCheckIn;

/// Error type returned by collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What the remote side sent back for an accepted check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Persists a finished check-in. Called at most once per successful session;
/// failures are not retried automatically.
pub trait Submitter {
    fn submit(
        &mut self,
        record: &QuickCheckIn,
    ) -> impl Future<Output = Result<SubmissionReceipt, BoxError>> + Send;
}

/// Capability check consulted before a session may start any timers.
pub trait AuthGate {
    fn is_authenticated(&self) -> bool;
}

/// Fixed answer, for offline use and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticGate(pub bool);

impl AuthGate for StaticGate {
    fn is_authenticated(&self) -> bool {
        self.0
    }
}
