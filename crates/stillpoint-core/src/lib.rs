//! # Stillpoint Core Library
//!
//! Timing engine for short guided wellness sessions: a looping breathing
//! cycler, a countdown step sequencer, and a coordinator that runs the quick
//! check-in wizard on top of both. The `stillpoint` CLI is a thin terminal
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: sans-IO state machines. Callers pass `now_ms` in and get
//!   events back; each component owns a single timer slot and exposes its
//!   next deadline.
//! - **Session**: gates breathing on the breathing step, accumulates the
//!   check-in answers and submits them once.
//! - **Driver**: tokio loops that run the engine in real time.
//! - **Integrations**: HTTP submission and keyring-backed authentication.
//! - **Storage**: TOML configuration.
//!
//! ## Key Components
//!
//! - [`BreathingCycler`]: inhale/hold/exhale loop
//! - [`StepSequencer`]: timed, navigable step list
//! - [`SessionCoordinator`]: the check-in session
//! - [`Config`]: application configuration management

pub mod driver;
pub mod error;
pub mod events;
pub mod integrations;
pub mod session;
pub mod storage;
pub mod timer;

pub use driver::{run_breathing, run_session, SessionClock, SessionCommand, SessionExit};
pub use error::{ConfigError, CoreError, SessionError, TimelineError};
pub use events::{Event, EventLog, NullSink, PresentationSink, TransitionCause};
pub use integrations::{
    AuthGate, HttpSubmitter, StaticGate, SubmissionReceipt, Submitter, TokenGate,
};
pub use session::{
    CompletionOutcome, FieldValue, QuickCheckIn, SessionCoordinator, SessionPhase, SessionPlan,
};
pub use storage::Config;
pub use timer::{
    AdvancePolicy, BreathingCycler, FieldKind, Phase, PhaseTimeline, Step, StepList,
    StepSequencer, TimerSlot,
};
