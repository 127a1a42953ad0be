mod cycler;
mod phase;
mod sequencer;
mod slot;
mod step;

pub use cycler::{BreathingCycler, CyclerState, PhaseOutput};
pub use phase::{Phase, PhaseTimeline, DEFAULT_REST_TARGET, IDLE_LABEL};
pub use sequencer::{AdvancePolicy, SequencerState, StepOutput, StepSequencer, DEFAULT_CADENCE_MS};
pub use slot::TimerSlot;
pub use step::{FieldKind, Step, StepList};
