//! End-to-end check-in scenarios driven on a simulated clock.

use stillpoint_core::integrations::BoxError;
use stillpoint_core::timer::{FieldKind, Phase};
use stillpoint_core::{
    AdvancePolicy, CompletionOutcome, CoreError, Event, EventLog, FieldValue, PhaseTimeline,
    QuickCheckIn, SessionCoordinator, SessionError, SessionPhase, SessionPlan, StaticGate, Step,
    StepList, SubmissionReceipt, Submitter,
};

#[derive(Default)]
struct CountingSubmitter {
    records: Vec<QuickCheckIn>,
    failures_left: usize,
}

impl Submitter for CountingSubmitter {
    async fn submit(&mut self, record: &QuickCheckIn) -> Result<SubmissionReceipt, BoxError> {
        self.records.push(record.clone());
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err("HTTP 502: bad gateway".into());
        }
        Ok(SubmissionReceipt {
            id: Some(7),
            created_at: Some("2026-01-01T00:00:00Z".into()),
        })
    }
}

fn gating_plan() -> SessionPlan {
    SessionPlan {
        steps: StepList::new(vec![
            Step::new("One", 15_000),
            Step::new("Two", 15_000),
            Step::new("Three", 15_000),
            Step::new("Breathe", 60_000),
        ])
        .unwrap(),
        breathing_step: 3,
        breathing_timeline: PhaseTimeline::new(vec![
            Phase::new("Breathe in", 4_000, 150.0),
            Phase::new("Hold", 2_000, 150.0),
            Phase::new("Breathe out", 6_000, 80.0),
        ])
        .unwrap(),
        policy: AdvancePolicy::Auto,
        cadence_ms: 1_000,
    }
}

fn coordinator() -> SessionCoordinator<CountingSubmitter, EventLog> {
    SessionCoordinator::new(CountingSubmitter::default(), EventLog::new())
}

#[test]
fn breathing_runs_only_on_its_step_and_restarts_from_phase_zero() {
    let mut c = coordinator();
    c.start_session(&StaticGate(true), gating_plan(), 0).unwrap();
    assert!(!c.cycler().is_active());

    c.next(100);
    c.next(200);
    c.next(1_000);
    assert!(c.on_breathing_step());
    assert!(c.cycler().is_active());
    assert_eq!(c.cycler().phase_index(), 0);

    c.advance_to(6_500);
    assert_eq!(c.cycler().phase_index(), 1);
    assert_eq!(c.cycler().output().name, "Hold");

    c.back(6_500);
    assert!(!c.cycler().is_active());
    assert_eq!(c.cycler().next_deadline(), None);
    let idle = c.cycler().output();
    assert!(!idle.active);
    assert_eq!(idle.visual_target, 100.0);

    // Time passing on step 2 produces no breathing phases.
    let before = c.sink().phase_names().len();
    c.advance_to(12_000);
    assert_eq!(c.sink().phase_names().len(), before);

    c.next(12_000);
    assert!(c.cycler().is_active());
    assert_eq!(c.cycler().phase_index(), 0);
    assert_eq!(c.cycler().state().phase_started_at_ms, 12_000);
    assert_eq!(
        c.sink().phase_names(),
        vec!["Breathe in", "Hold", "Breathe in"]
    );
}

#[test]
fn quick_checkin_auto_advances_into_breathing() {
    let mut c = coordinator();
    c.start_session(&StaticGate(true), SessionPlan::quick_checkin(), 0)
        .unwrap();

    c.advance_to(39_999);
    assert_eq!(c.sequencer().current_step_index(), 2);
    assert!(!c.cycler().is_active());

    c.advance_to(40_000);
    assert_eq!(c.sequencer().current_step_index(), 3);
    assert!(c.cycler().is_active());
    assert_eq!(c.sink().step_path(), vec![0, 1, 2, 3]);

    // The last step clamps at zero and waits.
    c.advance_to(70_000);
    assert_eq!(c.sequencer().current_step_index(), 3);
    assert_eq!(c.sequencer().remaining_ms(), 0);
    assert!(c
        .sink()
        .events()
        .iter()
        .any(|e| matches!(e, Event::CountdownExpired { step_index: 3, .. })));
    // Breathing keeps looping until the session ends.
    assert!(c.cycler().is_active());
}

#[test]
fn hold_policy_waits_on_every_step() {
    let mut plan = SessionPlan::quick_checkin();
    plan.policy = AdvancePolicy::Hold;
    let mut c = coordinator();
    c.start_session(&StaticGate(true), plan, 0).unwrap();

    c.advance_to(100_000);
    assert_eq!(c.sequencer().current_step_index(), 0);
    assert_eq!(c.sequencer().next_deadline(), None);

    c.next(100_000);
    assert_eq!(c.sequencer().remaining_ms(), 10_000);
}

#[test]
fn unauthenticated_start_arms_nothing() {
    let mut c = coordinator();
    let err = c
        .start_session(&StaticGate(false), SessionPlan::quick_checkin(), 0)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Session(SessionError::AuthenticationRequired)
    ));
    assert_eq!(c.phase(), SessionPhase::Idle);
    assert_eq!(c.next_deadline(), None);
    assert!(c.sink().events().is_empty());
}

#[tokio::test]
async fn completion_submits_exactly_once() {
    let mut c = coordinator();
    c.start_session(&StaticGate(true), SessionPlan::quick_checkin(), 0)
        .unwrap();
    c.record_field(0, FieldValue::Mood("😄".into()), 1_000)
        .unwrap();
    c.advance_to(15_000);
    c.record_field(1, FieldValue::Intensity(8), 15_500)
        .unwrap();

    let first = c.complete(16_000).await.unwrap();
    let second = c.complete(16_001).await.unwrap();

    assert!(matches!(first, CompletionOutcome::Submitted(_)));
    assert_eq!(second, CompletionOutcome::AlreadySubmitted);
    assert_eq!(c.submitter().records.len(), 1);

    let sent = &c.submitter().records[0];
    assert_eq!(sent.mood, "😄");
    assert_eq!(sent.intensity, 8);
    assert_eq!(sent.note, "Quick check-in completed");
    assert_eq!(sent.kind, "quick");
    assert_eq!(c.next_deadline(), None);

    let completions: Vec<u64> = c
        .sink()
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::SessionCompleted { at_ms, .. } => Some(*at_ms),
            _ => None,
        })
        .collect();
    assert_eq!(completions, vec![16_000]);
}

#[tokio::test]
async fn failed_submission_can_be_retried() {
    let mut c = SessionCoordinator::new(
        CountingSubmitter {
            failures_left: 1,
            ..Default::default()
        },
        EventLog::new(),
    );
    c.start_session(&StaticGate(true), SessionPlan::quick_checkin(), 0)
        .unwrap();
    c.record_field(2, FieldValue::Note("slept badly".into()), 500)
        .unwrap();

    let err = c.complete(1_000).await.unwrap_err();
    assert!(matches!(err, SessionError::SubmissionFailed(ref m) if m.contains("502")));
    assert_eq!(c.phase(), SessionPhase::Running);
    assert!(c
        .sink()
        .events()
        .iter()
        .any(|e| matches!(e, Event::SubmissionFailed { .. })));

    let outcome = c.complete(2_000).await.unwrap();
    assert!(matches!(outcome, CompletionOutcome::Submitted(_)));
    assert_eq!(c.submitter().records.len(), 2);
    assert_eq!(c.submitter().records[1].note, "slept badly");
}

#[test]
fn answers_must_match_the_step() {
    let mut c = coordinator();
    c.start_session(&StaticGate(true), SessionPlan::quick_checkin(), 0)
        .unwrap();

    let err = c
        .record_field(0, FieldValue::Intensity(3), 0)
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidField { step_index: 0, .. }));
    assert!(c.record_field(9, FieldValue::Mood("🙂".into()), 0).is_err());
    assert_eq!(
        SessionPlan::quick_checkin().steps.get(1).and_then(|s| s.collects),
        Some(FieldKind::Intensity)
    );
}

#[test]
fn abandon_releases_every_timer() {
    let mut c = coordinator();
    c.start_session(&StaticGate(true), SessionPlan::quick_checkin(), 0)
        .unwrap();
    c.advance_to(41_000);
    assert!(c.cycler().is_active());

    assert!(c.abandon(41_500));
    assert_eq!(c.phase(), SessionPhase::Abandoned);
    assert_eq!(c.next_deadline(), None);
    assert!(!c.abandon(42_000));

    let events_before = c.sink().events().len();
    c.advance_to(100_000);
    assert_eq!(c.sink().events().len(), events_before);
}

#[test]
fn reset_discards_answers_and_returns_to_first_step() {
    let mut c = coordinator();
    c.start_session(&StaticGate(true), SessionPlan::quick_checkin(), 0)
        .unwrap();
    c.record_field(0, FieldValue::Mood("🙁".into()), 0).unwrap();
    c.advance_to(41_000);

    assert!(c.reset(41_000));
    assert_eq!(c.sequencer().current_step_index(), 0);
    assert_eq!(c.sequencer().remaining_ms(), 15_000);
    assert!(!c.cycler().is_active());
    assert_eq!(c.preview().mood, "😐");
}
