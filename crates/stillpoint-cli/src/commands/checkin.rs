//! Interactive quick check-in.
//!
//! Stdin is read on a plain thread and forwarded as `SessionCommand`s; the
//! session itself runs on the tokio driver. Closing stdin abandons the
//! session.

use std::io::{BufRead, Write};
use std::time::Duration;

use stillpoint_core::integrations::credentials;
use stillpoint_core::session::MOOD_CHOICES;
use stillpoint_core::{
    run_session, Config, Event, FieldKind, FieldValue, HttpSubmitter, SessionClock,
    SessionCommand, SessionCoordinator, SessionExit, SessionPlan, TokenGate,
};
use tokio::sync::mpsc;

const HELP: &str = "commands: next | back | reset | mood <emoji> | intensity <1-10> | \
note <text> | breathe on|off | done | quit";

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let plan = config.session_plan()?;
    let token = credentials::load_token()?;
    let submitter = HttpSubmitter::with_timeout(
        config.api.base_url.clone(),
        token,
        Duration::from_secs(config.api.timeout_secs),
    )?;

    let mut renderer = Renderer::new(plan.clone());
    let mut coordinator =
        SessionCoordinator::new(submitter, move |event: &Event| renderer.render(event));

    let clock = SessionClock::start();
    coordinator.start_session(&TokenGate, plan.clone(), clock.now_ms())?;
    println!("{HELP}");

    let (tx, mut rx) = mpsc::channel(16);
    let input_plan = plan;
    std::thread::spawn(move || forward_lines(std::io::stdin().lock(), &input_plan, &tx));

    match run_session(&mut coordinator, &clock, &mut rx).await {
        SessionExit::Completed(receipt) => match receipt.id {
            Some(id) => println!("Check-in saved (#{id})."),
            None => println!("Check-in saved."),
        },
        SessionExit::Abandoned => println!("Check-in abandoned."),
        SessionExit::NotRunning => {}
    }
    Ok(())
}

/// Forward parsed lines until EOF, a read error, or the session going away.
/// Undecodable lines are reported and skipped.
fn forward_lines<R: BufRead>(reader: R, plan: &SessionPlan, tx: &mpsc::Sender<SessionCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                eprintln!("ignored input that is not valid UTF-8");
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        match parse_command(&line, plan) {
            Ok(Some(command)) => {
                if tx.blocking_send(command).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => eprintln!("{message}\n{HELP}"),
        }
    }
}

/// Turn one input line into a command. Blank lines are ignored.
fn parse_command(line: &str, plan: &SessionPlan) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "next" | "n" => SessionCommand::Next,
        "back" | "b" => SessionCommand::Back,
        "reset" => SessionCommand::Reset,
        "done" => SessionCommand::Complete,
        "quit" | "q" => SessionCommand::Abandon,
        "breathe" => match rest {
            "on" | "start" => SessionCommand::Breathing(true),
            "off" | "stop" => SessionCommand::Breathing(false),
            _ => return Err("usage: breathe on|off".into()),
        },
        "mood" => record(plan, FieldKind::Mood, FieldValue::Mood(rest.to_string()))?,
        "intensity" => {
            let n = rest
                .parse::<i64>()
                .map_err(|_| format!("not a number: {rest:?}"))?;
            record(plan, FieldKind::Intensity, FieldValue::Intensity(n))?
        }
        "note" => record(plan, FieldKind::Note, FieldValue::Note(rest.to_string()))?,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(command))
}

fn record(plan: &SessionPlan, kind: FieldKind, value: FieldValue) -> Result<SessionCommand, String> {
    let step_index = plan
        .steps
        .steps
        .iter()
        .position(|s| s.collects == Some(kind))
        .ok_or_else(|| format!("this check-in has no {kind:?} step"))?;
    Ok(SessionCommand::Record { step_index, value })
}

/// Prints session events as terminal lines.
struct Renderer {
    plan: SessionPlan,
}

impl Renderer {
    fn new(plan: SessionPlan) -> Self {
        Self { plan }
    }

    fn render(&mut self, event: &Event) {
        match event {
            Event::StepChanged {
                to,
                title,
                duration_ms,
                ..
            } => {
                println!("\n{}", self.step_header(*to, title, *duration_ms));
                if let Some(hint) = self.hint(*to) {
                    println!("  {hint}");
                }
            }
            Event::CountdownTick { remaining_ms, .. } => {
                let mut out = std::io::stdout();
                let _ = write!(out, "\r  {:>2}s left ", remaining_ms.div_ceil(1000));
                let _ = out.flush();
            }
            Event::CountdownExpired { .. } => {
                println!("\n  time is up: `next`, `back` or `done`");
            }
            Event::PhaseChanged { name, .. } => println!("\r  ~ {name}"),
            Event::FieldRecorded { field, .. } => println!("\r  {field:?} noted"),
            Event::SubmissionFailed { message, .. } => {
                eprintln!("\nCould not save check-in: {message}. Type `done` to retry.");
            }
            Event::SessionCompleted { record, .. } => {
                println!("\n{} {}/10  {}", record.mood, record.intensity, record.note);
            }
            _ => {}
        }
    }

    fn step_header(&self, step_index: usize, title: &str, duration_ms: u64) -> String {
        let steps = &self.plan.steps;
        format!(
            "[{}] {title} ({}s, {:.0}%)",
            steps.display_position(step_index),
            duration_ms.div_ceil(1000),
            steps.progress_pct(step_index)
        )
    }

    fn hint(&self, step_index: usize) -> Option<String> {
        if step_index == self.plan.breathing_step {
            return Some("breathe along; `breathe off` to pause, `done` to finish".into());
        }
        let kind = self.plan.steps.get(step_index)?.collects?;
        Some(match kind {
            FieldKind::Mood => format!("mood <{}>", MOOD_CHOICES.join(" ")),
            FieldKind::Intensity => "intensity <1-10>".into(),
            FieldKind::Note => "note <text> (optional)".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SessionPlan {
        SessionPlan::quick_checkin()
    }

    #[test]
    fn navigation_words() {
        assert_eq!(parse_command("next", &plan()), Ok(Some(SessionCommand::Next)));
        assert_eq!(parse_command(" B ", &plan()), Ok(Some(SessionCommand::Back)));
        assert_eq!(parse_command("done", &plan()), Ok(Some(SessionCommand::Complete)));
        assert_eq!(parse_command("", &plan()), Ok(None));
    }

    #[test]
    fn answers_target_the_collecting_step() {
        assert_eq!(
            parse_command("intensity 7", &plan()),
            Ok(Some(SessionCommand::Record {
                step_index: 1,
                value: FieldValue::Intensity(7)
            }))
        );
        assert_eq!(
            parse_command("note  long day at work", &plan()),
            Ok(Some(SessionCommand::Record {
                step_index: 2,
                value: FieldValue::Note("long day at work".into())
            }))
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse_command("intensity high", &plan()).is_err());
        assert!(parse_command("breathe maybe", &plan()).is_err());
        assert!(parse_command("dance", &plan()).is_err());
    }

    #[test]
    fn invalid_utf8_line_does_not_end_input() {
        let (tx, mut rx) = mpsc::channel(4);
        let input: &[u8] = b"\xff\xfe\nnext\ndone\n";

        forward_lines(input, &plan(), &tx);

        assert_eq!(rx.try_recv(), Ok(SessionCommand::Next));
        assert_eq!(rx.try_recv(), Ok(SessionCommand::Complete));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn step_header_shows_position_and_progress() {
        let renderer = Renderer::new(plan());
        assert_eq!(
            renderer.step_header(1, "Rate the intensity (1-10)", 7_500),
            "[Step 2/4] Rate the intensity (1-10) (8s, 50%)"
        );
    }

    #[test]
    fn breathing_hint_on_breathing_step() {
        let renderer = Renderer::new(plan());
        assert!(renderer.hint(3).unwrap().contains("breathe"));
        assert!(renderer.hint(0).unwrap().contains("😐"));
    }
}
