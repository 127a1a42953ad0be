use clap::Args;
use stillpoint_core::{run_breathing, BreathingCycler, Config, Event, PhaseTimeline, SessionClock};

#[derive(Args)]
pub struct BreatheArgs {
    /// Built-in timeline: "home" or "exercise" (defaults to breathing.preset)
    #[arg(long)]
    preset: Option<String>,
    /// Stop after this many cycles; 0 runs until Ctrl-C
    #[arg(long)]
    cycles: Option<u32>,
}

pub async fn run(args: BreatheArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let timeline = match &args.preset {
        Some(name) => PhaseTimeline::preset(name).ok_or_else(|| format!("unknown preset: {name}"))?,
        None => config.breathing_timeline()?,
    };
    let cycles = args.cycles.unwrap_or(config.breathing.cycles);

    let clock = SessionClock::start();
    let mut cycler = BreathingCycler::new().with_cycle_limit(cycles);
    let mut render = |event: &Event| render_event(event);

    for event in cycler.start(timeline, clock.now_ms())? {
        render(&event);
    }
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    run_breathing(&mut cycler, &mut render, &clock, shutdown).await;

    println!(
        "{} cycle{} completed",
        cycler.cycles_completed(),
        if cycler.cycles_completed() == 1 { "" } else { "s" }
    );
    Ok(())
}

fn render_event(event: &Event) {
    match event {
        Event::BreathingStarted { .. } => println!("Breathing started. Ctrl-C to stop."),
        Event::PhaseChanged {
            name,
            duration_ms,
            visual_target,
            ..
        } => println!(
            "{name:<12} {:>2}s  {}",
            duration_ms.div_ceil(1000),
            bar(*visual_target)
        ),
        Event::CycleCompleted { cycles, .. } => println!("-- cycle {cycles} --"),
        Event::BreathingStopped { .. } => println!("Breathing stopped."),
        _ => {}
    }
}

/// Circle size as a bar, one cell per 10 units.
fn bar(visual_target: f64) -> String {
    "o".repeat((visual_target / 10.0).round().max(0.0) as usize)
}
