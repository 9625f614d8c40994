//! Run command implementation.

use super::output::{format_event, format_text, is_notable, JsonEvent, JsonSummary};
use super::{resolve_seed, CliError, OutputFormat, SessionArgs};
use indicatif::{ProgressBar, ProgressStyle};
use ledagogo::game::GameEvent;
use ledagogo::session::SerialOpener;
use ledagogo::{Session, SimulationClock};
use std::ops::ControlFlow;
use tracing::info;

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the config is invalid, the connector cannot start,
/// or output fails to serialize.
pub(crate) fn execute(
    args: &SessionArgs,
    duration: Option<u32>,
    format: OutputFormat,
    progress: bool,
) -> Result<(), CliError> {
    let mut config = args.load_config()?;
    if let Some(secs) = duration {
        config.timing.session_secs = secs;
    }
    let seed = resolve_seed(&config);
    info!(seed, secs = config.timing.session_secs, "starting session");

    let mut session = Session::from_config(&config, seed);
    session.start_connector(SerialOpener::new(&config.sensor), &config.sensor)?;

    let bar = progress.then(|| {
        let pb = ProgressBar::new(u64::from(config.timing.session_secs));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}s {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    });

    let mut clock = SimulationClock::start(config.timing.tick_interval());
    let mut failure = None;
    session.run(&mut clock, |state, events| {
        let elapsed = state.elapsed();
        for event in events {
            let line = match format {
                OutputFormat::Text if !is_notable(event) => continue,
                OutputFormat::Text => format_event(elapsed, event),
                OutputFormat::Json => match serde_json::to_string(&JsonEvent { elapsed, event }) {
                    Ok(line) => line,
                    Err(e) => {
                        failure = Some(e);
                        return ControlFlow::Break(());
                    }
                },
            };
            match &bar {
                Some(pb) => pb.println(line),
                None => println!("{line}"),
            }
        }
        if let Some(pb) = &bar {
            pb.set_position(u64::from(elapsed));
            pb.set_message(scoreline(events, state.players().iter().map(|p| p.score)));
        }
        ControlFlow::Continue(())
    });

    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
    let (state, reports) = session.shutdown();
    if let Some(e) = failure {
        return Err(e.into());
    }

    match format {
        OutputFormat::Text => print!("\n{}", format_text(&state, seed, &reports)),
        OutputFormat::Json => {
            let summary = JsonSummary::from_state(&state, seed, &reports);
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}

/// Scores shown next to the progress bar, marking a tick that scored.
fn scoreline(events: &[GameEvent], scores: impl Iterator<Item = u32>) -> String {
    let scored = events.iter().any(|e| matches!(e, GameEvent::ScoreAwarded { .. }));
    let scores: Vec<String> = scores
        .enumerate()
        .map(|(i, s)| format!("P{}:{s}", i + 1))
        .collect();
    format!("{}{}", scores.join(" "), if scored { " *" } else { "" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoreline_marks_scoring_ticks() {
        assert_eq!(scoreline(&[], [0, 9, 0, 3].into_iter()), "P1:0 P2:9 P3:0 P4:3");
        let scored = [GameEvent::ScoreAwarded {
            player: 2,
            anchor: ledagogo::Cell::new(10, 6),
            cols: 3,
            rows: 3,
            points: 9,
            score: 9,
        }];
        assert!(scoreline(&scored, [0, 9].into_iter()).ends_with(" *"));
    }
}
