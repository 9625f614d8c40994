//! Output formatting utilities for CLI.

use ledagogo::game::{GameEvent, InputSource, PowerUpState};
use ledagogo::session::DeviceReport;
use ledagogo::SessionState;
use serde::Serialize;
use std::fmt::Write as _;

/// One event line of the JSON stream.
#[derive(Debug, Serialize)]
pub(super) struct JsonEvent<'a> {
    /// Elapsed seconds when the event happened.
    pub(super) elapsed: u32,
    /// The event itself, flattened next to `elapsed`.
    #[serde(flatten)]
    pub(super) event: &'a GameEvent,
}

/// JSON-serializable session result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSummary {
    /// Random seed used.
    pub(super) seed: u64,
    /// Why the session ended (null if it is still running).
    pub(super) reason: Option<String>,
    /// Winner player ID (null if nobody scored).
    pub(super) winner: Option<u8>,
    /// Elapsed seconds at the last tick.
    pub(super) elapsed: u32,
    /// Ticks simulated.
    pub(super) ticks: u64,
    /// Per-player results.
    pub(super) players: Vec<JsonPlayerResult>,
    /// Per-device traffic.
    pub(super) devices: Vec<JsonDeviceReport>,
}

/// JSON-serializable player result.
#[derive(Debug, Serialize)]
pub(super) struct JsonPlayerResult {
    /// Player ID (1-4).
    pub(super) id: u8,
    /// Final score.
    pub(super) score: u32,
    /// LEDs lit on the ladder.
    pub(super) active_leds: u8,
    /// Tiles still claimed.
    pub(super) tiles: usize,
    /// Power-up state at the end.
    pub(super) power: PowerUpState,
    /// Whether a sensor board drove the player.
    pub(super) sensor: bool,
}

/// JSON-serializable receiver counters.
#[derive(Debug, Serialize)]
pub(super) struct JsonDeviceReport {
    /// Player the device belonged to.
    pub(super) player: u8,
    /// Orientation samples received.
    pub(super) samples: u64,
    /// Boost commands received.
    pub(super) commands: u64,
    /// Lines discarded as malformed.
    pub(super) discarded: u64,
    /// Samples dropped from a full buffer.
    pub(super) evicted: u64,
    /// Failed reads.
    pub(super) io_errors: u64,
}

impl JsonSummary {
    /// Create from the final state.
    pub(super) fn from_state(state: &SessionState, seed: u64, reports: &[DeviceReport]) -> Self {
        Self {
            seed,
            reason: state.end_reason().map(|r| r.to_string()),
            winner: state.winner(),
            elapsed: state.elapsed(),
            ticks: state.ticks(),
            players: state
                .players()
                .iter()
                .map(|p| JsonPlayerResult {
                    id: p.id,
                    score: p.score,
                    active_leds: p.active_leds,
                    tiles: state.grid().claimed_count(p.id),
                    power: p.power,
                    sensor: p.has_sensor(),
                })
                .collect(),
            devices: reports
                .iter()
                .map(|r| JsonDeviceReport {
                    player: r.player,
                    samples: r.counts.samples,
                    commands: r.counts.commands,
                    discarded: r.counts.discarded,
                    evicted: r.counts.evicted,
                    io_errors: r.counts.io_errors,
                })
                .collect(),
        }
    }
}

/// Format one event as a text line.
pub(super) fn format_event(elapsed: u32, event: &GameEvent) -> String {
    format!("[{elapsed:>4}s] {event}")
}

/// Whether an event is worth printing in text mode without `RUST_LOG` noise.
///
/// Plain claims happen on almost every tick a player moves.
pub(super) const fn is_notable(event: &GameEvent) -> bool {
    !matches!(event, GameEvent::Occupancy { .. })
}

/// Short name for a player's input source.
pub(super) const fn input_label(input: &InputSource) -> &'static str {
    match input {
        InputSource::Idle => "idle",
        InputSource::Keyboard(_) => "keyboard",
        InputSource::Sensor(_) => "sensor",
    }
}

/// Format a session result as human-readable text.
pub(super) fn format_text(state: &SessionState, seed: u64, reports: &[DeviceReport]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Session Result (seed: {seed})");
    match state.end_reason() {
        Some(reason) => {
            let _ = writeln!(output, "  Ended: {reason} after {}s", state.elapsed());
        }
        None => {
            let _ = writeln!(output, "  Ended: still running at {}s", state.elapsed());
        }
    }
    match state.winner() {
        Some(winner) => {
            let _ = writeln!(output, "  Winner: Player {winner}");
        }
        None => {
            let _ = writeln!(output, "  Winner: none");
        }
    }
    output.push('\n');

    for p in state.players() {
        let _ = writeln!(
            output,
            "  Player {}: {} points, {} LEDs, {} tiles ({})",
            p.id,
            p.score,
            p.active_leds,
            state.grid().claimed_count(p.id),
            input_label(&p.input),
        );
    }

    if !reports.is_empty() {
        output.push('\n');
        for r in reports {
            let c = r.counts;
            let _ = writeln!(
                output,
                "  Sensor P{}: {} samples, {} commands, {} discarded, {} evicted, {} I/O errors",
                r.player, c.samples, c.commands, c.discarded, c.evicted, c.io_errors
            );
        }
    }

    output
}
