//! Outbound LED ladder commands.

use std::fmt;
use std::io::Write;

use tracing::debug;

use crate::error::{SensorError, SensorResult};
use crate::game::{PlayerId, LED_COUNT};
use crate::sensor::led_command;

/// Something that can display a player's lit LED count.
pub trait LedSink: Send {
    /// Light exactly `count` LEDs (0 switches them all off).
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Write`] if the command could not be delivered.
    fn set_leds(&mut self, count: u8) -> SensorResult<()>;
}

/// LED ladder on a sensor board, driven over its serial link.
pub struct SerialLed<W> {
    player: PlayerId,
    writer: W,
}

impl<W> fmt::Debug for SerialLed<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLed").field("player", &self.player).finish_non_exhaustive()
    }
}

impl<W: Write + Send> SerialLed<W> {
    /// Wrap a writer connected to `player`'s board.
    #[must_use]
    pub const fn new(player: PlayerId, writer: W) -> Self {
        Self { player, writer }
    }

    /// The underlying writer.
    #[must_use]
    pub const fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: Write + Send> LedSink for SerialLed<W> {
    #[allow(clippy::cast_possible_truncation)]
    fn set_leds(&mut self, count: u8) -> SensorResult<()> {
        let count = count.min(LED_COUNT as u8);
        self.writer
            .write_all(led_command(count).as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(|source| SensorError::Write { led: count, source })?;
        debug!(player = self.player, count, "LED command sent");
        Ok(())
    }
}
