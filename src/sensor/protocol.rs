//! Line protocol spoken by the sensor boards.
//!
//! Inbound, newline-terminated ASCII:
//! - `HgyroP<x>,<y>`: orientation reading, each number `-?digits.digits`
//! - `HspeedPgo`: boost button
//!
//! Outbound: `<n>\n`, the number of LEDs to light (0-8).

use thiserror::Error;

/// Prefix of an orientation line.
pub const ORIENTATION_PREFIX: &str = "HgyroP";

/// The boost command line.
pub const BOOST_COMMAND: &str = "HspeedPgo";

/// Longest line kept while waiting for its terminator.
const MAX_LINE: usize = 256;

/// A classified inbound line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorMessage {
    /// Orientation reading in the sensor frame.
    Orientation {
        /// Reading along the sensor's x axis.
        x: f32,
        /// Reading along the sensor's y axis.
        y: f32,
    },
    /// The boost button was pressed.
    Boost,
}

/// Why a line was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing but whitespace.
    #[error("empty line")]
    Empty,
    /// Neither grammar matched.
    #[error("unrecognized message '{0}'")]
    Unrecognized(String),
    /// Orientation prefix with numbers that do not fit `-?digits.digits`.
    #[error("malformed orientation '{0}'")]
    MalformedNumber(String),
}

/// Classify one line. Surrounding whitespace (including `\r`) is ignored.
///
/// # Errors
///
/// Returns a [`ParseError`] for anything that is not exactly one of the
/// two grammars. Callers drop such lines.
pub fn parse_line(line: &str) -> Result<SensorMessage, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    if line == BOOST_COMMAND {
        return Ok(SensorMessage::Boost);
    }
    let Some(body) = line.strip_prefix(ORIENTATION_PREFIX) else {
        return Err(ParseError::Unrecognized(line.to_string()));
    };

    let malformed = || ParseError::MalformedNumber(line.to_string());
    let (x, y) = body.split_once(',').ok_or_else(malformed)?;
    if !is_decimal(x) || !is_decimal(y) {
        return Err(malformed());
    }
    let x: f32 = x.parse().map_err(|_| malformed())?;
    let y: f32 = y.parse().map_err(|_| malformed())?;
    // Overlong digit runs parse to infinity.
    if !x.is_finite() || !y.is_finite() {
        return Err(malformed());
    }
    Ok(SensorMessage::Orientation { x, y })
}

/// `-?\d+\.\d+`
fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    digits.split_once('.').is_some_and(|(int, frac)| {
        !int.is_empty()
            && !frac.is_empty()
            && int.bytes().all(|b| b.is_ascii_digit())
            && frac.bytes().all(|b| b.is_ascii_digit())
    })
}

/// Outbound LED command for `count` lit LEDs.
#[must_use]
pub fn led_command(count: u8) -> String {
    format!("{count}\n")
}

/// Reassembles newline-terminated lines from arbitrary read chunks.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    ///
    /// A partial line that grows past a sane length without a terminator is
    /// noise, and is thrown away.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_LINE && !self.pending.contains(&b'\n') {
            self.pending.clear();
        }
    }

    /// Next complete line, decoded lossily, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }

    /// Bytes waiting for a terminator.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_orientation() {
        assert_eq!(
            parse_line("HgyroP-1.25,0.40"),
            Ok(SensorMessage::Orientation { x: -1.25, y: 0.4 })
        );
        assert_eq!(
            parse_line("HgyroP0.0,-12.5\r"),
            Ok(SensorMessage::Orientation { x: 0.0, y: -12.5 })
        );
    }

    #[test]
    fn test_parse_boost() {
        assert_eq!(parse_line("HspeedPgo"), Ok(SensorMessage::Boost));
        assert_eq!(parse_line("  HspeedPgo\r\n"), Ok(SensorMessage::Boost));
        assert!(matches!(parse_line("HspeedPgone"), Err(ParseError::Unrecognized(_))));
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        for line in [
            "HgyroP1,2",
            "HgyroP1.0",
            "HgyroP1.0,",
            "HgyroP.5,1.0",
            "HgyroP1.0,2.0,3.0",
            "HgyroP+1.0,2.0",
            "HgyroP1.0, 2.0",
            "HgyroP1e3,2.0",
            "HgyroP--1.0,2.0",
        ] {
            assert!(
                matches!(parse_line(line), Err(ParseError::MalformedNumber(_))),
                "{line} should be malformed"
            );
        }
    }

    #[test]
    fn test_overflowing_numbers_are_rejected() {
        let huge = "9".repeat(45);
        for line in [format!("HgyroP{huge}.0,0.0"), format!("HgyroP0.0,-{huge}.5")] {
            assert!(
                matches!(parse_line(&line), Err(ParseError::MalformedNumber(_))),
                "{line} should be malformed"
            );
        }
        assert_eq!(
            parse_line("HgyroP123456.5,-0.0001"),
            Ok(SensorMessage::Orientation { x: 123_456.5, y: -0.0001 })
        );
    }

    #[test]
    fn test_other_lines_are_unrecognized() {
        assert_eq!(parse_line(""), Err(ParseError::Empty));
        assert!(matches!(parse_line("hello"), Err(ParseError::Unrecognized(_))));
        assert!(matches!(parse_line("gyroP1.0,2.0"), Err(ParseError::Unrecognized(_))));
    }

    #[test]
    fn test_led_command() {
        assert_eq!(led_command(0), "0\n");
        assert_eq!(led_command(8), "8\n");
    }

    #[test]
    fn test_decoder_splits_chunks() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"HgyroP1.0,");
        assert_eq!(decoder.next_line(), None);
        decoder.extend(b"2.0\nHspeed");
        assert_eq!(decoder.next_line().as_deref(), Some("HgyroP1.0,2.0"));
        assert_eq!(decoder.next_line(), None);
        decoder.extend(b"Pgo\r\n\n");
        assert_eq!(decoder.next_line().as_deref(), Some("HspeedPgo\r"));
        assert_eq!(decoder.next_line().as_deref(), Some(""));
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_decoder_drops_runaway_garbage() {
        let mut decoder = LineDecoder::new();
        decoder.extend(&[b'x'; 300]);
        assert_eq!(decoder.pending(), 0);
        decoder.extend(b"HspeedPgo\n");
        assert_eq!(decoder.next_line().as_deref(), Some("HspeedPgo"));
    }

    #[test]
    fn test_decoder_is_lossy_on_invalid_utf8() {
        let mut decoder = LineDecoder::new();
        decoder.extend(&[0xff, b'a', b'\n']);
        let line = decoder.next_line().unwrap();
        assert!(line.ends_with('a'));
        assert!(parse_line(&line).is_err());
    }
}
