//! Probe command implementation - dump a sensor board's serial traffic.

use super::CliError;
use ledagogo::sensor::{
    open_serial, parse_line, LedSink, LineDecoder, SensorMessage, SerialLed, SerialLink,
};
use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Give up after this long without a byte.
const IDLE_LIMIT: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(10);

/// Execute the probe command.
///
/// # Errors
///
/// Returns an error if the device cannot be opened or read.
pub(crate) fn execute(path: &str, baud: u32, lines: u32, leds: Option<u8>) -> Result<(), CliError> {
    let mut link = open_serial(path, baud, Duration::from_secs(2))?;
    println!("Probing {} at {baud} baud", link.name());

    if let Some(count) = leds {
        SerialLed::new(0, &mut link).set_leds(count)?;
        println!("  Sent LED command: {count}");
    }

    let seen = read_lines(&mut link, lines, IDLE_LIMIT, |n, line| {
        println!("  {n:>3}: {}", describe(line));
    })?;
    if seen < lines {
        println!("  No data for {}s, giving up", IDLE_LIMIT.as_secs());
    }

    Ok(())
}

/// Read until `lines` complete lines arrived or the link stayed quiet for
/// `idle_limit`, returning how many were seen.
fn read_lines(
    link: &mut impl SerialLink,
    lines: u32,
    idle_limit: Duration,
    mut on_line: impl FnMut(u32, &str),
) -> Result<u32, CliError> {
    let mut decoder = LineDecoder::new();
    let mut buf = [0u8; 256];
    let mut seen = 0;
    let mut last_byte = Instant::now();

    while seen < lines {
        let pending = link.bytes_available()?;
        if pending == 0 {
            if last_byte.elapsed() >= idle_limit {
                break;
            }
            thread::sleep(POLL);
            continue;
        }

        let len = pending.min(buf.len());
        let n = match link.read(&mut buf[..len]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(e.into()),
        };
        last_byte = Instant::now();
        decoder.extend(&buf[..n]);

        while let Some(line) = decoder.next_line() {
            seen += 1;
            on_line(seen, &line);
            if seen == lines {
                break;
            }
        }
    }

    Ok(seen)
}

fn describe(line: &str) -> String {
    match parse_line(line) {
        Ok(SensorMessage::Orientation { x, y }) => format!("orientation x={x:+.2} y={y:+.2}"),
        Ok(SensorMessage::Boost) => "boost".to_string(),
        Err(e) => format!("discarded ({e}): {line:?}"),
    }
}
