//! Background reader for one player's sensor link.
//!
//! The receiver owns the link for its whole life. It polls for pending bytes,
//! sleeps when there are none, reassembles lines, and routes each valid line
//! into the player's mailbox. A stop flag is checked at the top of every
//! iteration, so [`SensorReceiver::stop`] returns within one poll interval
//! and hands the link back only after the thread has exited.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::game::PlayerId;
use crate::sensor::{
    parse_line, LineDecoder, MailboxProducer, SensorCommand, SensorMessage, SensorSample,
    SerialLink,
};

/// Largest chunk read from the link at once.
const READ_CHUNK: usize = 256;

/// Snapshot of a receiver's traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverCounts {
    /// Orientation samples pushed into the mailbox.
    pub samples: u64,
    /// Boost commands stored in the command slot.
    pub commands: u64,
    /// Lines that matched neither grammar.
    pub discarded: u64,
    /// Samples evicted from a full buffer.
    pub evicted: u64,
    /// Failed polls or reads.
    pub io_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    samples: AtomicU64,
    commands: AtomicU64,
    discarded: AtomicU64,
    evicted: AtomicU64,
    io_errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ReceiverCounts {
        ReceiverCounts {
            samples: self.samples.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
        }
    }
}

/// Handle on a running receiver thread.
///
/// Dropping the handle stops and joins the thread; the link is then dropped
/// with it.
#[derive(Debug)]
pub struct SensorReceiver<L: SerialLink + 'static> {
    player: PlayerId,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<L>>,
}

impl<L: SerialLink + 'static> SensorReceiver<L> {
    /// Start reading `link` for `player` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread.
    pub fn spawn(
        player: PlayerId,
        link: L,
        producer: MailboxProducer,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let worker = Worker {
            player,
            link,
            producer,
            poll_interval,
            stop: Arc::clone(&stop),
            counters: Arc::clone(&counters),
        };
        let handle = thread::Builder::new()
            .name(format!("sensor-p{player}"))
            .spawn(move || worker.run())?;
        debug!(player, "sensor receiver started");

        Ok(Self {
            player,
            stop,
            counters,
            handle: Some(handle),
        })
    }

    /// Player this receiver feeds.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Whether the thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Traffic counters so far.
    #[must_use]
    pub fn counts(&self) -> ReceiverCounts {
        self.counters.snapshot()
    }

    /// Signal the thread to stop, wait for it, and return the link.
    ///
    /// Returns `None` if the thread panicked.
    pub fn stop(mut self) -> Option<L> {
        self.stop.store(true, Ordering::Release);
        let link = self.handle.take()?.join().ok();
        debug!(player = self.player, "sensor receiver stopped");
        link
    }
}

impl<L: SerialLink + 'static> Drop for SensorReceiver<L> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Worker<L> {
    player: PlayerId,
    link: L,
    producer: MailboxProducer,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl<L: SerialLink> Worker<L> {
    fn run(mut self) -> L {
        let mut decoder = LineDecoder::new();
        let mut buf = [0u8; READ_CHUNK];

        while !self.stop.load(Ordering::Acquire) {
            let pending = match self.link.bytes_available() {
                Ok(0) => {
                    thread::sleep(self.poll_interval);
                    continue;
                }
                Ok(n) => n.min(READ_CHUNK),
                Err(e) => {
                    self.io_failure(&e, "poll");
                    continue;
                }
            };

            match self.link.read(&mut buf[..pending]) {
                Ok(n) => decoder.extend(&buf[..n]),
                Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::TimedOut) => {}
                Err(e) => {
                    self.io_failure(&e, "read");
                    continue;
                }
            }

            while let Some(line) = decoder.next_line() {
                self.route(&line);
            }
        }

        self.link
    }

    fn route(&self, line: &str) {
        match parse_line(line) {
            Ok(SensorMessage::Orientation { x, y }) => {
                Counters::bump(&self.counters.samples);
                if self.producer.push(SensorSample::new(self.player, x, y)).is_some() {
                    Counters::bump(&self.counters.evicted);
                }
            }
            Ok(SensorMessage::Boost) => {
                Counters::bump(&self.counters.commands);
                self.producer.set_command(SensorCommand::Boost);
            }
            Err(e) => {
                Counters::bump(&self.counters.discarded);
                trace!(player = self.player, error = %e, "line discarded");
            }
        }
    }

    fn io_failure(&self, error: &io::Error, op: &str) {
        Counters::bump(&self.counters.io_errors);
        warn!(player = self.player, op, %error, "sensor link error");
        thread::sleep(self.poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{mailbox_pair, MemoryLink};
    use std::io::Read;
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(1);

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for receiver");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_routes_samples_and_commands() {
        let (link, feed) = MemoryLink::pair();
        let (producer, consumer) = mailbox_pair(8);
        let receiver = SensorReceiver::spawn(2, link, producer, POLL).unwrap();

        feed.line("HgyroP0.50,-1.00");
        feed.line("garbage");
        feed.line("HspeedPgo");
        wait_for(|| receiver.counts().commands == 1 && receiver.counts().discarded == 1);

        assert_eq!(consumer.drain(), vec![SensorSample::new(2, 0.5, -1.0)]);
        assert_eq!(consumer.take_command(), Some(SensorCommand::Boost));
        assert!(receiver.stop().is_some());
    }

    #[test]
    fn test_stop_returns_link_after_join() {
        let (link, feed) = MemoryLink::pair();
        let (producer, _consumer) = mailbox_pair(8);
        let receiver = SensorReceiver::spawn(1, link, producer, POLL).unwrap();
        assert!(receiver.is_running());

        let mut link = receiver.stop().unwrap();
        // Nothing reads the link any more.
        feed.line("HspeedPgo");
        thread::sleep(Duration::from_millis(10));
        assert_eq!(feed.unread(), 10);
        let mut buf = [0u8; 16];
        assert_eq!(link.read(&mut buf).unwrap(), 10);
    }

    struct BrokenLink;

    impl Read for BrokenLink {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    impl SerialLink for BrokenLink {
        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(1)
        }
    }

    #[test]
    fn test_io_errors_are_not_fatal() {
        let (producer, _consumer) = mailbox_pair(8);
        let receiver = SensorReceiver::spawn(3, BrokenLink, producer, POLL).unwrap();
        wait_for(|| receiver.counts().io_errors >= 3);
        assert!(receiver.is_running());
        drop(receiver);
    }
}
