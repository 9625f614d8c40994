//! Background connection of sensor boards.
//!
//! The connector thread walks the configured ports in player order. Each
//! device that opens gets a fresh mailbox and a receiver thread, and the
//! whole bundle is sent to the simulation over a channel. Ports that fail
//! are retried after a back-off until the connector is stopped.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::config::SensorConfig;
use crate::error::SensorResult;
use crate::game::PlayerId;
use crate::sensor::{
    mailbox_pair, open_serial, LedSink, MailboxConsumer, SensorReceiver, SerialLed, SerialLink,
};

/// A freshly opened device: the input link and, when available, a writer
/// for its LED ladder.
pub struct OpenedLink {
    /// Inbound byte stream.
    pub link: Box<dyn SerialLink>,
    /// Outbound LED commands.
    pub led: Option<Box<dyn LedSink>>,
}

impl std::fmt::Debug for OpenedLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedLink")
            .field("has_led", &self.led.is_some())
            .finish_non_exhaustive()
    }
}

/// Opens the device configured for a player.
pub trait LinkOpener: Send + 'static {
    /// Open `port` on behalf of `player`.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Connect`](crate::SensorError::Connect) if the
    /// device cannot be opened.
    fn open(&mut self, player: PlayerId, port: &str) -> SensorResult<OpenedLink>;
}

impl<F> LinkOpener for F
where
    F: FnMut(PlayerId, &str) -> SensorResult<OpenedLink> + Send + 'static,
{
    fn open(&mut self, player: PlayerId, port: &str) -> SensorResult<OpenedLink> {
        self(player, port)
    }
}

/// Opens real serial devices.
#[derive(Debug, Clone, Copy)]
pub struct SerialOpener {
    baud_rate: u32,
    timeout: Duration,
}

impl SerialOpener {
    /// Use the link parameters from `config`.
    #[must_use]
    pub const fn new(config: &SensorConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            timeout: config.connect_timeout(),
        }
    }
}

impl LinkOpener for SerialOpener {
    fn open(&mut self, player: PlayerId, port: &str) -> SensorResult<OpenedLink> {
        let link = open_serial(port, self.baud_rate, self.timeout)?;
        let led = match link.try_clone_writer() {
            Ok(writer) => Some(Box::new(SerialLed::new(player, writer)) as Box<dyn LedSink>),
            Err(e) => {
                warn!(player, port, error = %e, "no LED output for this device");
                None
            }
        };
        Ok(OpenedLink {
            link: Box::new(link),
            led,
        })
    }
}

/// Everything the simulation needs to drive a newly connected player.
pub struct ConnectedPlayer {
    /// Player the device belongs to.
    pub player: PlayerId,
    /// Reading end of the player's mailbox.
    pub mailbox: MailboxConsumer,
    /// Receiver thread filling the mailbox.
    pub receiver: SensorReceiver<Box<dyn SerialLink>>,
    /// LED ladder writer, if the device supports one.
    pub led: Option<Box<dyn LedSink>>,
}

impl std::fmt::Debug for ConnectedPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectedPlayer")
            .field("player", &self.player)
            .field("has_led", &self.led.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle on the connector thread.
#[derive(Debug)]
pub struct PlayerConnector {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlayerConnector {
    /// Start connecting `ports` (player, device path) in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread.
    pub fn spawn<O: LinkOpener>(
        opener: O,
        ports: Vec<(PlayerId, String)>,
        config: &SensorConfig,
    ) -> io::Result<(Self, Receiver<ConnectedPlayer>)> {
        let (tx, rx) = channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let job = ConnectJob {
            opener,
            pending: ports,
            tx,
            stop: Arc::clone(&stop),
            capacity: config.buffer_capacity,
            poll_interval: config.poll_interval(),
            backoff: config.reconnect_backoff(),
        };
        let handle = thread::Builder::new()
            .name("sensor-connect".to_string())
            .spawn(move || job.run())?;

        Ok((
            Self {
                stop,
                handle: Some(handle),
            },
            rx,
        ))
    }

    /// Whether the thread is still trying ports.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop trying and wait for the thread to exit.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlayerConnector {
    fn drop(&mut self) {
        self.halt();
    }
}

struct ConnectJob<O> {
    opener: O,
    pending: Vec<(PlayerId, String)>,
    tx: Sender<ConnectedPlayer>,
    stop: Arc<AtomicBool>,
    capacity: usize,
    poll_interval: Duration,
    backoff: Duration,
}

impl<O: LinkOpener> ConnectJob<O> {
    fn run(mut self) {
        while !self.pending.is_empty() && !self.stopped() {
            let mut still_pending = Vec::with_capacity(self.pending.len());
            for (player, port) in std::mem::take(&mut self.pending) {
                if self.stopped() {
                    return;
                }
                match self.connect(player, &port) {
                    Ok(connected) => {
                        if self.tx.send(connected).is_err() {
                            debug!("session gone, connector exiting");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(player, port = %port, error = %e, "sensor connection failed");
                        still_pending.push((player, port));
                    }
                }
            }
            self.pending = still_pending;
            if !self.pending.is_empty() {
                self.sleep_backoff();
            }
        }
        debug!("connector finished");
    }

    fn connect(&mut self, player: PlayerId, port: &str) -> SensorResult<ConnectedPlayer> {
        let opened = self.opener.open(player, port)?;
        let (producer, mailbox) = mailbox_pair(self.capacity);
        let receiver = SensorReceiver::spawn(player, opened.link, producer, self.poll_interval)?;
        info!(player, port, "sensor connected");
        Ok(ConnectedPlayer {
            player,
            mailbox,
            receiver,
            led: opened.led,
        })
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Sleep in poll-sized slices so a stop request is noticed promptly.
    fn sleep_backoff(&self) {
        let deadline = Instant::now() + self.backoff;
        while !self.stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(self.poll_interval.max(Duration::from_millis(1))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use crate::sensor::MemoryLink;

    fn fast_config() -> SensorConfig {
        SensorConfig {
            poll_interval_ms: 1,
            reconnect_backoff_ms: 5,
            ..SensorConfig::default()
        }
    }

    #[test]
    fn test_connects_in_player_order() {
        let opener = |_player: PlayerId, _port: &str| -> SensorResult<OpenedLink> {
            let (link, _feed) = MemoryLink::pair();
            Ok(OpenedLink {
                link: Box::new(link),
                led: None,
            })
        };
        let ports = vec![(1, "a".to_string()), (3, "c".to_string())];
        let (connector, rx) = PlayerConnector::spawn(opener, ports, &fast_config()).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!((first.player, second.player), (1, 3));
        connector.stop();
        drop((first, second));
    }

    #[test]
    fn test_failed_port_is_retried() {
        let mut attempts = 0;
        let opener = move |player: PlayerId, port: &str| -> SensorResult<OpenedLink> {
            attempts += 1;
            if attempts < 3 {
                return Err(SensorError::Connect {
                    port: port.to_string(),
                    reason: format!("attempt {attempts} for player {player}"),
                });
            }
            let (link, _feed) = MemoryLink::pair();
            Ok(OpenedLink {
                link: Box::new(link),
                led: None,
            })
        };
        let (connector, rx) =
            PlayerConnector::spawn(opener, vec![(2, "b".to_string())], &fast_config()).unwrap();
        let connected = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(connected.player, 2);
        connector.stop();
    }

    #[test]
    fn test_stop_interrupts_retries() {
        let opener = |_player: PlayerId, port: &str| -> SensorResult<OpenedLink> {
            Err(SensorError::Connect {
                port: port.to_string(),
                reason: "absent".to_string(),
            })
        };
        let config = SensorConfig {
            reconnect_backoff_ms: 60_000,
            ..fast_config()
        };
        let (connector, rx) =
            PlayerConnector::spawn(opener, vec![(1, "x".to_string())], &config).unwrap();
        let begin = Instant::now();
        connector.stop();
        assert!(begin.elapsed() < Duration::from_secs(5));
        assert!(rx.try_recv().is_err());
    }
}
