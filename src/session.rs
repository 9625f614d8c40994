//! Real-time session driver.
//!
//! [`Session`] owns the [`SessionState`] plus everything with a thread or a
//! device behind it: the connector, each player's receiver and LED writer.
//! All game state is mutated on the thread calling [`Session::advance`].

mod clock;
mod connect;

pub use clock::SimulationClock;
pub use connect::{ConnectedPlayer, LinkOpener, OpenedLink, PlayerConnector, SerialOpener};

use std::io;
use std::ops::ControlFlow;

use crossbeam::channel::{Receiver, TryRecvError};
use tracing::{debug, info, warn};

use crate::config::{GameConfig, SensorConfig};
use crate::game::{assert_invariants, GameEvent, PlayerId, SessionState};
use crate::sensor::{LedSink, ReceiverCounts, SensorReceiver, SerialLink};

/// A connected sensor board.
struct Device {
    player: PlayerId,
    receiver: SensorReceiver<Box<dyn SerialLink>>,
    led: Option<Box<dyn LedSink>>,
}

/// Per-device traffic at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceReport {
    /// Player the device belonged to.
    pub player: PlayerId,
    /// Receiver counters.
    pub counts: ReceiverCounts,
}

/// Drives one session in real time.
pub struct Session {
    state: SessionState,
    connector: Option<PlayerConnector>,
    arrivals: Option<Receiver<ConnectedPlayer>>,
    devices: Vec<Device>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("devices", &self.devices.len())
            .field("connecting", &self.connector.is_some())
            .finish()
    }
}

impl Session {
    /// Wrap a fresh state with no devices.
    #[must_use]
    pub fn new(state: SessionState) -> Self {
        Self {
            state,
            connector: None,
            arrivals: None,
            devices: Vec::new(),
        }
    }

    /// Build the state from a validated config.
    #[must_use]
    pub fn from_config(config: &GameConfig, seed: u64) -> Self {
        Self::new(SessionState::new(config, seed))
    }

    /// Game state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Mutable game state, for keyboard input.
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Players with an attached sensor.
    pub fn connected_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.devices.iter().map(|d| d.player)
    }

    /// Start connecting every port configured in `config`.
    ///
    /// Does nothing when no port is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the connector thread cannot be created.
    #[allow(clippy::cast_possible_truncation)]
    pub fn start_connector<O: LinkOpener>(&mut self, opener: O, config: &SensorConfig) -> io::Result<()> {
        let ports: Vec<(PlayerId, String)> = config
            .ports
            .iter()
            .enumerate()
            .filter_map(|(idx, port)| port.clone().map(|p| (idx as PlayerId + 1, p)))
            .collect();
        if ports.is_empty() {
            return Ok(());
        }
        info!(count = ports.len(), "connecting sensors");
        let (connector, arrivals) = PlayerConnector::spawn(opener, ports, config)?;
        self.connector = Some(connector);
        self.arrivals = Some(arrivals);
        Ok(())
    }

    /// Take over a connected device.
    pub fn attach(&mut self, connected: ConnectedPlayer) -> Option<GameEvent> {
        let ConnectedPlayer {
            player,
            mailbox,
            receiver,
            mut led,
        } = connected;
        let event = self.state.attach_sensor(player, mailbox)?;

        // Show the player's current ladder on the new device.
        if let (Some(sink), Some(p)) = (led.as_mut(), self.state.player(player)) {
            if let Err(e) = sink.set_leds(p.active_leds) {
                warn!(player, error = %e, "initial LED update failed");
            }
        }
        self.devices.push(Device {
            player,
            receiver,
            led,
        });
        Some(event)
    }

    /// Run one tick stamped with `elapsed` seconds.
    ///
    /// Newly connected devices are attached first. Threshold events are
    /// forwarded to the player's LED writer; write failures are logged and
    /// otherwise ignored. Debug builds check the session invariants after
    /// every tick.
    pub fn advance(&mut self, elapsed: u32) -> Vec<GameEvent> {
        let mut events = self.poll_arrivals();
        events.extend(self.state.tick(elapsed));
        assert_invariants(&self.state);
        self.drive_leds(&events);
        events
    }

    /// End the session early.
    pub fn stop(&mut self) -> Option<GameEvent> {
        self.state.stop()
    }

    /// Tick at the clock's rate until the session ends or `on_tick` breaks.
    ///
    /// `on_tick` sees every tick, including the one that ended the session.
    pub fn run<F>(&mut self, clock: &mut SimulationClock, mut on_tick: F)
    where
        F: FnMut(&mut SessionState, &[GameEvent]) -> ControlFlow<()>,
    {
        while !self.state.is_over() {
            let elapsed = clock.wait_tick();
            let events = self.advance(elapsed);
            if on_tick(&mut self.state, &events).is_break() {
                if let Some(end) = self.stop() {
                    let _ = on_tick(&mut self.state, &[end]);
                }
                break;
            }
        }
    }

    fn poll_arrivals(&mut self) -> Vec<GameEvent> {
        let mut pending = Vec::new();
        let mut finished = false;
        if let Some(arrivals) = &self.arrivals {
            loop {
                match arrivals.try_recv() {
                    Ok(connected) => pending.push(connected),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        finished = true;
                        break;
                    }
                }
            }
        }
        if finished {
            debug!("connector done");
            self.arrivals = None;
        }
        pending.into_iter().filter_map(|c| self.attach(c)).collect()
    }

    fn drive_leds(&mut self, events: &[GameEvent]) {
        for event in events {
            let GameEvent::ThresholdReached { player, led } = *event else {
                continue;
            };
            let Some(sink) = self
                .devices
                .iter_mut()
                .find(|d| d.player == player)
                .and_then(|d| d.led.as_mut())
            else {
                continue;
            };
            if let Err(e) = sink.set_leds(led) {
                warn!(player, error = %e, "LED update failed");
            }
        }
    }

    /// Switch every LED ladder off, stop all threads and release the devices.
    ///
    /// LEDs are cleared first, then each receiver is joined before its link
    /// is dropped.
    pub fn shutdown(mut self) -> (SessionState, Vec<DeviceReport>) {
        if let Some(connector) = self.connector.take() {
            connector.stop();
        }
        self.arrivals = None;

        let mut reports = Vec::with_capacity(self.devices.len());
        for mut device in self.devices.drain(..) {
            if let Some(sink) = device.led.as_mut() {
                if let Err(e) = sink.set_leds(0) {
                    warn!(player = device.player, error = %e, "failed to clear LEDs");
                }
            }
            let counts = device.receiver.counts();
            drop(device.receiver.stop());
            reports.push(DeviceReport {
                player: device.player,
                counts,
            });
        }
        info!(devices = reports.len(), "session shut down");
        (self.state, reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorResult;
    use crate::game::{Direction, EndReason, PowerUpState};
    use crate::sensor::{mailbox_pair, MemoryFeed, MemoryLink, SerialLed};
    use std::io::Write;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::{Duration, Instant};

    #[derive(Clone, Default)]
    struct SharedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedLog {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn device(player: PlayerId, log: &SharedLog) -> (ConnectedPlayer, MemoryFeed) {
        let (link, feed) = MemoryLink::pair();
        let (producer, mailbox) = mailbox_pair(8);
        let receiver =
            SensorReceiver::spawn(player, Box::new(link) as Box<dyn SerialLink>, producer, Duration::from_millis(1))
                .unwrap();
        let connected = ConnectedPlayer {
            player,
            mailbox,
            receiver,
            led: Some(Box::new(SerialLed::new(player, log.clone()))),
        };
        (connected, feed)
    }

    fn tick_until(session: &mut Session, elapsed: u32, mut done: impl FnMut(&Session) -> bool) -> Vec<GameEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while !done(session) {
            assert!(Instant::now() < deadline, "timed out");
            events.extend(session.advance(elapsed));
            std::thread::sleep(Duration::from_millis(1));
        }
        events
    }

    #[test]
    fn test_sensor_moves_player() {
        let log = SharedLog::default();
        let mut session = Session::from_config(&GameConfig::default(), 1);
        let (connected, feed) = device(1, &log);
        assert_eq!(session.attach(connected), Some(GameEvent::SensorAttached { player: 1 }));
        assert_eq!(log.text(), "0\n");

        let start = session.state().player(1).unwrap().position();
        // Tilt right: +7.5 px per sample.
        feed.line("HgyroP1.0,0.0");
        tick_until(&mut session, 0, |s| s.state().player(1).unwrap().position() != start);
        let (x, y) = session.state().player(1).unwrap().position();
        assert!((x - start.0 - 7.5).abs() < f32::EPSILON);
        assert!((y - start.1).abs() < f32::EPSILON);
        assert_eq!(session.state().player(1).unwrap().direction, Direction::Right);

        let (_, reports) = session.shutdown();
        assert_eq!(reports[0].counts.samples, 1);
        assert_eq!(log.text(), "0\n0\n");
    }

    #[test]
    fn test_sensor_boost_after_collecting() {
        let log = SharedLog::default();
        let mut session = Session::from_config(&GameConfig::default(), 1);
        let (connected, feed) = device(2, &log);
        session.attach(connected);
        session.state_mut().player_mut(2).unwrap().power = PowerUpState::Held { since: 0 };

        feed.line("HspeedPgo");
        let events = tick_until(&mut session, 1, |s| s.state().player(2).unwrap().is_boosted());
        assert!(events.contains(&GameEvent::BoostActivated { player: 2 }));
        drop(session.shutdown());
    }

    #[test]
    fn test_thresholds_drive_leds() {
        let log = SharedLog::default();
        let mut config = GameConfig::default();
        config.scoring.thresholds = [1, 2, 3, 4, 5, 6, 7, 8];
        config.movement.key_speed = 24.0;
        let mut session = Session::from_config(&config, 1);
        let (connected, _feed) = device(1, &log);
        session.attach(connected);
        session.state_mut().set_keyboard(1);

        let route = [
            Direction::Right,
            Direction::Right,
            Direction::Down,
            Direction::Down,
            Direction::Left,
            Direction::Left,
            Direction::Up,
        ];
        session.advance(0);
        let mut events = Vec::new();
        for direction in route {
            session.state_mut().keyboard_mut(1).unwrap().press(direction);
            events.extend(session.advance(0));
        }
        // 9 points reach the cap of 8: every LED lights and the session ends.
        assert!(events.contains(&GameEvent::SessionEnded {
            reason: EndReason::MaxScore,
            winner: Some(1),
        }));
        assert_eq!(log.text(), "0\n1\n2\n3\n4\n5\n6\n7\n8\n");
        drop(session.shutdown());
        assert!(log.text().ends_with("8\n0\n"));
    }

    #[test]
    fn test_connector_attaches_devices() {
        let mut config = GameConfig::default();
        config.sensor.ports[2] = Some("mem".to_string());
        config.sensor.poll_interval_ms = 1;
        let opener = |_player: PlayerId, _port: &str| -> SensorResult<OpenedLink> {
            let (link, _feed) = MemoryLink::pair();
            Ok(OpenedLink {
                link: Box::new(link),
                led: None,
            })
        };
        let mut session = Session::from_config(&config, 1);
        session.start_connector(opener, &config.sensor).unwrap();
        let events = tick_until(&mut session, 0, |s| s.connected_players().count() == 1);
        assert!(events.contains(&GameEvent::SensorAttached { player: 3 }));
        let (state, reports) = session.shutdown();
        assert!(state.player(3).unwrap().has_sensor());
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_run_stops_on_break() {
        let mut config = GameConfig::default();
        config.timing.tick_rate = 1000;
        let mut session = Session::from_config(&config, 1);
        let mut clock = SimulationClock::start(config.timing.tick_interval());
        let mut seen = 0;
        let mut ended = None;
        session.run(&mut clock, |_, events| {
            seen += 1;
            for e in events {
                if let GameEvent::SessionEnded { reason, .. } = e {
                    ended = Some(*reason);
                }
            }
            if seen == 5 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        });
        assert_eq!(ended, Some(EndReason::Stopped));
        assert!(session.state().is_over());
    }
}
