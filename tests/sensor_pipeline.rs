//! End-to-end tests for the sensor pipeline over in-memory links.
//!
//! Bytes go in through a `MemoryFeed`, through a receiver thread and a
//! mailbox, and come out as player movement and LED commands.
//!
//! Run with: cargo test --release sensor_pipeline

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::thread;
use std::time::{Duration, Instant};

use ledagogo::game::{GameEvent, PowerUpState};
use ledagogo::sensor::{mailbox_pair, MemoryLink, SensorCommand, SensorReceiver, SensorSample, SerialLink};
use ledagogo::session::{ConnectedPlayer, OpenedLink};
use ledagogo::{GameConfig, PlayerId, SensorError, SensorResult, Session};

const POLL: Duration = Duration::from_millis(1);

fn wait_for(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_fragmented_lines_are_reassembled() {
    let (link, feed) = MemoryLink::pair();
    let (producer, mailbox) = mailbox_pair(8);
    let receiver = SensorReceiver::spawn(1, link, producer, POLL).unwrap();

    feed.push(b"Hgy");
    thread::sleep(Duration::from_millis(5));
    feed.push(b"roP0.25,");
    thread::sleep(Duration::from_millis(5));
    feed.push(b"0.75\r\nHspe");
    feed.push(b"edPgo\n");

    wait_for(|| receiver.counts().commands == 1);
    assert_eq!(mailbox.drain(), vec![SensorSample::new(1, 0.25, 0.75)]);
    assert_eq!(mailbox.take_command(), Some(SensorCommand::Boost));
    assert_eq!(receiver.counts().discarded, 0);
    drop(receiver);
}

#[test]
fn test_flood_keeps_newest_samples() {
    let (link, feed) = MemoryLink::pair();
    let (producer, mailbox) = mailbox_pair(4);
    let receiver = SensorReceiver::spawn(2, link, producer, POLL).unwrap();

    for i in 0..20u16 {
        feed.line(&format!("HgyroP{i}.0,0.0"));
        if i % 3 == 0 {
            feed.line("HgyroP1,2");
        }
    }
    wait_for(|| receiver.counts().samples == 20);

    assert!(receiver.stop().is_some());

    let kept: Vec<f32> = mailbox.drain().iter().map(|s| s.x).collect();
    assert_eq!(kept, vec![16.0, 17.0, 18.0, 19.0]);
}

#[test]
fn test_counts_track_every_line() {
    let (link, feed) = MemoryLink::pair();
    let (producer, _mailbox) = mailbox_pair(2);
    let receiver = SensorReceiver::spawn(3, link, producer, POLL).unwrap();

    feed.line("HgyroP0.1,0.1");
    feed.line("HgyroP0.2,0.2");
    feed.line("HgyroP0.3,0.3");
    feed.line("HgyroPx,y");
    feed.line("hello");
    feed.line("HspeedPgo");
    feed.line("HspeedPgo");

    wait_for(|| receiver.counts().commands == 2);
    let counts = receiver.counts();
    assert_eq!(counts.samples, 3);
    assert_eq!(counts.evicted, 1);
    assert_eq!(counts.discarded, 2);
    assert_eq!(counts.io_errors, 0);
    drop(receiver);
}

fn memory_device(player: PlayerId) -> (ConnectedPlayer, ledagogo::sensor::MemoryFeed) {
    let (link, feed) = MemoryLink::pair();
    let (producer, mailbox) = mailbox_pair(16);
    let receiver = SensorReceiver::spawn(player, Box::new(link) as Box<dyn SerialLink>, producer, POLL).unwrap();
    (
        ConnectedPlayer {
            player,
            mailbox,
            receiver,
            led: None,
        },
        feed,
    )
}

#[test]
fn test_tilting_steers_only_the_owner() {
    let mut session = Session::from_config(&GameConfig::default(), 3);
    let (connected, feed) = memory_device(4);
    session.attach(connected);
    let others: Vec<(f32, f32)> = (1..=3).map(|id| session.state().player(id).unwrap().position()).collect();
    let start = session.state().player(4).unwrap().position();

    // Sensor y is inverted: a positive reading moves the token up.
    feed.line("HgyroP0.0,1.0");
    wait_for(|| {
        session.advance(0);
        session.state().player(4).unwrap().position() != start
    });
    let (x, y) = session.state().player(4).unwrap().position();
    assert!((x - start.0).abs() < f32::EPSILON);
    assert!((y - (start.1 - 7.5)).abs() < f32::EPSILON);

    let after: Vec<(f32, f32)> = (1..=3).map(|id| session.state().player(id).unwrap().position()).collect();
    assert_eq!(others, after);
    drop(session.shutdown());
}

#[test]
fn test_boost_command_waits_for_a_held_power_up() {
    let mut session = Session::from_config(&GameConfig::default(), 3);
    let (connected, feed) = memory_device(1);
    session.attach(connected);

    // The command sits in the slot while nothing is held.
    feed.line("HspeedPgo");
    thread::sleep(Duration::from_millis(20));
    let events = session.advance(1);
    assert!(!events.contains(&GameEvent::BoostActivated { player: 1 }));

    session.state_mut().player_mut(1).unwrap().power = PowerUpState::Held { since: 1 };
    let mut activated = false;
    wait_for(|| {
        activated |= session.advance(2).contains(&GameEvent::BoostActivated { player: 1 });
        activated
    });
    assert!(session.state().player(1).unwrap().is_boosted());
    drop(session.shutdown());
}

#[test]
fn test_failing_port_does_not_block_others() {
    let mut config = GameConfig::default();
    config.sensor.ports = [Some("a".into()), Some("missing".into()), None, None];
    config.sensor.poll_interval_ms = 1;
    config.sensor.reconnect_backoff_ms = 2;

    let opener = |_player: PlayerId, port: &str| -> SensorResult<OpenedLink> {
        if port == "missing" {
            return Err(SensorError::Connect {
                port: port.to_string(),
                reason: "no such device".to_string(),
            });
        }
        let (link, _feed) = MemoryLink::pair();
        Ok(OpenedLink {
            link: Box::new(link),
            led: None,
        })
    };

    let mut session = Session::from_config(&config, 1);
    session.start_connector(opener, &config.sensor).unwrap();
    wait_for(|| {
        session.advance(0);
        session.connected_players().count() == 1
    });
    let (state, reports) = session.shutdown();
    assert!(state.player(1).unwrap().has_sensor());
    assert!(!state.player(2).unwrap().has_sensor());
    assert_eq!(reports.len(), 1);
}
