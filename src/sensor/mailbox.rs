//! Lock-free handoff between a receiver thread and the simulation.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use crossbeam::queue::ArrayQueue;

use crate::game::PlayerId;

/// One orientation reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Player the reading belongs to.
    pub player: PlayerId,
    /// Reading along the sensor's x axis.
    pub x: f32,
    /// Reading along the sensor's y axis.
    pub y: f32,
}

impl SensorSample {
    /// Create a new sample.
    #[must_use]
    pub const fn new(player: PlayerId, x: f32, y: f32) -> Self {
        Self { player, x, y }
    }
}

/// A discrete command from a sensor board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCommand {
    /// Trigger a held power-up.
    Boost,
}

/// Bounded orientation buffer plus a single overwritable command slot.
///
/// Pushing into a full buffer evicts the oldest sample; nothing ever blocks.
/// The command slot keeps only the newest unconsumed command.
#[derive(Debug)]
pub struct SensorMailbox {
    samples: ArrayQueue<SensorSample>,
    command: AtomicCell<Option<SensorCommand>>,
}

impl SensorMailbox {
    /// Create a mailbox holding at most `capacity` samples (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: ArrayQueue::new(capacity.max(1)),
            command: AtomicCell::new(None),
        }
    }

    /// Append a sample, returning the one evicted to make room, if any.
    pub fn push(&self, sample: SensorSample) -> Option<SensorSample> {
        self.samples.force_push(sample)
    }

    /// Remove the oldest sample.
    pub fn pop_oldest(&self) -> Option<SensorSample> {
        self.samples.pop()
    }

    /// Remove every buffered sample, oldest first.
    pub fn drain(&self) -> Vec<SensorSample> {
        std::iter::from_fn(|| self.samples.pop()).collect()
    }

    /// Drain the buffer and keep only the newest sample.
    pub fn latest(&self) -> Option<SensorSample> {
        std::iter::from_fn(|| self.samples.pop()).last()
    }

    /// Samples currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of buffered samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Overwrite the command slot.
    pub fn set_command(&self, command: SensorCommand) {
        self.command.store(Some(command));
    }

    /// Read and clear the command slot.
    pub fn take_command(&self) -> Option<SensorCommand> {
        self.command.take()
    }
}

/// Writing end of a player's mailbox, owned by the receiver thread.
#[derive(Debug)]
pub struct MailboxProducer(Arc<SensorMailbox>);

/// Reading end of a player's mailbox, owned by the simulation.
#[derive(Debug)]
pub struct MailboxConsumer(Arc<SensorMailbox>);

/// Create the two endpoints of a new mailbox.
#[must_use]
pub fn mailbox_pair(capacity: usize) -> (MailboxProducer, MailboxConsumer) {
    let shared = Arc::new(SensorMailbox::new(capacity));
    (MailboxProducer(Arc::clone(&shared)), MailboxConsumer(shared))
}

impl MailboxProducer {
    /// See [`SensorMailbox::push`].
    pub fn push(&self, sample: SensorSample) -> Option<SensorSample> {
        self.0.push(sample)
    }

    /// See [`SensorMailbox::set_command`].
    pub fn set_command(&self, command: SensorCommand) {
        self.0.set_command(command);
    }
}

impl MailboxConsumer {
    /// See [`SensorMailbox::pop_oldest`].
    pub fn pop_oldest(&self) -> Option<SensorSample> {
        self.0.pop_oldest()
    }

    /// See [`SensorMailbox::drain`].
    pub fn drain(&self) -> Vec<SensorSample> {
        self.0.drain()
    }

    /// See [`SensorMailbox::latest`].
    pub fn latest(&self) -> Option<SensorSample> {
        self.0.latest()
    }

    /// See [`SensorMailbox::take_command`].
    pub fn take_command(&self) -> Option<SensorCommand> {
        self.0.take_command()
    }

    /// Samples currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no samples are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
