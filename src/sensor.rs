//! Serial sensor input for LED-A-Gogo.
//!
//! Each connected player has a motion-sensing board on a serial link. A
//! background [`SensorReceiver`] reads its line protocol and fills the
//! player's [`SensorMailbox`]; the simulation drains the mailbox once per
//! tick without ever blocking. Outbound traffic is limited to LED counts,
//! written through a [`LedSink`].
//!
//! ```text
//! device ──bytes──▶ SensorReceiver ──samples/commands──▶ SensorMailbox
//!    ▲                                                       │
//!    └──── "<n>\n" ◀── LedSink ◀── ThresholdReached ◀── SessionState
//! ```

mod led;
mod link;
mod mailbox;
mod protocol;
mod receiver;

pub use led::{LedSink, SerialLed};
pub use link::{open_serial, MemoryFeed, MemoryLink, SerialLink, SerialPortLink};
pub use mailbox::{
    mailbox_pair, MailboxConsumer, MailboxProducer, SensorCommand, SensorMailbox, SensorSample,
};
pub use protocol::{
    led_command, parse_line, LineDecoder, ParseError, SensorMessage, BOOST_COMMAND,
    ORIENTATION_PREFIX,
};
pub use receiver::{ReceiverCounts, SensorReceiver};
