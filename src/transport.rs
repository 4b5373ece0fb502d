use crc::Crc;
use embedded_hal::digital::OutputPin;
use embedded_io::Write;
use log::{trace, warn};

use crate::Bytes;
use crate::message::{MESSAGE_CHECKSUM_OFFSET, Message};

/// The outbound one-way link.
///
/// Sending is fire and forget: there is no acknowledgment and nothing for
/// the relay to do about a failed send.
pub trait Transport {
    /// Integrity byte for `msg`, to be stored in `msg.checksum`
    fn checksum(&self, msg: &Message) -> u8;

    fn send(&mut self, msg: &Message);
}

/// Status lines the relay drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Follows the toggle command
    Status,
    /// Pulsed around relayed messages
    Activity,
}

/// Purely cosmetic feedback, nothing reads it back.
pub trait Indicator {
    fn set(&mut self, line: Line, on: bool);
}

/// Writes each message as its raw record to an [`embedded_io::Write`].
#[derive(Debug)]
pub struct SerialTransport<W: Write> {
    tx: W,
}

impl<W: Write> SerialTransport<W> {
    pub fn new(tx: W) -> SerialTransport<W> {
        SerialTransport { tx }
    }

    pub fn into_inner(self) -> W {
        self.tx
    }

    pub fn inner(&self) -> &W {
        &self.tx
    }
}

impl<W: Write> Transport for SerialTransport<W> {
    /// CRC-8/MAXIM over data and kind
    fn checksum(&self, msg: &Message) -> u8 {
        let c = Crc::<u8>::new(&crc::CRC_8_MAXIM_DOW);
        let mut d = c.digest();
        d.update(&msg.bytes()[..MESSAGE_CHECKSUM_OFFSET]);
        d.finalize()
    }

    fn send(&mut self, msg: &Message) {
        trace!("send kind {:#04x} crc {:#04x}", msg.kind, msg.checksum);
        if let Err(e) = self.tx.write_all(&msg.bytes()) {
            warn!("transport write failed: {:?}", e);
        }
    }
}

/// Two output pins as the status and activity lines.
///
/// Pin errors are dropped.
#[derive(Debug)]
pub struct PinIndicator<S: OutputPin, A: OutputPin> {
    status: S,
    activity: A,
}

impl<S: OutputPin, A: OutputPin> PinIndicator<S, A> {
    pub fn new(status: S, activity: A) -> PinIndicator<S, A> {
        PinIndicator { status, activity }
    }

    pub fn release(self) -> (S, A) {
        (self.status, self.activity)
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool) {
    let _ = if on { pin.set_high() } else { pin.set_low() };
}

impl<S: OutputPin, A: OutputPin> Indicator for PinIndicator<S, A> {
    fn set(&mut self, line: Line, on: bool) {
        match line {
            Line::Status => drive(&mut self.status, on),
            Line::Activity => drive(&mut self.activity, on),
        }
    }
}
