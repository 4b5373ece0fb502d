use crate::{Bytes, Decode, Encode};

/// Payload bytes carried by every message
pub const MESSAGE_DATA_SIZE: usize = 9;
/// Data: MESSAGE_DATA_SIZE, Kind: 1, Checksum: 1
pub const MESSAGE_SIZE: usize = MESSAGE_DATA_SIZE + 2;
/// Everything the checksum covers
pub const MESSAGE_CHECKSUM_OFFSET: usize = MESSAGE_SIZE - 1;

/// Type tag of an outbound message.
///
/// The low values are ordinary traffic, 0x80 and up are addressed to the
/// receivers' bootloader and system handlers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Normal = 0x00,
    Gps = 0x01,
    Boot = 0x80,
    BootPageWrite = 0x81,
    BootPageSize = 0x82,
    Reset = 0x83,
    Sleep = 0x84,
    Wakeup = 0x85,
    Charge = 0x86,
    Voltage = 0x87,
    Run = 0x88,
    ReadUid = 0x89,
    Calibrate = 0x90,
}

impl TryFrom<u8> for MessageKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use MessageKind::*;
        Ok(match value {
            0x00 => Normal,
            0x01 => Gps,
            0x80 => Boot,
            0x81 => BootPageWrite,
            0x82 => BootPageSize,
            0x83 => Reset,
            0x84 => Sleep,
            0x85 => Wakeup,
            0x86 => Charge,
            0x87 => Voltage,
            0x88 => Run,
            0x89 => ReadUid,
            0x90 => Calibrate,
            x => return Err(x),
        })
    }
}

/// The fixed size record sent over the outbound link.
///
/// `kind` stays a raw byte so that raw passthrough can forward tags this
/// side doesn't know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Message {
    pub data: [u8; MESSAGE_DATA_SIZE],
    pub kind: u8,
    pub checksum: u8,
}

impl Message {
    pub fn new(kind: MessageKind, data: [u8; MESSAGE_DATA_SIZE]) -> Message {
        Message {
            data,
            kind: kind as u8,
            checksum: 0,
        }
    }

    /// Bootloader page write: address, word offset, then three 16 bit
    /// words as they were laid out in the frame.
    pub fn boot_page_write(page_address: u8, word_offset: u8, words: &[u8; 6]) -> Message {
        let mut data = [0; MESSAGE_DATA_SIZE];
        data[0] = page_address;
        data[1] = word_offset;
        data[2..8].copy_from_slice(words);
        Message::new(MessageKind::BootPageWrite, data)
    }

    /// One position fix fragment, first byte is the receiver id
    pub fn gps(fragment: &[u8; 7]) -> Message {
        let mut data = [0; MESSAGE_DATA_SIZE];
        data[..7].copy_from_slice(fragment);
        Message::new(MessageKind::Gps, data)
    }

    /// Fill data and kind from `raw`, leaving the checksum alone
    pub fn from_unchecked(raw: &[u8; MESSAGE_CHECKSUM_OFFSET]) -> Message {
        let mut data = [0; MESSAGE_DATA_SIZE];
        data.copy_from_slice(&raw[..MESSAGE_DATA_SIZE]);
        Message {
            data,
            kind: raw[MESSAGE_DATA_SIZE],
            checksum: 0,
        }
    }

    pub fn known_kind(&self) -> Option<MessageKind> {
        MessageKind::try_from(self.kind).ok()
    }
}

impl Bytes<[u8; MESSAGE_SIZE]> for Message {
    fn bytes(&self) -> [u8; MESSAGE_SIZE] {
        let mut out = [0; MESSAGE_SIZE];
        out[..MESSAGE_DATA_SIZE].copy_from_slice(&self.data);
        out[MESSAGE_DATA_SIZE] = self.kind;
        out[MESSAGE_CHECKSUM_OFFSET] = self.checksum;
        out
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MessageError {
    EncodeBufferTooSmall {
        expected: usize,
        found: usize,
    },
    DecodeBufferTooSmall {
        expected_at_least: usize,
        found: usize,
    },
}

impl Encode for Message {
    type Error = MessageError;

    fn encode(&self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        if buffer.len() < MESSAGE_SIZE {
            return Err(MessageError::EncodeBufferTooSmall {
                expected: MESSAGE_SIZE,
                found: buffer.len(),
            });
        }
        buffer[..MESSAGE_SIZE].copy_from_slice(&self.bytes());
        Ok(())
    }
}

impl<'a> Decode<'a> for Message {
    type Error = MessageError;

    /// Takes the record verbatim, checksum included
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        if data.len() < MESSAGE_SIZE {
            return Err(MessageError::DecodeBufferTooSmall {
                expected_at_least: MESSAGE_SIZE,
                found: data.len(),
            });
        }
        let mut m = Message::default();
        m.data.copy_from_slice(&data[..MESSAGE_DATA_SIZE]);
        m.kind = data[MESSAGE_DATA_SIZE];
        m.checksum = data[MESSAGE_CHECKSUM_OFFSET];
        Ok(m)
    }
}
