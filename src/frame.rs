/// Marks the presumed start of a frame inside the receive window
pub const SYNC_BYTE: u8 = 0x55;
/// Sync: 1, Type: 1, Payload: PAYLOAD_SIZE
pub const FRAME_SIZE: usize = 128 + 4;
/// Everything after the sync and type bytes
pub const PAYLOAD_SIZE: usize = FRAME_SIZE - 2;

/// A linear snapshot of the receive window taken when it synchronized.
///
/// Byte 0 is the oldest byte in the window (the sync byte) and the last
/// byte is the one whose arrival completed the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedFrame {
    bytes: [u8; FRAME_SIZE],
}

impl CompletedFrame {
    pub const fn from_bytes(bytes: [u8; FRAME_SIZE]) -> CompletedFrame {
        CompletedFrame { bytes }
    }

    pub const fn empty() -> CompletedFrame {
        CompletedFrame {
            bytes: [0; FRAME_SIZE],
        }
    }

    pub fn sync(&self) -> u8 {
        self.bytes[0]
    }

    /// Raw packet type byte, see [`crate::PacketType`]
    pub fn kind(&self) -> u8 {
        self.bytes[1]
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[2..]
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.bytes
    }

    /// Build a frame that will synchronize the detector: sync byte, type,
    /// the given payload (zero padded) and a last byte chosen so that the
    /// whole frame XORs to zero.
    ///
    /// The final payload byte is overwritten by the checksum, so at most
    /// `PAYLOAD_SIZE - 1` bytes of `payload` are used.
    pub fn encode_with(kind: u8, payload: &[u8]) -> CompletedFrame {
        let mut bytes = [0; FRAME_SIZE];
        bytes[0] = SYNC_BYTE;
        bytes[1] = kind;
        let len = payload.len().min(PAYLOAD_SIZE - 1);
        bytes[2..2 + len].copy_from_slice(&payload[..len]);
        let checksum = bytes[..FRAME_SIZE - 1].iter().fold(0, |acc, b| acc ^ b);
        bytes[FRAME_SIZE - 1] = checksum;
        CompletedFrame { bytes }
    }
}

impl Default for CompletedFrame {
    fn default() -> Self {
        Self::empty()
    }
}

impl AsRef<[u8]> for CompletedFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
