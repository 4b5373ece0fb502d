use bilge::prelude::*;

use crate::Decode;
use crate::frame::{CompletedFrame, FRAME_SIZE, PAYLOAD_SIZE};
use crate::message::{MESSAGE_CHECKSUM_OFFSET, MESSAGE_SIZE, Message};

/// Bytes of page data following the page address
pub const BOOT_PAGE_DATA_SIZE: usize = PAYLOAD_SIZE - 1;
/// Three 16 bit words per boot message
pub const BOOT_WORD_GROUP_SIZE: usize = 6;
/// Largest page a frame can carry, in whole word groups
pub const MAX_BOOT_PAGE_SIZE: usize = BOOT_PAGE_DATA_SIZE.div_ceil(BOOT_WORD_GROUP_SIZE) * BOOT_WORD_GROUP_SIZE;
pub const GPS_FRAGMENT_SIZE: usize = 7;
pub const MAX_GPS_FRAGMENTS: usize = PAYLOAD_SIZE / GPS_FRAGMENT_SIZE;

/// Byte 1 of a frame
#[bitsize(8)]
#[derive(Debug, Clone, Copy, PartialEq, FromBits)]
pub enum PacketType {
    Stop = 0,
    ToggleIndicator = 1,
    RelayMessage = 2,
    RelayRawMessage = 3,
    RelayBootPage = 4,
    RelayGpsFrames = 5,
    #[fallback]
    Unknown = 0xFF,
}

/// A bootloader page as carried by a frame: the page address and the page
/// contents right behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootPage {
    pub address: u8,
    data: [u8; BOOT_PAGE_DATA_SIZE],
}

impl BootPage {
    pub fn new(address: u8, contents: &[u8]) -> BootPage {
        let mut data = [0; BOOT_PAGE_DATA_SIZE];
        let len = contents.len().min(BOOT_PAGE_DATA_SIZE);
        data[..len].copy_from_slice(&contents[..len]);
        BootPage { address, data }
    }

    /// Word groups covering `page_size` bytes, as (word offset, bytes).
    ///
    /// Groups are 6 bytes apart, the offset counts 16 bit words. A group
    /// running past the end of the frame is zero filled. `page_size` is
    /// capped at [`MAX_BOOT_PAGE_SIZE`].
    pub fn word_groups(&self, page_size: usize) -> impl Iterator<Item = (u8, [u8; 6])> + '_ {
        (0..page_size.min(MAX_BOOT_PAGE_SIZE))
            .step_by(BOOT_WORD_GROUP_SIZE)
            .map(move |i| {
                let mut words = [0; BOOT_WORD_GROUP_SIZE];
                if i < BOOT_PAGE_DATA_SIZE {
                    let end = (i + BOOT_WORD_GROUP_SIZE).min(BOOT_PAGE_DATA_SIZE);
                    words[..end - i].copy_from_slice(&self.data[i..end]);
                }
                ((i / 2) as u8, words)
            })
    }
}

/// Seven bytes of position fix, the first one being the target id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsFragment(pub [u8; GPS_FRAGMENT_SIZE]);

impl GpsFragment {
    pub fn id(&self) -> u8 {
        self.0[0]
    }
}

/// What a frame asks the dispatcher to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Noop,
    ToggleIndicator,
    /// Checksum still to be computed by the transport
    RelayMessage(Message),
    /// Forwarded as is, checksum included
    RelayRawMessage(Message),
    RelayBootPage(BootPage),
    /// Fragments before the first zero id
    RelayGpsFrames(heapless::Vec<GpsFragment, MAX_GPS_FRAGMENTS>),
}

impl Command {
    pub fn from_frame(frame: &CompletedFrame) -> Result<Command, DecodeError> {
        Command::decode(frame.as_bytes())
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Command::Noop => PacketType::Stop,
            Command::ToggleIndicator => PacketType::ToggleIndicator,
            Command::RelayMessage(_) => PacketType::RelayMessage,
            Command::RelayRawMessage(_) => PacketType::RelayRawMessage,
            Command::RelayBootPage(_) => PacketType::RelayBootPage,
            Command::RelayGpsFrames(_) => PacketType::RelayGpsFrames,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    FrameTooShort { expected: usize, found: usize },
    UnknownPacketType(u8),
}

impl<'a> Decode<'a> for Command {
    type Error = DecodeError;

    /// `data` is a whole frame, sync byte first
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        if data.len() < FRAME_SIZE {
            return Err(DecodeError::FrameTooShort {
                expected: FRAME_SIZE,
                found: data.len(),
            });
        }
        let payload = &data[2..FRAME_SIZE];
        let command = match PacketType::from(data[1]) {
            PacketType::Stop => Command::Noop,
            PacketType::ToggleIndicator => Command::ToggleIndicator,
            PacketType::RelayMessage => {
                let mut raw = [0; MESSAGE_CHECKSUM_OFFSET];
                raw.copy_from_slice(&payload[..MESSAGE_CHECKSUM_OFFSET]);
                Command::RelayMessage(Message::from_unchecked(&raw))
            }
            PacketType::RelayRawMessage => {
                // payload is always longer than a message
                let m = Message::decode(&payload[..MESSAGE_SIZE]).map_err(|_| {
                    DecodeError::FrameTooShort {
                        expected: FRAME_SIZE,
                        found: data.len(),
                    }
                })?;
                Command::RelayRawMessage(m)
            }
            PacketType::RelayBootPage => {
                Command::RelayBootPage(BootPage::new(payload[0], &payload[1..]))
            }
            PacketType::RelayGpsFrames => {
                let mut fragments = heapless::Vec::new();
                for chunk in payload.chunks_exact(GPS_FRAGMENT_SIZE) {
                    let mut f = [0; GPS_FRAGMENT_SIZE];
                    f.copy_from_slice(chunk);
                    let fragment = GpsFragment(f);
                    if fragment.id() == 0 {
                        break;
                    }
                    // capacity is exactly the number of chunks
                    let _ = fragments.push(fragment);
                }
                Command::RelayGpsFrames(fragments)
            }
            PacketType::Unknown => return Err(DecodeError::UnknownPacketType(data[1])),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    #[test]
    fn packet_type_from_byte() {
        assert_eq!(PacketType::from(0u8), PacketType::Stop);
        assert_eq!(PacketType::from(5u8), PacketType::RelayGpsFrames);
        assert_eq!(PacketType::from(6u8), PacketType::Unknown);
        assert_eq!(PacketType::from(0x55u8), PacketType::Unknown);
    }

    #[test]
    fn noop_and_toggle() {
        let f = CompletedFrame::encode_with(0, &[1, 2, 3]);
        assert_eq!(Command::from_frame(&f), Ok(Command::Noop));
        let f = CompletedFrame::encode_with(1, &[]);
        assert_eq!(Command::from_frame(&f), Ok(Command::ToggleIndicator));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let f = CompletedFrame::encode_with(9, &[]);
        assert_eq!(
            Command::from_frame(&f),
            Err(DecodeError::UnknownPacketType(9))
        );
    }

    #[test]
    fn short_frame() {
        assert_eq!(
            Command::decode(&[0x55, 0]),
            Err(DecodeError::FrameTooShort {
                expected: FRAME_SIZE,
                found: 2
            })
        );
    }

    #[test]
    fn relay_message_drops_checksum_byte() {
        let payload = [1, 2, 3, 4, 5, 6, 7, 8, 9, 0x01, 0xAA, 0xBB];
        let f = CompletedFrame::encode_with(2, &payload);
        let Ok(Command::RelayMessage(m)) = Command::from_frame(&f) else {
            panic!("expected relay message");
        };
        assert_eq!(m.data, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(m.known_kind(), Some(MessageKind::Gps));
        assert_eq!(m.checksum, 0);
    }

    #[test]
    fn relay_raw_message_keeps_checksum_byte() {
        let payload = [1, 2, 3, 4, 5, 6, 7, 8, 9, 0x01, 0xAA, 0xBB];
        let f = CompletedFrame::encode_with(3, &payload);
        let Ok(Command::RelayRawMessage(m)) = Command::from_frame(&f) else {
            panic!("expected raw relay message");
        };
        assert_eq!(m.checksum, 0xAA);
    }

    #[test]
    fn boot_page_groups() {
        let mut payload = [0u8; PAYLOAD_SIZE - 1];
        payload[0] = 12;
        for (i, b) in payload[1..].iter_mut().enumerate() {
            *b = i as u8;
        }
        let f = CompletedFrame::encode_with(4, &payload);
        let Ok(Command::RelayBootPage(page)) = Command::from_frame(&f) else {
            panic!("expected boot page");
        };
        assert_eq!(page.address, 12);
        let groups: std::vec::Vec<_> = page.word_groups(128).collect();
        assert_eq!(groups.len(), 22);
        assert_eq!(groups[0], (0, [0, 1, 2, 3, 4, 5]));
        assert_eq!(groups[1], (3, [6, 7, 8, 9, 10, 11]));
        assert_eq!(groups[21].0, 63);
        // 126, 127 from the page, then the frame's last byte, then the
        // 3 bytes past the frame as zero
        assert_eq!(&groups[21].1[..2], &[126, 127]);
        assert_eq!(groups[21].1[2], f.as_bytes()[FRAME_SIZE - 1]);
        assert_eq!(&groups[21].1[3..], &[0, 0, 0]);
    }

    #[test]
    fn oversized_page_is_capped_to_frame() {
        let page = BootPage::new(1, &[0xAB; 10]);
        let offsets: std::vec::Vec<u8> = page.word_groups(1200).map(|(o, _)| o).collect();
        assert_eq!(MAX_BOOT_PAGE_SIZE, 132);
        assert_eq!(offsets.len(), 22);
        assert!(offsets.windows(2).all(|w| w[1] == w[0] + 3));
        assert_eq!(offsets.last(), Some(&63));
        assert_eq!(page.word_groups(usize::MAX).count(), 22);
        // smaller pages are left alone
        assert_eq!(page.word_groups(12).count(), 2);
    }

    #[test]
    fn gps_stops_at_zero_id() {
        let mut payload = [0u8; 21];
        payload[0] = 1;
        payload[7] = 2;
        payload[14] = 0;
        let f = CompletedFrame::encode_with(5, &payload);
        let Ok(Command::RelayGpsFrames(fragments)) = Command::from_frame(&f) else {
            panic!("expected gps frames");
        };
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].id(), 2);
    }

    #[test]
    fn gps_uses_whole_payload() {
        let payload = [0x11u8; PAYLOAD_SIZE - 1];
        let f = CompletedFrame::encode_with(5, &payload);
        let Ok(Command::RelayGpsFrames(fragments)) = Command::from_frame(&f) else {
            panic!("expected gps frames");
        };
        assert_eq!(fragments.len(), MAX_GPS_FRAGMENTS);
    }
}
