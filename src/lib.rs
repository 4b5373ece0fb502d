#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod detector;
pub mod dispatch;
pub mod frame;
pub mod message;
pub mod serial;
pub mod store;
pub mod transport;

pub trait Encode {
    type Error;

    fn encode(&self, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub trait Bytes<T>
where
    T: AsRef<[u8]>,
{
    fn bytes(&self) -> T;
}

pub use command::{BootPage, Command, DecodeError, GpsFragment, PacketType};
pub use detector::{FrameDetector, ReceiveWindow};
pub use dispatch::{Dispatch, Dispatcher, RelayConfig};
pub use frame::{CompletedFrame, FRAME_SIZE, PAYLOAD_SIZE, SYNC_BYTE};
pub use message::{Message, MessageError, MessageKind, MESSAGE_SIZE};
pub use serial::{PumpError, Receiver};
pub use store::{FrameStore, StoreStats};
pub use transport::{Indicator, Line, PinIndicator, SerialTransport, Transport};
