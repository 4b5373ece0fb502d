use embedded_hal_nb::serial::Read;
use log::{trace, warn};

use crate::detector::FrameDetector;
use crate::store::FrameStore;

/// Receive side: runs every incoming byte through the detector and hands
/// completed frames to the store.
///
/// Meant to live in the byte arrival context (RX interrupt or a reader
/// task), with the [`crate::Dispatcher`] on the other end of the store.
pub struct Receiver<'a> {
    detector: FrameDetector,
    store: &'a FrameStore,
}

#[derive(Debug)]
pub enum PumpError<E> {
    Read(E),
}

impl<'a> Receiver<'a> {
    pub fn new(store: &'a FrameStore) -> Receiver<'a> {
        Receiver {
            detector: FrameDetector::new(),
            store,
        }
    }

    /// Returns true if this byte completed a frame
    pub fn on_byte(&mut self, byte: u8) -> bool {
        match self.detector.feed(byte) {
            Some(frame) => {
                self.store.publish(frame);
                true
            }
            None => false,
        }
    }

    /// Read from rx until it would block. Like `flush` from Write but the
    /// other way around.
    ///
    /// Returns the number of frames completed along the way.
    pub fn pump<Rx: Read>(&mut self, rx: &mut Rx) -> Result<usize, PumpError<Rx::Error>> {
        let mut frames = 0;
        loop {
            match rx.read() {
                Ok(b) => {
                    if self.on_byte(b) {
                        frames += 1;
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => {
                    warn!("serial read error: {:?}", e);
                    return Err(PumpError::Read(e));
                }
            }
        }
        if frames > 0 {
            trace!("pumped {} frames", frames);
        }
        Ok(frames)
    }

    pub fn detector(&self) -> &FrameDetector {
        &self.detector
    }
}
