use log::trace;

use crate::frame::{CompletedFrame, FRAME_SIZE, SYNC_BYTE};

/// The most recent `FRAME_SIZE` bytes of the stream.
///
/// `checksum` is always the XOR of every byte in `buf`. It is updated
/// incrementally on each push, never recomputed.
#[derive(Debug, Clone)]
pub struct ReceiveWindow {
    buf: [u8; FRAME_SIZE],
    /// Next slot to be overwritten, which is also the oldest byte
    head: usize,
    checksum: u8,
}

impl ReceiveWindow {
    pub const fn new() -> ReceiveWindow {
        ReceiveWindow {
            buf: [0; FRAME_SIZE],
            head: 0,
            checksum: 0,
        }
    }

    /// Evict the oldest byte and append `byte`
    pub fn push(&mut self, byte: u8) {
        self.checksum ^= self.buf[self.head];
        self.buf[self.head] = byte;
        self.checksum ^= byte;
        self.head += 1;
        if self.head >= FRAME_SIZE {
            self.head = 0;
        }
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn oldest(&self) -> u8 {
        self.buf[self.head]
    }

    /// Oldest sentinel and a zero checksum
    pub fn is_synchronized(&self) -> bool {
        self.oldest() == SYNC_BYTE && self.checksum == 0
    }

    /// Copy the window out oldest-first
    pub fn linearize(&self) -> CompletedFrame {
        let mut out = [0; FRAME_SIZE];
        let num = FRAME_SIZE - self.head;
        out[..num].copy_from_slice(&self.buf[self.head..]);
        out[num..].copy_from_slice(&self.buf[..self.head]);
        CompletedFrame::from_bytes(out)
    }
}

impl Default for ReceiveWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Self-synchronizing detector over a sliding window of the byte stream.
///
/// There are no delimiters to scan for. The window is a frame whenever it
/// starts with [`SYNC_BYTE`] and XORs to zero, so the detector resyncs by
/// itself after dropped or garbled bytes. Noise produces a false match
/// about once in 256 candidate windows; nothing here tries to filter that.
#[derive(Debug, Clone, Default)]
pub struct FrameDetector {
    window: ReceiveWindow,
}

impl FrameDetector {
    pub const fn new() -> FrameDetector {
        FrameDetector {
            window: ReceiveWindow::new(),
        }
    }

    pub fn feed(&mut self, byte: u8) -> Option<CompletedFrame> {
        self.window.push(byte);
        if !self.window.is_synchronized() {
            return None;
        }
        let frame = self.window.linearize();
        trace!("synchronized at head {}, type {}", self.window.head(), frame.kind());
        Some(frame)
    }

    pub fn window(&self) -> &ReceiveWindow {
        &self.window
    }

    /// Back to the all-zero startup state
    pub fn reset(&mut self) {
        self.window = ReceiveWindow::new();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn window_xor(w: &ReceiveWindow) -> u8 {
        w.linearize().as_bytes().iter().fold(0, |acc, b| acc ^ b)
    }

    #[test]
    fn starts_zeroed() {
        let d = FrameDetector::new();
        assert_eq!(d.window().checksum(), 0);
        assert_eq!(d.window().head(), 0);
        assert!(!d.window().is_synchronized());
    }

    #[test]
    fn head_wraps() {
        let mut w = ReceiveWindow::new();
        for _ in 0..FRAME_SIZE - 1 {
            w.push(1);
        }
        assert_eq!(w.head(), FRAME_SIZE - 1);
        w.push(1);
        assert_eq!(w.head(), 0);
    }

    #[test]
    fn detects_frame_on_last_byte() {
        let frame = CompletedFrame::encode_with(4, &[9, 8, 7]);
        let mut d = FrameDetector::new();
        let bytes = frame.as_bytes();
        for b in &bytes[..FRAME_SIZE - 1] {
            assert_eq!(d.feed(*b), None);
        }
        let out = d.feed(bytes[FRAME_SIZE - 1]).expect("frame");
        assert_eq!(out, frame);
        assert_eq!(out.sync(), SYNC_BYTE);
        assert_eq!(out.kind(), 4);
    }

    #[test]
    fn detects_frame_when_head_is_not_zero() {
        let frame = CompletedFrame::encode_with(1, &[0x10, 0x20]);
        let mut d = FrameDetector::new();
        // Misalign the window with noise first
        for b in [0x01, 0x02, 0x03, 0x55, 0x11] {
            let _ = d.feed(b);
        }
        let mut found = None;
        for b in frame.as_bytes() {
            if let Some(f) = d.feed(*b) {
                found = Some(f);
            }
        }
        assert_eq!(d.window().head(), 5);
        assert_eq!(found, Some(frame));
    }

    #[test]
    fn resyncs_after_garbage() {
        let frame = CompletedFrame::encode_with(2, &[0xde, 0xad, 0xbe, 0xef]);
        let mut d = FrameDetector::new();
        let garbage = [0x55u8, 0x00, 0x13, 0x37, 0x55, 0x55, 0xaa];
        for b in garbage {
            let _ = d.feed(b);
        }
        let last = frame
            .as_bytes()
            .iter()
            .map(|b| d.feed(*b))
            .last()
            .flatten();
        assert_eq!(last, Some(frame));
    }

    #[test]
    fn reset_clears_window() {
        let mut d = FrameDetector::new();
        for b in 0..50u8 {
            let _ = d.feed(b);
        }
        d.reset();
        assert_eq!(d.window().head(), 0);
        assert_eq!(d.window().checksum(), 0);
    }

    proptest! {
        #[test]
        fn checksum_matches_window(bytes in proptest::collection::vec(any::<u8>(), 0..600)) {
            let mut d = FrameDetector::new();
            for b in bytes {
                let _ = d.feed(b);
                prop_assert_eq!(d.window().checksum(), window_xor(d.window()));
            }
        }

        #[test]
        fn frame_after_noise_is_detected(
            noise in proptest::collection::vec(any::<u8>(), 0..300),
            kind in 0u8..6,
            payload in proptest::collection::vec(any::<u8>(), 0..129),
        ) {
            let frame = CompletedFrame::encode_with(kind, &payload);
            let mut d = FrameDetector::new();
            for b in noise {
                let _ = d.feed(b);
            }
            let mut last = None;
            for b in frame.as_bytes() {
                last = d.feed(*b);
            }
            prop_assert_eq!(last, Some(frame));
        }
    }
}
