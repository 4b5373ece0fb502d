//! Host side stand-in for the relay board.
//!
//! Reads the inbound byte stream from stdin, prints every record the relay
//! would put on the outbound link as hex, and the indicator changes.
//!
//! `ohc-relay [boot_page_size] [relay_pulse_ms] [completion_pulse_ms]`

use std::{collections::VecDeque, convert::Infallible, io::Read as _, thread, time::Duration};

use embedded_hal::delay::DelayNs;
use embedded_hal_nb::serial::{ErrorType, Read};
use ohc_relay::{Dispatcher, FrameStore, Indicator, Line, Receiver, RelayConfig, SerialTransport};

static STORE: FrameStore = FrameStore::new();

fn main() {
    let config = config_from_args();

    thread::spawn(|| {
        let mut rx = Receiver::new(&STORE);
        let mut stdin = std::io::stdin().lock();
        let mut chunk = [0u8; 256];
        let mut serial = ReadBuffer(VecDeque::new());
        loop {
            match stdin.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    serial.0.extend(&chunk[..n]);
                    // Infallible source
                    let _ = rx.pump(&mut serial);
                }
            }
        }
    });

    let mut dispatcher = Dispatcher::new(
        &STORE,
        SerialTransport::new(HexOut),
        PrintIndicator,
        StdDelay,
        config,
    );
    dispatcher.run()
}

fn config_from_args() -> RelayConfig {
    let args: Vec<u64> = std::env::args()
        .skip(1)
        .filter_map(|a| a.parse().ok())
        .collect();
    let mut config = RelayConfig::default();
    if let Some(size) = args.first() {
        config = config.with_boot_page_size(*size as usize);
    }
    if let Some(ms) = args.get(1) {
        config = config.with_relay_pulse_ms(*ms as u32);
    }
    if let Some(ms) = args.get(2) {
        config = config.with_completion_pulse_ms(*ms as u32);
    }
    config
}

#[derive(Debug)]
struct ReadBuffer(pub VecDeque<u8>);

impl ErrorType for ReadBuffer {
    type Error = Infallible;
}

impl Read for ReadBuffer {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.0.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// One line of hex per record
#[derive(Debug)]
struct HexOut;

impl embedded_io::ErrorType for HexOut {
    type Error = Infallible;
}

impl embedded_io::Write for HexOut {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let line: Vec<String> = buf.iter().map(|b| format!("{:02x}", b)).collect();
        println!("tx {}", line.join(" "));
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct PrintIndicator;

impl Indicator for PrintIndicator {
    fn set(&mut self, line: Line, on: bool) {
        // Activity blinks with every repeat, too noisy to print
        if line == Line::Status {
            println!("status {}", if on { "on" } else { "off" });
        }
    }
}

struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}
