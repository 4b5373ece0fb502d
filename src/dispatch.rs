use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::command::{BootPage, Command, GpsFragment, PacketType};
use crate::message::Message;
use crate::store::FrameStore;
use crate::transport::{Indicator, Line, Transport};

/// Timing and sizing knobs of the relay behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// On and off time of the activity pulse around each repeated message
    pub relay_pulse_ms: u32,
    /// On and off time of the pulse after a boot page or GPS batch
    pub completion_pulse_ms: u32,
    /// Bytes per bootloader page, one message per 6 bytes
    pub boot_page_size: usize,
}

impl RelayConfig {
    pub const fn new() -> RelayConfig {
        RelayConfig {
            relay_pulse_ms: 3,
            completion_pulse_ms: 10,
            boot_page_size: 128,
        }
    }

    pub const fn with_relay_pulse_ms(mut self, ms: u32) -> RelayConfig {
        self.relay_pulse_ms = ms;
        self
    }

    pub const fn with_completion_pulse_ms(mut self, ms: u32) -> RelayConfig {
        self.completion_pulse_ms = ms;
        self
    }

    pub const fn with_boot_page_size(mut self, size: usize) -> RelayConfig {
        self.boot_page_size = size;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one handled frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatch {
    pub packet_type: PacketType,
    /// Messages handed to the transport
    pub sent: usize,
    /// Cut short by a fresher frame
    pub interrupted: bool,
}

impl Dispatch {
    fn done(packet_type: PacketType, sent: usize) -> Dispatch {
        Dispatch {
            packet_type,
            sent,
            interrupted: false,
        }
    }
}

/// Relays can run for as long as no frame arrives, the count just sticks
fn one_more(sent: usize) -> usize {
    sent.saturating_add(1)
}

/// Consumer side of the [`FrameStore`].
///
/// Cycles Idle -> Decode -> behaviour -> Idle. The frame being worked on is
/// a private copy, so the receive side can keep publishing while a relay
/// loop runs. Every relay loop peeks at the store on each iteration and
/// returns as soon as something newer shows up.
pub struct Dispatcher<'a, T: Transport, I: Indicator, D: DelayNs> {
    store: &'a FrameStore,
    transport: T,
    indicator: I,
    delay: D,
    config: RelayConfig,
    status_on: bool,
}

impl<'a, T: Transport, I: Indicator, D: DelayNs> Dispatcher<'a, T, I, D> {
    pub fn new(
        store: &'a FrameStore,
        transport: T,
        indicator: I,
        delay: D,
        config: RelayConfig,
    ) -> Dispatcher<'a, T, I, D> {
        Dispatcher {
            store,
            transport,
            indicator,
            delay,
            config,
            status_on: false,
        }
    }

    /// Handle the pending frame, if any. Returns `None` while idle.
    pub fn poll(&mut self) -> Option<Dispatch> {
        let frame = self.store.take_if_available()?;
        let command = match Command::from_frame(&frame) {
            Ok(c) => c,
            Err(e) => {
                warn!("ignoring frame: {:?}", e);
                return Some(Dispatch::done(PacketType::Unknown, 0));
            }
        };
        debug!("dispatch {:?}", command.packet_type());
        let dispatch = self.execute(command);
        if dispatch.interrupted {
            debug!(
                "{:?} interrupted after {} messages",
                dispatch.packet_type, dispatch.sent
            );
        }
        Some(dispatch)
    }

    /// Main loop, never returns
    pub fn run(&mut self) -> ! {
        loop {
            let _ = self.poll();
        }
    }

    pub fn execute(&mut self, command: Command) -> Dispatch {
        match command {
            Command::Noop => Dispatch::done(PacketType::Stop, 0),
            Command::ToggleIndicator => {
                self.status_on = !self.status_on;
                self.indicator.set(Line::Status, self.status_on);
                Dispatch::done(PacketType::ToggleIndicator, 0)
            }
            Command::RelayMessage(mut msg) => {
                msg.checksum = self.transport.checksum(&msg);
                self.repeat(PacketType::RelayMessage, &msg)
            }
            Command::RelayRawMessage(msg) => self.repeat(PacketType::RelayRawMessage, &msg),
            Command::RelayBootPage(page) => self.relay_boot_page(&page),
            Command::RelayGpsFrames(fragments) => self.relay_gps(&fragments),
        }
    }

    /// Send `msg` over and over until a new frame arrives
    fn repeat(&mut self, packet_type: PacketType, msg: &Message) -> Dispatch {
        let mut sent = 0;
        while !self.store.is_available() {
            self.transport.send(msg);
            sent = one_more(sent);
            self.pulse(self.config.relay_pulse_ms);
        }
        Dispatch {
            packet_type,
            sent,
            interrupted: true,
        }
    }

    fn relay_boot_page(&mut self, page: &BootPage) -> Dispatch {
        let mut sent = 0;
        let mut interrupted = false;
        for (offset, words) in page.word_groups(self.config.boot_page_size) {
            if self.store.is_available() {
                interrupted = true;
                break;
            }
            let mut msg = Message::boot_page_write(page.address, offset, &words);
            msg.checksum = self.transport.checksum(&msg);
            self.transport.send(&msg);
            sent = one_more(sent);
        }
        debug!("boot page {} relayed in {} messages", page.address, sent);
        self.pulse(self.config.completion_pulse_ms);
        Dispatch {
            packet_type: PacketType::RelayBootPage,
            sent,
            interrupted,
        }
    }

    fn relay_gps(&mut self, fragments: &[GpsFragment]) -> Dispatch {
        let mut sent = 0;
        let mut interrupted = false;
        for fragment in fragments {
            if self.store.is_available() {
                interrupted = true;
                break;
            }
            let mut msg = Message::gps(&fragment.0);
            msg.checksum = self.transport.checksum(&msg);
            self.transport.send(&msg);
            sent = one_more(sent);
        }
        self.pulse(self.config.completion_pulse_ms);
        Dispatch {
            packet_type: PacketType::RelayGpsFrames,
            sent,
            interrupted,
        }
    }

    fn pulse(&mut self, ms: u32) {
        self.indicator.set(Line::Activity, true);
        self.delay.delay_ms(ms);
        self.indicator.set(Line::Activity, false);
        self.delay.delay_ms(ms);
    }

    /// Current level of the status line
    pub fn status_on(&self) -> bool {
        self.status_on
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn release(self) -> (T, I, D) {
        (self.transport, self.indicator, self.delay)
    }
}
