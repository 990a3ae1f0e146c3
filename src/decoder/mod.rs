//! Sensor mesh UART protocol decoder
//!
//! The mesh coordinator prints loosely bracketed text messages on the serial line, e.g.
//!
//! ```text
//! {"n":"D051234","eV":[21,48,995]}
//! {"n":"D051238","St":1}
//! {"n":"D051236","bat":87}
//! ```
//!
//! There is no grammar behind these. Fields are picked out by trigger sequences while the bytes
//! stream past:
//!
//! | field            | armed by         | opened by | captured                       |
//! |------------------|------------------|-----------|--------------------------------|
//! | node identifier  | `D0`             | `5`       | next 4 bytes                   |
//! | value bracket    | `eV`             | `[`       | up to `]`, split on `,` in 3   |
//! | battery value    | `b` … `a`        | `:`       | up to `}`                      |
//! | button flag      | `b` … `u`        |           |                                |
//! | door flag        | `St`             |           |                                |
//! | door state       | door/button flag | `0`/`1`   | last digit wins                |
//!
//! Messages are framed by counting `{` against `}`. When the counts balance the message is
//! complete, [`Decoder::push`] returns its [`Frame`] and every bit of per-message state is
//! cleared. [`Decoder`] is fed byte by byte, so chunks may be split anywhere.
use core::mem;

use heapless::Vec;

mod field;
pub mod trigger;

pub use field::Field;
use trigger::{Detected, Latches, Region, Segment};

/// Capacity of the raw message buffer, a longer message is dropped
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 128;
pub const NODE_ID_LENGTH: usize = 4;
pub const BRACKET_VALUE_LENGTH: usize = 19;
pub const VALUE1_LENGTH: usize = 2;
pub const VALUE2_LENGTH: usize = 2;
pub const VALUE3_LENGTH: usize = 3;
pub const BATTERY_VALUE_LENGTH: usize = 5;

/// Position of the node-class character in the node identifier
pub const NODE_CLASS_INDEX: usize = 3;

/// Fields of one complete message
#[derive(Clone, Default, PartialEq)]
pub struct Frame<const MSGL: usize = DEFAULT_MAX_MESSAGE_LENGTH> {
    /// `{` … `}`, kept for logging
    pub raw: Vec<u8, MSGL>,
    pub node_id: Field<NODE_ID_LENGTH>,
    /// Text of the last closed value bracket, commas included
    pub value: Field<BRACKET_VALUE_LENGTH>,
    pub value1: Field<VALUE1_LENGTH>,
    pub value2: Field<VALUE2_LENGTH>,
    pub value3: Field<VALUE3_LENGTH>,
    pub battery: Field<BATTERY_VALUE_LENGTH>,
    pub battery_flag: bool,
    pub button_flag: bool,
    pub door_flag: bool,
    /// `b'0'` or `b'1'` once seen after the door or button flag
    pub door_state: Option<u8>,
}

impl<const MSGL: usize> Frame<MSGL> {
    pub fn node_class(&self) -> Option<u8> {
        self.node_id.get(NODE_CLASS_INDEX)
    }

    /// Routing is only allowed when the bracket value does not start with `0`. A message without
    /// a closed bracket has an empty value and passes.
    pub fn gate_open(&self) -> bool {
        self.value.first() != Some(b'0')
    }

    /// Door state as published, closed (`"0"`) unless a `1` was seen
    pub fn door_state_str(&self) -> &'static str {
        match self.door_state {
            Some(b'1') => "1",
            _ => "0",
        }
    }

    pub fn raw_str(&self) -> &str {
        core::str::from_utf8(&self.raw).unwrap_or("<non utf-8 message>")
    }
}

#[cfg(feature = "std")]
impl<const MSGL: usize> core::fmt::Debug for Frame<MSGL> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Frame {{ raw: {:?}, node_id: {:?}, value: {:?}, values: [{:?}, {:?}, {:?}], battery: {:?}, flags: [battery: {}, button: {}, door: {}], door_state: {:?} }}",
            self.raw_str(),
            self.node_id,
            self.value,
            self.value1,
            self.value2,
            self.value3,
            self.battery,
            self.battery_flag,
            self.button_flag,
            self.door_flag,
            self.door_state.map(char::from),
        )
    }
}

/// Counters kept across messages
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct DecoderStats {
    pub completed: u32,
    /// messages dropped because they outgrew the raw buffer
    pub dropped: u32,
    /// `}` seen while no message was open
    pub stray_closes: u32,
}

/// Incremental decoder holding all state of the message in progress
pub struct Decoder<const MSGL: usize = DEFAULT_MAX_MESSAGE_LENGTH> {
    frame: Frame<MSGL>,
    latches: Latches,
    identifier: Region,
    identifier_buf: Field<NODE_ID_LENGTH>,
    bracket: Region,
    bracket_buf: Field<BRACKET_VALUE_LENGTH>,
    segment: Segment,
    battery: Region,
    opened: usize,
    closed: usize,
    /// bytes since the first `{`, not restarted by a nested one
    length: usize,
    stats: DecoderStats,
}

impl<const MSGL: usize> Decoder<MSGL> {
    pub fn new() -> Self {
        Self {
            frame: Frame::default(),
            latches: Latches::default(),
            identifier: Region::Closed,
            identifier_buf: Field::new(),
            bracket: Region::Closed,
            bracket_buf: Field::new(),
            segment: Segment::First,
            battery: Region::Closed,
            opened: 0,
            closed: 0,
            length: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Feeds a chunk of bytes, `on_frame` is called for every message completed in it. Returns
    /// the number of completed messages.
    pub fn process_bytes<F: FnMut(Frame<MSGL>)>(&mut self, bytes: &[u8], mut on_frame: F) -> usize {
        let mut completed = 0;
        for &byte in bytes {
            if let Some(frame) = self.push(byte) {
                completed += 1;
                on_frame(frame);
            }
        }
        completed
    }

    /// Feeds one byte. Each rule below may observe what an earlier one did with the same byte.
    pub fn push(&mut self, byte: u8) -> Option<Frame<MSGL>> {
        match self.latches.battery.fire(byte) {
            Some(Detected::Battery) => self.frame.battery_flag = true,
            Some(Detected::Button) => self.frame.button_flag = true,
            None => {}
        }
        self.capture_battery(byte);

        if self.latches.door.fire(byte, b't') {
            self.frame.door_flag = true;
        }
        if (self.frame.door_flag || self.frame.button_flag) && (byte == b'0' || byte == b'1') {
            self.frame.door_state = Some(byte);
        }

        if self.latches.identifier.fire(byte, b'0') {
            self.identifier.arm();
        }
        self.capture_identifier(byte);

        if self.latches.value.fire(byte, b'V') {
            self.bracket.arm();
        }
        self.capture_bracket(byte);

        self.frame_byte(byte)
    }

    /// Drops the message in progress and returns to idle. Statistics are kept.
    pub fn reset(&mut self) {
        let stats = self.stats;
        *self = Self::new();
        self.stats = stats;
    }

    /// `true` while a `{` is waiting for its `}`
    pub fn in_message(&self) -> bool {
        self.opened > self.closed
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    fn capture_battery(&mut self, byte: u8) {
        match self.battery {
            Region::Capturing if byte == b'}' => self.battery = Region::Closed,
            Region::Capturing => {
                self.frame.battery.push(byte);
            }
            _ if self.frame.battery_flag && byte == b':' => {
                self.frame.battery.clear();
                self.battery = Region::Capturing;
            }
            _ => {}
        }
    }

    fn capture_identifier(&mut self, byte: u8) {
        match self.identifier {
            Region::Capturing => {
                self.identifier_buf.push(byte);
                if self.identifier_buf.len() == NODE_ID_LENGTH {
                    self.frame.node_id = mem::take(&mut self.identifier_buf);
                    self.identifier = Region::Closed;
                }
            }
            Region::Pending if byte == b'5' => {
                self.identifier_buf.clear();
                self.identifier = Region::Capturing;
            }
            _ => {}
        }
    }

    fn capture_bracket(&mut self, byte: u8) {
        match self.bracket {
            Region::Capturing if byte == b']' => {
                self.frame.value = mem::take(&mut self.bracket_buf);
                self.bracket = Region::Closed;
            }
            Region::Capturing => {
                self.bracket_buf.push(byte);
                if byte == b',' {
                    self.segment.advance();
                } else {
                    match self.segment {
                        Segment::First => self.frame.value1.push(byte),
                        Segment::Second => self.frame.value2.push(byte),
                        Segment::Third => self.frame.value3.push(byte),
                    };
                }
            }
            // a later bracket in the same message replaces the sub-values of an earlier one
            Region::Pending if byte == b'[' => {
                self.bracket_buf.clear();
                self.frame.value1.clear();
                self.frame.value2.clear();
                self.frame.value3.clear();
                self.segment = Segment::First;
                self.bracket = Region::Capturing;
            }
            _ => {}
        }
    }

    fn frame_byte(&mut self, byte: u8) -> Option<Frame<MSGL>> {
        match byte {
            b'{' => {
                self.opened += 1;
                self.frame.raw.clear();
                self.append_raw(byte);
                None
            }
            b'}' if !self.in_message() => {
                self.stats.stray_closes += 1;
                log::debug!("ignoring '}}' outside of a message");
                None
            }
            b'}' => {
                self.closed += 1;
                if !self.append_raw(byte) {
                    return None;
                }
                if self.opened == self.closed {
                    Some(self.complete())
                } else {
                    None
                }
            }
            _ => {
                self.latches.cascade(byte);
                if self.in_message() {
                    self.append_raw(byte);
                }
                None
            }
        }
    }

    /// Returns `false` if the message outgrew the buffer and was dropped. The length counts
    /// from the outermost `{` so a message that lost its `}` is dropped as well.
    fn append_raw(&mut self, byte: u8) -> bool {
        self.length += 1;
        if self.length <= MSGL && self.frame.raw.push(byte).is_ok() {
            return true;
        }
        log::warn!(
            "message longer than {} bytes, dropping it: {}",
            MSGL,
            self.frame.raw_str()
        );
        self.stats.dropped += 1;
        self.reset();
        false
    }

    fn complete(&mut self) -> Frame<MSGL> {
        let frame = mem::take(&mut self.frame);
        self.stats.completed += 1;
        self.reset();
        log::debug!("complete message: {}", frame.raw_str());
        log::trace!(
            "node id: {}, values: {}/{}/{}, battery: {}",
            frame.node_id.as_str(),
            frame.value1.as_str(),
            frame.value2.as_str(),
            frame.value3.as_str(),
            frame.battery.as_str()
        );
        frame
    }
}

impl<const MSGL: usize> Default for Decoder<MSGL> {
    fn default() -> Self {
        Self::new()
    }
}
