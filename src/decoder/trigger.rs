//! Trigger sub-machines of the decoder
//!
//! Fields in the sensor mesh protocol are not located by parsing, they are armed by short
//! character sequences seen in the stream. Each independent detector is one of the small state
//! machines below.

/// One-shot latch for a two character sequence, e.g. `St` or `eV`
///
/// Armed by the first character, the latch is spent by whatever byte follows.
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Latch {
    #[default]
    Idle,
    Armed,
}

impl Latch {
    pub fn arm(&mut self) {
        *self = Latch::Armed;
    }

    /// Returns `true` if the latch was armed and `byte` completes the sequence. The latch is
    /// idle afterwards in either case.
    pub fn fire(&mut self, byte: u8, expected: u8) -> bool {
        let hit = *self == Latch::Armed && byte == expected;
        *self = Latch::Idle;
        hit
    }
}

/// What the sticky `b` latch resolved to
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Detected {
    /// `b` … `a`
    Battery,
    /// `b` … `u`
    Button,
}

/// Latch for `b` followed, at any distance, by `a` (battery) or `u` (button)
///
/// Unlike [`Latch`] it stays armed across unrelated bytes until one of the two completes it.
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum StickyLatch {
    #[default]
    Idle,
    Armed,
}

impl StickyLatch {
    pub fn arm(&mut self) {
        *self = StickyLatch::Armed;
    }

    pub fn fire(&mut self, byte: u8) -> Option<Detected> {
        if *self != StickyLatch::Armed {
            return None;
        }
        let detected = match byte {
            b'a' => Detected::Battery,
            b'u' => Detected::Button,
            _ => return None,
        };
        *self = StickyLatch::Idle;
        Some(detected)
    }
}

/// Capture region: closed, waiting for its opening character, or capturing
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Region {
    #[default]
    Closed,
    Pending,
    Capturing,
}

impl Region {
    /// A region already capturing ignores a new arm
    pub fn arm(&mut self) {
        if *self == Region::Closed {
            *self = Region::Pending;
        }
    }

    pub fn is_capturing(&self) -> bool {
        *self == Region::Capturing
    }
}

/// Which of the three comma separated sub-values a bracket byte belongs to
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Segment {
    #[default]
    First,
    Second,
    Third,
}

impl Segment {
    /// Commas past the second one keep filling the third sub-value
    pub fn advance(&mut self) {
        *self = match self {
            Segment::First => Segment::Second,
            Segment::Second | Segment::Third => Segment::Third,
        };
    }
}

/// The four latches armed by trigger characters
///
/// Arming cascades: `b` arms all four, `e` arms `e`, `D` and `S`, `D` arms `D` and `S`, `S` only
/// arms itself. So `bV`, `b0` or `et` complete sequences just like `eV`, `D0` and `St` do. The
/// sensor mesh firmware has always been decoded this way and node payloads rely on it.
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Latches {
    pub battery: StickyLatch,
    pub value: Latch,
    pub identifier: Latch,
    pub door: Latch,
}

impl Latches {
    pub fn cascade(&mut self, byte: u8) {
        match byte {
            b'b' => {
                self.battery.arm();
                self.value.arm();
                self.identifier.arm();
                self.door.arm();
            }
            b'e' => {
                self.value.arm();
                self.identifier.arm();
                self.door.arm();
            }
            b'D' => {
                self.identifier.arm();
                self.door.arm();
            }
            b'S' => self.door.arm(),
            _ => {}
        }
    }
}
