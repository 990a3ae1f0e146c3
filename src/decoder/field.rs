//! Fixed capacity capture buffer
//!
//! Every region the decoder captures (sub-values, battery value, node identifier, bracket text)
//! is stored in a [`Field`]. Capacities are small and fixed by the wire protocol, bytes past the
//! capacity are dropped while the cursor keeps counting, so an over-long value always yields
//! its capacity-limited prefix.
use heapless::Vec;

#[derive(Clone, Default, PartialEq)]
pub struct Field<const N: usize> {
    buf: Vec<u8, N>,
    /// number of bytes offered to this field, including the truncated ones
    cursor: usize,
}

impl<const N: usize> Field<N> {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            cursor: 0,
        }
    }

    /// Appends `byte` if there is room left, returns `false` when it was truncated
    pub fn push(&mut self, byte: u8) -> bool {
        self.cursor += 1;
        match self.buf.push(byte) {
            Ok(()) => true,
            Err(_) => {
                log::trace!("field full ({} bytes), dropping {:#04x}", N, byte);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.cursor = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Captured text. Non UTF-8 input is cut at the first invalid sequence.
    pub fn as_str(&self) -> &str {
        match core::str::from_utf8(&self.buf) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&self.buf[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    pub fn first(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.buf.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes offered so far, may exceed `N`
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_truncated(&self) -> bool {
        self.cursor > N
    }

    pub const fn capacity() -> usize {
        N
    }
}

#[cfg(feature = "std")]
impl<const N: usize> core::fmt::Debug for Field<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}
