//! UART byte source
//!
//! Read policy of the gateway event loop: when woken up, read once and retry a bounded number of
//! times while the port has nothing yet, then keep draining chunks until the port runs dry. What
//! happens to the bytes is up to the caller, usually [`Gateway::process_bytes`].
//!
//! [`Gateway::process_bytes`]: crate::gateway::Gateway::process_bytes
use std::fmt;
use std::io;

use crate::UART_CHUNK_LENGTH;

pub const DEFAULT_READ_RETRY_LIMIT: u32 = 32_767;

#[derive(Debug, PartialEq)]
pub enum ReadError {
    /// every attempt of the first read found no data
    RetriesExhausted(u32),
    Io(io::ErrorKind),
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> ReadError {
        ReadError::Io(e.kind())
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadError::RetriesExhausted(n) => write!(f, "no data from UART after {} attempts", n),
            ReadError::Io(kind) => write!(f, "could not read UART: {:?}", kind),
        }
    }
}

impl std::error::Error for ReadError {}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

pub struct ChunkReader<R: io::Read, const CHUNK: usize = UART_CHUNK_LENGTH> {
    reader: R,
    retry_limit: u32,
    buf: [u8; CHUNK],
}

impl<R: io::Read, const CHUNK: usize> ChunkReader<R, CHUNK> {
    pub fn new(reader: R) -> Self {
        Self::with_retry_limit(reader, DEFAULT_READ_RETRY_LIMIT)
    }

    pub fn with_retry_limit(reader: R, retry_limit: u32) -> Self {
        Self {
            reader,
            retry_limit: retry_limit.max(1),
            buf: [0; CHUNK],
        }
    }

    /// Reads everything currently available, handing it to `on_chunk` one chunk at a time.
    /// Returns the number of bytes read.
    pub fn poll<F: FnMut(&[u8])>(&mut self, mut on_chunk: F) -> Result<usize, ReadError> {
        let mut total = 0;
        let mut n = self.read_first()?;
        while n > 0 {
            on_chunk(&self.buf[..n]);
            total += n;
            n = match self.reader.read(&mut self.buf) {
                Ok(n) => n,
                Err(ref e) if is_transient(e) => 0,
                Err(e) => {
                    log::debug!("stopping UART drain: {}", e);
                    0
                }
            };
        }
        Ok(total)
    }

    fn read_first(&mut self) -> Result<usize, ReadError> {
        for _ in 0..self.retry_limit {
            match self.reader.read(&mut self.buf) {
                Ok(n) => return Ok(n),
                Err(ref e) if is_transient(e) => continue,
                Err(e) => {
                    log::error!("could not read UART: {}", e);
                    return Err(e.into());
                }
            }
        }
        Err(ReadError::RetriesExhausted(self.retry_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted read results
    struct Script(VecDeque<io::Result<Vec<u8>>>);

    impl Script {
        fn new(steps: Vec<io::Result<&[u8]>>) -> Self {
            Script(steps.into_iter().map(|s| s.map(|b| b.to_vec())).collect())
        }
    }

    impl io::Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(bytes)) => {
                    assert!(bytes.len() <= buf.len());
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }
    }

    fn timed_out() -> io::Result<&'static [u8]> {
        Err(io::ErrorKind::TimedOut.into())
    }

    #[test]
    fn test_retries_until_data_then_drains() {
        let script = Script::new(vec![timed_out(), timed_out(), Ok(b"{\"n\""), Ok(b":1}"), Ok(b"")]);
        let mut reader = ChunkReader::<_, 8>::with_retry_limit(script, 5);
        let mut chunks = Vec::new();
        let total = reader.poll(|c| chunks.push(c.to_vec())).unwrap();
        assert_eq!(total, 7);
        assert_eq!(chunks, vec![b"{\"n\"".to_vec(), b":1}".to_vec()]);
    }

    #[test]
    fn test_retries_exhausted() {
        let script = Script::new(vec![timed_out(), timed_out(), timed_out()]);
        let mut reader = ChunkReader::<_, 8>::with_retry_limit(script, 3);
        assert_eq!(
            reader.poll(|_| panic!("no data expected")),
            Err(ReadError::RetriesExhausted(3))
        );
    }

    #[test]
    fn test_first_read_error_is_fatal() {
        let script = Script::new(vec![Err(io::ErrorKind::BrokenPipe.into())]);
        let mut reader = ChunkReader::<_, 8>::new(script);
        assert_eq!(
            reader.poll(|_| {}),
            Err(ReadError::Io(io::ErrorKind::BrokenPipe))
        );
    }

    #[test]
    fn test_empty_first_read_is_not_an_error() {
        let script = Script::new(vec![Ok(b"")]);
        let mut reader = ChunkReader::<_, 8>::new(script);
        assert_eq!(reader.poll(|_| panic!("no data expected")), Ok(0));
    }

    #[test]
    fn test_drain_stops_on_error_after_data() {
        let script = Script::new(vec![
            Ok(b"abc"),
            Err(io::ErrorKind::BrokenPipe.into()),
            Ok(b"never"),
        ]);
        let mut reader = ChunkReader::<_, 8>::new(script);
        assert_eq!(reader.poll(|_| {}), Ok(3));
    }

    #[test]
    fn test_feeds_gateway() {
        use crate::cloud::{tests::MemoryTransport, JsonPublisher};
        use crate::gateway::Gateway;

        let script = Script::new(vec![
            Ok(br#"{"n":"D051238","#),
            Ok(br#""St":0}{"n":"D0"#),
            Ok(br#"51238","bat":9"#),
            Ok(b"9}"),
        ]);
        let mut reader = ChunkReader::<_, 16>::new(script);
        let mut gw: Gateway<JsonPublisher<MemoryTransport>> =
            Gateway::new(JsonPublisher::new(MemoryTransport::default()));
        reader
            .poll(|chunk| {
                gw.process_bytes(chunk);
            })
            .unwrap();
        assert_eq!(
            gw.publisher().transport().events,
            vec![
                r#"{"DoorState":"0"}"#.to_owned(),
                r#"{"DoorBat":"99"}"#.to_owned()
            ]
        );
    }
}
