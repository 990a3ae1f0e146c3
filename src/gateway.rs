//! Decode-and-dispatch pass
//!
//! [`Gateway`] owns the [`Decoder`] and the [`Publisher`], so only one pass can run at a time.
//! The event loop hands every chunk read from the UART to [`Gateway::process_bytes`], which
//! decodes and publishes synchronously before returning.
use crate::decoder::{Decoder, DecoderStats, DEFAULT_MAX_MESSAGE_LENGTH};
use crate::dispatch::{dispatch, Publisher, Route};

pub struct Gateway<P: Publisher, const MSGL: usize = DEFAULT_MAX_MESSAGE_LENGTH> {
    decoder: Decoder<MSGL>,
    publisher: P,
}

impl<P: Publisher, const MSGL: usize> Gateway<P, MSGL> {
    pub fn new(publisher: P) -> Self {
        Self {
            decoder: Decoder::new(),
            publisher,
        }
    }

    /// Decodes `bytes` and publishes every message completed by them. Returns the number of
    /// completed messages.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> usize {
        self.process_bytes_with(bytes, |_| {})
    }

    /// Like [`Self::process_bytes`], `on_route` observes the route taken by each message
    pub fn process_bytes_with<F: FnMut(Route)>(&mut self, bytes: &[u8], mut on_route: F) -> usize {
        let Self { decoder, publisher } = self;
        decoder.process_bytes(bytes, |frame| {
            let route = dispatch(&frame, publisher);
            #[cfg(feature = "std")]
            log::debug!("message routed: {:?}", route);
            on_route(route);
        })
    }

    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }
}
