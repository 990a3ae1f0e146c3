//! Cloud side of the gateway
//!
//! The cloud SDK itself is not part of this crate. It is reached through [`Transport`], which
//! takes finished JSON documents. This module builds those documents: single-field telemetry
//! events ([`JsonPublisher`]), device-twin reported properties ([`twin`]), the UART commands
//! triggered by direct methods ([`method`]) and button press events ([`buttons`]).
use std::fmt;
use std::io;

use serde_json::{Map, Value};

use crate::dispatch::Publisher;

pub mod buttons;
pub mod method;
pub mod twin;

#[derive(Debug, PartialEq)]
pub enum TransportError {
    NotConnected,
    /// the outbound queue did not accept the message
    Rejected,
    Io(io::ErrorKind),
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> TransportError {
        TransportError::Io(e.kind())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "client not connected"),
            TransportError::Rejected => write!(f, "message was not accepted for delivery"),
            TransportError::Io(kind) => write!(f, "transport I/O error: {:?}", kind),
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, PartialEq)]
pub enum CommandError {
    InvalidJson,
    /// payload parsed but is not a JSON object
    NotAnObject,
    UartWrite(io::ErrorKind),
    /// a button level could not be read
    InputRead(io::ErrorKind),
}

impl From<serde_json::Error> for CommandError {
    fn from(_: serde_json::Error) -> CommandError {
        CommandError::InvalidJson
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::InvalidJson => write!(f, "cannot parse the payload as JSON content"),
            CommandError::NotAnObject => write!(f, "payload is not a JSON object"),
            CommandError::UartWrite(kind) => write!(f, "could not write to UART: {:?}", kind),
            CommandError::InputRead(kind) => write!(f, "could not read button: {:?}", kind),
        }
    }
}

impl std::error::Error for CommandError {}

/// Hand-over point to the cloud client
///
/// Both calls only enqueue, delivery happens later on the client's own schedule.
pub trait Transport {
    fn send_event(&mut self, payload: &str) -> Result<(), TransportError>;
    fn send_reported_state(&mut self, payload: &str) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_event(&mut self, payload: &str) -> Result<(), TransportError> {
        (**self).send_event(payload)
    }

    fn send_reported_state(&mut self, payload: &str) -> Result<(), TransportError> {
        (**self).send_reported_state(payload)
    }
}

/// `{"<name>":"<value>"}`, the value is always a JSON string
pub fn telemetry_json(name: &str, value: &str) -> String {
    let mut object = Map::new();
    object.insert(name.to_owned(), Value::String(value.to_owned()));
    Value::Object(object).to_string()
}

/// [`Publisher`] turning every value into a single-field telemetry event
pub struct JsonPublisher<T: Transport> {
    transport: T,
    failed: u32,
}

impl<T: Transport> JsonPublisher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            failed: 0,
        }
    }

    /// Events the transport refused so far
    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Publisher for JsonPublisher<T> {
    fn publish(&mut self, name: &str, value: &str) {
        let payload = telemetry_json(name, value);
        if let Err(e) = self.transport.send_event(&payload) {
            self.failed += 1;
            log::warn!("failed to hand over {} to the transport: {}", payload, e);
        }
    }
}

/// [`Transport`] writing one JSON document per line, for a bridge process to pick up
pub struct LineTransport<W: io::Write> {
    writer: W,
}

impl<W: io::Write> LineTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, kind: &str, payload: &str) -> Result<(), TransportError> {
        writeln!(self.writer, "{} {}", kind, payload)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: io::Write> Transport for LineTransport<W> {
    fn send_event(&mut self, payload: &str) -> Result<(), TransportError> {
        self.write_line("event", payload)
    }

    fn send_reported_state(&mut self, payload: &str) -> Result<(), TransportError> {
        self.write_line("reported", payload)
    }
}
