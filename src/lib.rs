//! Decoding of the sensor mesh UART protocol and routing of its values to cloud telemetry.
//!
//! [`decoder`] and [`dispatch`] work without an allocator. The cloud documents, the UART reader
//! and the run-time configuration need the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod decoder;
pub mod dispatch;
pub mod gateway;

#[cfg(feature = "std")]
pub mod cloud;
#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod serial;

// include defmt::Format implementations
// we don't want them derive()d in the modules unless defmt-impl feature is set
#[cfg(feature = "defmt-impl")]
pub mod defmt;

// reexport heapless
pub use heapless;

pub use decoder::{Decoder, DecoderStats, Frame};
pub use dispatch::{dispatch, NodeClass, Publisher, Route, TelemetryPoint};
pub use gateway::Gateway;

/// Bytes requested from the UART per read
pub const UART_CHUNK_LENGTH: usize = 128;
