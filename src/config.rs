//! Run-time settings of the gateway process
use std::fmt;
use std::time::Duration;

use crate::serial::DEFAULT_READ_RETRY_LIMIT;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, PartialEq)]
pub struct GatewayConfig {
    pub port: String,
    pub baud_rate: u32,
    /// how long a single UART read waits for data
    pub read_timeout: Duration,
    pub read_retry_limit: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_owned(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            read_retry_limit: DEFAULT_READ_RETRY_LIMIT,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    EmptyPort,
    ZeroBaudRate,
    ZeroRetryLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::EmptyPort => write!(f, "serial port path is empty"),
            ConfigError::ZeroBaudRate => write!(f, "baud rate must be positive"),
            ConfigError::ZeroRetryLimit => write!(f, "read retry limit must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::EmptyPort);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        if self.read_retry_limit == 0 {
            return Err(ConfigError::ZeroRetryLimit);
        }
        Ok(())
    }

    /// Upper bound of how long the first read of a poll may wait before giving up
    pub fn max_idle(&self) -> Duration {
        self.read_timeout
            .checked_mul(self.read_retry_limit)
            .unwrap_or(Duration::MAX)
    }
}
