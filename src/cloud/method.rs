//! Direct methods invoked from the hub
//!
//! The method payload carries a numeric `hub_code`. Known codes are translated into a command
//! for the mesh coordinator and written to the UART.
use std::io;

use serde_json::Value;

use super::CommandError;

pub const IDENTIFY_NODE_CODE: i64 = 123;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HubCommand {
    /// Make node `A` identify itself
    IdentifyNode,
}

impl HubCommand {
    pub fn from_code(code: i64) -> Option<HubCommand> {
        match code {
            IDENTIFY_NODE_CODE => Some(HubCommand::IdentifyNode),
            _ => None,
        }
    }

    /// Parses a direct method payload. `Ok(None)` for codes the gateway does not know.
    pub fn from_payload(payload: &[u8]) -> Result<Option<HubCommand>, CommandError> {
        let root: Value = serde_json::from_slice(payload)?;
        let root = root.as_object().ok_or(CommandError::NotAnObject)?;
        // missing or non numeric codes read as 0
        let code = root
            .get("hub_code")
            .and_then(Value::as_f64)
            .map(|n| n as i64)
            .unwrap_or(0);
        log::debug!("hub code {}", code);
        Ok(HubCommand::from_code(code))
    }

    /// Line sent to the mesh coordinator
    pub const fn uart_command(&self) -> &'static str {
        match self {
            HubCommand::IdentifyNode => r#"{"cmd":"emIdentNodeByName","args":["A"]}"#,
        }
    }
}

/// Writes `command` completely, looping over short writes
pub fn write_command<W: io::Write + ?Sized>(uart: &mut W, command: &str) -> Result<usize, CommandError> {
    uart.write_all(command.as_bytes())
        .map_err(|e| CommandError::UartWrite(e.kind()))?;
    log::debug!("sent {} bytes over UART", command.len());
    Ok(command.len())
}

/// Handles a direct method call, returns the command written to the UART if any
pub fn handle_direct_method<W: io::Write + ?Sized>(
    payload: &[u8],
    uart: &mut W,
) -> Result<Option<HubCommand>, CommandError> {
    let command = match HubCommand::from_payload(payload) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::warn!("ignoring direct method payload: {}", e);
            return Err(e);
        }
    };
    write_command(uart, command.uart_command())?;
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most 7 bytes per write
    struct ShortWriter(Vec<u8>);

    impl io::Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(7);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenUart;

    impl io::Write for BrokenUart {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "uart closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_identify_node_written_to_uart() {
        let mut uart = ShortWriter(Vec::new());
        let command = handle_direct_method(br#"{"hub_code":123}"#, &mut uart).unwrap();
        assert_eq!(command, Some(HubCommand::IdentifyNode));
        assert_eq!(uart.0, br#"{"cmd":"emIdentNodeByName","args":["A"]}"#.to_vec());
    }

    #[test]
    fn test_float_code_is_truncated() {
        assert_eq!(
            HubCommand::from_payload(br#"{"hub_code":123.0}"#),
            Ok(Some(HubCommand::IdentifyNode))
        );
    }

    #[test]
    fn test_unknown_code_writes_nothing() {
        let mut uart = Vec::new();
        assert_eq!(handle_direct_method(br#"{"hub_code":7}"#, &mut uart), Ok(None));
        assert_eq!(handle_direct_method(br#"{}"#, &mut uart), Ok(None));
        assert!(uart.is_empty());
    }

    #[test]
    fn test_invalid_payload() {
        let mut uart = Vec::new();
        assert_eq!(
            handle_direct_method(b"hub_code=123", &mut uart),
            Err(CommandError::InvalidJson)
        );
        assert!(uart.is_empty());
    }

    #[test]
    fn test_uart_write_error() {
        assert_eq!(
            handle_direct_method(br#"{"hub_code":123}"#, &mut BrokenUart),
            Err(CommandError::UartWrite(io::ErrorKind::BrokenPipe))
        );
    }
}
