use std::io::{self, BufRead};
use std::process;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sensor_gateway_serial::cloud::method::handle_direct_method;
use sensor_gateway_serial::cloud::twin::{StatusLed, TwinHandler};
use sensor_gateway_serial::cloud::{JsonPublisher, LineTransport};
use sensor_gateway_serial::config::{self, GatewayConfig};
use sensor_gateway_serial::serial::{ChunkReader, ReadError, DEFAULT_READ_RETRY_LIMIT};
use sensor_gateway_serial::Gateway;

/// Reads the sensor mesh coordinator's UART and prints one telemetry event per line.
///
/// Cloud commands are taken from stdin, one per line: `method <json>` or `twin <json>`.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port of the mesh coordinator
    #[arg(short, long, default_value = config::DEFAULT_PORT)]
    port: String,

    #[arg(short, long, default_value_t = config::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Timeout of a single read in milliseconds
    #[arg(long, default_value_t = 10)]
    timeout_ms: u64,

    /// Empty reads tolerated before a poll gives up
    #[arg(long, default_value_t = DEFAULT_READ_RETRY_LIMIT)]
    retry_limit: u32,
}

impl From<Args> for GatewayConfig {
    fn from(args: Args) -> Self {
        GatewayConfig {
            port: args.port,
            baud_rate: args.baud,
            read_timeout: Duration::from_millis(args.timeout_ms),
            read_retry_limit: args.retry_limit,
        }
    }
}

/// Board status LED, there is none on the host so its state is logged
struct LoggedLed;

impl StatusLed for LoggedLed {
    fn set(&mut self, on: bool) {
        log::info!("status LED {}", if on { "on" } else { "off" });
    }
}

/// Handles cloud commands read from stdin until it closes
fn run_commands<W: io::Write>(mut uart: W) {
    let mut twin = TwinHandler::new(LoggedLed);
    let mut transport = LineTransport::new(io::stdout());
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("stopped reading commands: {}", e);
                return;
            }
        };
        let (kind, payload) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
        let result = match kind {
            "method" => handle_direct_method(payload.as_bytes(), &mut uart).map(|command| {
                log::info!("direct method handled: {:?}", command);
            }),
            "twin" => twin.handle(payload.as_bytes(), &mut transport).map(|updated| {
                log::info!("twin update applied to {:?}", updated);
            }),
            "" => Ok(()),
            other => {
                log::warn!("unknown command '{}'", other);
                Ok(())
            }
        };
        if let Err(e) = result {
            log::warn!("command failed: {}", e);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = GatewayConfig::from(Args::parse());
    if let Err(e) = config.validate() {
        log::error!("invalid configuration: {}", e);
        process::exit(2);
    }

    let port = match serialport::new(config.port.as_str(), config.baud_rate)
        .timeout(config.read_timeout)
        .open()
    {
        Ok(port) => port,
        Err(e) => {
            log::error!("failed to open \"{}\": {}", config.port, e);
            process::exit(1);
        }
    };
    log::info!(
        "listening on {} at {} baud, idle poll up to {:?}",
        config.port,
        config.baud_rate,
        config.max_idle()
    );

    match port.try_clone() {
        Ok(uart) => {
            thread::spawn(move || run_commands(uart));
        }
        Err(e) => log::warn!("no command input, could not clone the port: {}", e),
    }

    let mut reader: ChunkReader<_> = ChunkReader::with_retry_limit(port, config.read_retry_limit);
    let mut gateway: Gateway<_> = Gateway::new(JsonPublisher::new(LineTransport::new(io::stdout())));

    loop {
        let result = reader.poll(|chunk| {
            gateway.process_bytes(chunk);
        });
        match result {
            Ok(_) => (),
            Err(ReadError::RetriesExhausted(n)) => {
                log::debug!("UART idle after {} reads, stats {:?}", n, gateway.stats())
            }
            Err(e) => {
                log::error!("{}", e);
                process::exit(1);
            }
        }
    }
}
