use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::command::Command;
use crate::error::{NexStarError, Result};
use crate::protocol::{BAUD_RATE, DEFAULT_TIMEOUT, TERMINATOR};

use super::Transport;

const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;
const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
const PARITY: serialport::Parity = serialport::Parity::None;

/// How long a candidate port gets to answer the echo probe.
const PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// A hand control on a native serial port, opened at 9600 8N1.
pub struct SerialTransport {
    name: String,
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(port_name: &str) -> Result<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(DATA_BITS)
            .stop_bits(STOP_BITS)
            .parity(PARITY)
            .timeout(DEFAULT_TIMEOUT)
            .open()?;

        info!("opened {port_name} at {BAUD_RATE} baud");
        Ok(Self {
            name: port_name.to_string(),
            port,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::other)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        debug!("discarding unread input on {}", self.name);
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }
}

/// Names of all serial ports on this machine.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Find the serial port a hand control is attached to.
///
/// Opens every available port in turn, sends the echo probe and returns the
/// first port that answers it.
pub fn find_hand_control_port() -> Result<String> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        warn!("no serial ports found");
        return Err(NexStarError::PortNotFound);
    }

    for port in &ports {
        debug!("probing {} ({:?})", port.port_name, port.port_type);
        match probe(&port.port_name) {
            Ok(true) => {
                info!("found hand control on {}", port.port_name);
                return Ok(port.port_name.clone());
            }
            Ok(false) => debug!("no echo from {}", port.port_name),
            Err(e) => debug!("skipping {}: {}", port.port_name, e),
        }
    }

    warn!("hand control not found among {} port(s):", ports.len());
    for port in &ports {
        warn!("  {} ({:?})", port.port_name, port.port_type);
    }
    Err(NexStarError::PortNotFound)
}

/// Send the echo probe and check for `x#`.
fn probe(port_name: &str) -> Result<bool> {
    let mut transport = SerialTransport::open(port_name)?;
    let _ = transport.clear_input();

    let request = Command::IsConnected.to_bytes()?;
    transport.write_all(&request)?;
    transport.flush()?;

    let mut accumulated = Vec::new();
    let mut buf = [0u8; 16];
    let deadline = Instant::now() + PROBE_TIMEOUT;

    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        transport.set_read_timeout(remaining.min(Duration::from_millis(100)))?;
        match transport.read(&mut buf) {
            Ok(n) if n > 0 => {
                accumulated.extend_from_slice(&buf[..n]);
                if accumulated.contains(&TERMINATOR) {
                    return Ok(accumulated.starts_with(b"x#"));
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(false)
}
