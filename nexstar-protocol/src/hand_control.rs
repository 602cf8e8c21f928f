use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::angle::Precision;
use crate::command::{Axis, Command, Coordinates, Reply};
use crate::error::{NexStarError, Result};
use crate::location::{LatitudeDms, LongitudeDms};
use crate::model::{DeviceModel, DeviceType, TrackingMode};
use crate::protocol::{DEFAULT_TIMEOUT, TERMINATOR, find_terminator};
use crate::response::{Response, parse_response};
use crate::time::DeviceTime;
use crate::transport::Transport;

/// Upper bound on a single blocking read, so the deadline is re-checked.
const READ_SLICE: Duration = Duration::from_millis(100);

/// Configuration for a hand control connection.
#[derive(Debug, Clone)]
pub struct HandControlConfig {
    /// Time allowed for a complete reply.
    pub timeout: Duration,
    /// Query alignment before each goto and warn when unaligned.
    pub check_alignment: bool,
}

impl Default for HandControlConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            check_alignment: true,
        }
    }
}

/// Oldest anomalies are dropped once more than this many are held.
const ANOMALY_LIMIT: usize = 64;

/// Something worth reporting that did not fail the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolAnomaly {
    /// An acknowledgement carried a payload.
    NonEmptyAck {
        command: &'static str,
        response: Vec<u8>,
    },
    /// A goto was sent while the mount reported itself unaligned.
    GotoWhileUnaligned { command: &'static str },
}

impl fmt::Display for ProtocolAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEmptyAck { command, response } => write!(
                f,
                "expected an empty response to {command}! Actual response was {response:02X?}"
            ),
            Self::GotoWhileUnaligned { command } => write!(
                f,
                "telescope is not aligned - {command} may have unpredictable results"
            ),
        }
    }
}

/// A connection to a NexStar hand control.
///
/// Every operation is one request followed by one reply. The transport is
/// released by [`HandControl::close`] or on drop, whichever comes first.
pub struct HandControl {
    transport: Option<Box<dyn Transport>>,
    config: HandControlConfig,
    /// Bytes read but not yet consumed by a reply.
    buf: Vec<u8>,
    anomalies: Vec<ProtocolAnomaly>,
    tx_bytes: u64,
    rx_bytes: u64,
}

impl HandControl {
    pub fn new(transport: impl Transport + 'static, config: HandControlConfig) -> Self {
        Self {
            transport: Some(Box::new(transport)),
            config,
            buf: Vec::with_capacity(32),
            anomalies: Vec::new(),
            tx_bytes: 0,
            rx_bytes: 0,
        }
    }

    /// Open the named serial port with the default configuration.
    #[cfg(feature = "serial")]
    pub fn open(port_name: &str) -> Result<Self> {
        info!("opening serial port {port_name}");
        let transport = crate::transport::serial::SerialTransport::open(port_name)?;
        Ok(Self::new(transport, HandControlConfig::default()))
    }

    /// Find the port a hand control answers on and connect to it.
    #[cfg(feature = "serial")]
    pub fn auto_connect() -> Result<Self> {
        let port_name = crate::transport::serial::find_hand_control_port()?;
        Self::open(&port_name)
    }

    pub fn config(&self) -> &HandControlConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Anomalies recorded since the last [`HandControl::take_anomalies`],
    /// oldest first. Only the most recent ones are kept.
    pub fn anomalies(&self) -> &[ProtocolAnomaly] {
        &self.anomalies
    }

    pub fn take_anomalies(&mut self) -> Vec<ProtocolAnomaly> {
        std::mem::take(&mut self.anomalies)
    }

    /// Total bytes written to the transport.
    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes
    }

    /// Total bytes read from the transport.
    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes
    }

    /// Release the transport. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            info!("closing serial port");
            self.buf.clear();
            transport.flush()?;
        }
        Ok(())
    }

    // --- Raw access ---

    /// Write raw bytes without waiting for a reply.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(NexStarError::PortClosed)?;
        debug!("writing command {:02X?} to device", bytes);
        transport.write_all(bytes)?;
        transport.flush()?;
        self.tx_bytes += bytes.len() as u64;
        Ok(())
    }

    /// Write raw bytes and return the reply up to the first terminator,
    /// with the terminator stripped.
    pub fn query(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.exchange(bytes, Reply::Ascii)
    }

    /// Send a typed command and parse its reply.
    ///
    /// A non-empty acknowledgement is recorded as a [`ProtocolAnomaly`] and
    /// still returned.
    pub fn send_command(&mut self, command: &Command) -> Result<Response> {
        let request = command.to_bytes()?;
        let payload = self.exchange(&request, command.reply())?;
        let response = parse_response(&payload, command)?;
        if let Response::AckWithPayload(ref payload) = response {
            self.record(ProtocolAnomaly::NonEmptyAck {
                command: command.name(),
                response: payload.clone(),
            });
        }
        Ok(response)
    }

    fn record(&mut self, anomaly: ProtocolAnomaly) {
        warn!("{anomaly}");
        self.anomalies.push(anomaly);
        if self.anomalies.len() > ANOMALY_LIMIT {
            let excess = self.anomalies.len() - ANOMALY_LIMIT;
            self.anomalies.drain(..excess);
        }
    }

    fn exchange(&mut self, request: &[u8], reply: Reply) -> Result<Vec<u8>> {
        if !self.is_open() {
            return Err(NexStarError::PortClosed);
        }
        self.buf.clear();
        self.write(request)?;
        self.read_reply(reply)
    }

    /// Read until the reply terminator or the deadline.
    ///
    /// A binary reply shorter than expected never completes on its own; once
    /// the deadline passes, whatever ends in a terminator is returned so the
    /// decoder can report the length mismatch.
    fn read_reply(&mut self, reply: Reply) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            let end = find_terminator(&self.buf, reply).or_else(|| {
                (Instant::now() >= deadline)
                    .then(|| self.buf.iter().rposition(|&b| b == TERMINATOR))
                    .flatten()
            });

            if let Some(end) = end {
                let mut payload: Vec<u8> = self.buf.drain(..=end).collect();
                payload.pop();
                debug!("received response {:02X?} from device", payload);
                return Ok(payload);
            }

            if Instant::now() >= deadline {
                warn!("timeout waiting for response, got {:02X?}", self.buf);
                return Err(NexStarError::Timeout);
            }

            self.fill_buf(deadline)?;
        }
    }

    fn fill_buf(&mut self, deadline: Instant) -> Result<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }

        let transport = self.transport.as_mut().ok_or(NexStarError::PortClosed)?;
        transport.set_read_timeout(remaining.min(READ_SLICE))?;

        let mut tmp = [0u8; 64];
        match transport.read(&mut tmp) {
            Ok(n) => {
                if n > 0 {
                    trace!("read {} bytes: {:02X?}", n, &tmp[..n]);
                }
                self.buf.extend_from_slice(&tmp[..n]);
                self.rx_bytes += n as u64;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(()),
            Err(e) => Err(NexStarError::Io(e)),
        }
    }

    fn acknowledge(&mut self, command: &Command) -> Result<()> {
        match self.send_command(command)? {
            Response::Ack | Response::AckWithPayload(_) => Ok(()),
            other => Err(unexpected(command, other)),
        }
    }

    // --- Position ---

    fn get_position(&mut self, coords: Coordinates, precision: Precision) -> Result<(f64, f64)> {
        let command = Command::GetPosition(coords, precision);
        match self.send_command(&command)? {
            Response::Position(first, second) => Ok((first, second)),
            other => Err(unexpected(&command, other)),
        }
    }

    /// Current RA/Dec in degrees, 16-bit resolution.
    pub fn get_position_ra_dec(&mut self) -> Result<(f64, f64)> {
        self.get_position(Coordinates::RaDec, Precision::Coarse)
    }

    /// Current RA/Dec in degrees, 32-bit resolution.
    pub fn get_position_ra_dec_precise(&mut self) -> Result<(f64, f64)> {
        self.get_position(Coordinates::RaDec, Precision::Precise)
    }

    /// Current Azm/Alt in degrees, 16-bit resolution.
    pub fn get_position_azm_alt(&mut self) -> Result<(f64, f64)> {
        self.get_position(Coordinates::AzmAlt, Precision::Coarse)
    }

    /// Current Azm/Alt in degrees, 32-bit resolution.
    pub fn get_position_azm_alt_precise(&mut self) -> Result<(f64, f64)> {
        self.get_position(Coordinates::AzmAlt, Precision::Precise)
    }

    fn goto(&mut self, coords: Coordinates, precision: Precision, first: f64, second: f64) -> Result<()> {
        let command = Command::Goto(coords, precision, first, second);
        if self.config.check_alignment && !self.is_aligned()? {
            self.record(ProtocolAnomaly::GotoWhileUnaligned {
                command: command.name(),
            });
        }
        self.acknowledge(&command)
    }

    pub fn goto_ra_dec(&mut self, ra: f64, dec: f64) -> Result<()> {
        self.goto(Coordinates::RaDec, Precision::Coarse, ra, dec)
    }

    pub fn goto_ra_dec_precise(&mut self, ra: f64, dec: f64) -> Result<()> {
        self.goto(Coordinates::RaDec, Precision::Precise, ra, dec)
    }

    pub fn goto_azm_alt(&mut self, azm: f64, alt: f64) -> Result<()> {
        self.goto(Coordinates::AzmAlt, Precision::Coarse, azm, alt)
    }

    pub fn goto_azm_alt_precise(&mut self, azm: f64, alt: f64) -> Result<()> {
        self.goto(Coordinates::AzmAlt, Precision::Precise, azm, alt)
    }

    /// Tell the mount it is pointing at the given RA/Dec.
    pub fn sync_ra_dec(&mut self, ra: f64, dec: f64) -> Result<()> {
        self.acknowledge(&Command::SyncRaDec(Precision::Coarse, ra, dec))
    }

    pub fn sync_ra_dec_precise(&mut self, ra: f64, dec: f64) -> Result<()> {
        self.acknowledge(&Command::SyncRaDec(Precision::Precise, ra, dec))
    }

    // --- Slewing ---

    /// Slew the azimuth axis at `rate` arcseconds/second (negative reverses).
    pub fn slew_azm_variable(&mut self, rate: i32) -> Result<()> {
        self.acknowledge(&Command::SlewVariable(Axis::Azimuth, rate))
    }

    /// Slew the altitude axis at `rate` arcseconds/second (negative reverses).
    pub fn slew_alt_variable(&mut self, rate: i32) -> Result<()> {
        self.acknowledge(&Command::SlewVariable(Axis::Altitude, rate))
    }

    /// Slew both axes. Both rates are checked before anything is sent.
    pub fn slew_variable(&mut self, azm_rate: i32, alt_rate: i32) -> Result<()> {
        let azm = Command::SlewVariable(Axis::Azimuth, azm_rate);
        let alt = Command::SlewVariable(Axis::Altitude, alt_rate);
        azm.to_bytes()?;
        alt.to_bytes()?;
        self.acknowledge(&azm)?;
        self.acknowledge(&alt)
    }

    /// Slew the azimuth axis at fixed rate -9..=9.
    pub fn slew_azm_fixed(&mut self, rate: i32) -> Result<()> {
        self.acknowledge(&Command::SlewFixed(Axis::Azimuth, rate))
    }

    /// Slew the altitude axis at fixed rate -9..=9.
    pub fn slew_alt_fixed(&mut self, rate: i32) -> Result<()> {
        self.acknowledge(&Command::SlewFixed(Axis::Altitude, rate))
    }

    /// Slew both axes at fixed rates. Both rates are checked before anything
    /// is sent.
    pub fn slew_fixed(&mut self, azm_rate: i32, alt_rate: i32) -> Result<()> {
        let azm = Command::SlewFixed(Axis::Azimuth, azm_rate);
        let alt = Command::SlewFixed(Axis::Altitude, alt_rate);
        azm.to_bytes()?;
        alt.to_bytes()?;
        self.acknowledge(&azm)?;
        self.acknowledge(&alt)
    }

    pub fn slew_stop(&mut self) -> Result<()> {
        self.slew_fixed(0, 0)
    }

    // --- Location and time ---

    pub fn get_location(&mut self) -> Result<(LatitudeDms, LongitudeDms)> {
        let command = Command::GetLocation;
        match self.send_command(&command)? {
            Response::Location(lat, lon) => Ok((lat, lon)),
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn set_location(&mut self, lat: LatitudeDms, lon: LongitudeDms) -> Result<()> {
        self.acknowledge(&Command::SetLocation(lat, lon))
    }

    pub fn get_time(&mut self) -> Result<DeviceTime> {
        let command = Command::GetTime;
        match self.send_command(&command)? {
            Response::Time(time) => {
                if time.daylight_saving() {
                    info!("daylight saving time is active on the device");
                }
                Ok(time)
            }
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn set_time(&mut self, time: &DeviceTime) -> Result<()> {
        if time.daylight_saving() {
            info!("setting device time with daylight saving time active");
        }
        self.acknowledge(&Command::SetTime(*time))
    }

    // --- Status ---

    pub fn get_tracking_mode(&mut self) -> Result<TrackingMode> {
        let command = Command::GetTrackingMode;
        match self.send_command(&command)? {
            Response::TrackingMode(mode) => Ok(mode),
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn set_tracking_mode(&mut self, mode: TrackingMode) -> Result<()> {
        self.acknowledge(&Command::SetTrackingMode(mode))
    }

    /// Firmware version of a motor or accessory as `(major, minor)`.
    pub fn get_device_version(&mut self, device: DeviceType) -> Result<(u8, u8)> {
        let command = Command::GetDeviceVersion(device);
        match self.send_command(&command)? {
            Response::DeviceVersion(major, minor) => Ok((major, minor)),
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn get_device_model(&mut self) -> Result<DeviceModel> {
        let command = Command::GetDeviceModel;
        match self.send_command(&command)? {
            Response::DeviceModel(model) => Ok(model),
            other => Err(unexpected(&command, other)),
        }
    }

    /// Whether the hand control echoes the probe byte back.
    pub fn is_connected(&mut self) -> Result<bool> {
        let command = Command::IsConnected;
        match self.send_command(&command)? {
            Response::Connected(connected) => Ok(connected),
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn is_aligned(&mut self) -> Result<bool> {
        let command = Command::IsAligned;
        match self.send_command(&command)? {
            Response::Aligned(aligned) => Ok(aligned),
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn is_goto_in_progress(&mut self) -> Result<bool> {
        let command = Command::IsGotoInProgress;
        match self.send_command(&command)? {
            Response::GotoInProgress(in_progress) => Ok(in_progress),
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn cancel_goto(&mut self) -> Result<()> {
        self.acknowledge(&Command::CancelGoto)
    }
}

impl Drop for HandControl {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing serial port: {e}");
        }
    }
}

fn unexpected(command: &Command, response: Response) -> NexStarError {
    warn!("unexpected response to {}: {:?}", command.name(), response);
    NexStarError::UnexpectedResponse {
        command: command.name(),
    }
}
