use crate::angle::{Precision, decode_angle};
use crate::command::{Command, ECHO_PROBE};
use crate::error::{NexStarError, Result};
use crate::location::{LatitudeDms, LongitudeDms};
use crate::model::{DeviceModel, TrackingMode};
use crate::time::DeviceTime;

/// Alignment flag value meaning "aligned".
const ALIGNED: u8 = 0x01;

/// A typed reply from the hand control, terminator already stripped.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Empty acknowledgement.
    Ack,
    /// Acknowledgement that unexpectedly carried a payload.
    AckWithPayload(Vec<u8>),
    /// Two angles in decimal degrees (RA/Dec or Azm/Alt).
    Position(f64, f64),
    Location(LatitudeDms, LongitudeDms),
    Time(DeviceTime),
    TrackingMode(TrackingMode),
    /// Firmware version as `(major, minor)`.
    DeviceVersion(u8, u8),
    DeviceModel(DeviceModel),
    Connected(bool),
    Aligned(bool),
    GotoInProgress(bool),
}

/// Parse a reply payload into a typed `Response`, using the `Command` that
/// was sent to pick the decoder.
pub fn parse_response(payload: &[u8], command: &Command) -> Result<Response> {
    match command {
        Command::GetPosition(_, precision) => parse_position(payload, command, *precision),
        Command::GetLocation => {
            let bytes: [u8; 8] = exact(payload, command)?;
            let lat = LatitudeDms::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])?;
            let lon = LongitudeDms::from_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])?;
            Ok(Response::Location(lat, lon))
        }
        Command::GetTime => {
            let bytes: [u8; 8] = exact(payload, command)?;
            Ok(Response::Time(DeviceTime::from_bytes(bytes)?))
        }
        Command::GetTrackingMode => {
            let [mode]: [u8; 1] = exact(payload, command)?;
            Ok(Response::TrackingMode(TrackingMode::from_byte(mode)?))
        }
        Command::GetDeviceVersion(_) => {
            let [major, minor]: [u8; 2] = exact(payload, command)?;
            Ok(Response::DeviceVersion(major, minor))
        }
        Command::GetDeviceModel => {
            let [code]: [u8; 1] = exact(payload, command)?;
            Ok(Response::DeviceModel(DeviceModel::from_byte(code)?))
        }
        Command::IsConnected => {
            let [echo]: [u8; 1] = exact(payload, command)?;
            Ok(Response::Connected(echo == ECHO_PROBE))
        }
        Command::IsAligned => {
            let [flag]: [u8; 1] = exact(payload, command)?;
            Ok(Response::Aligned(flag == ALIGNED))
        }
        Command::IsGotoInProgress => {
            // ASCII digit, unlike the raw alignment flag.
            let [flag]: [u8; 1] = exact(payload, command)?;
            Ok(Response::GotoInProgress(flag == b'1'))
        }
        Command::Goto(..)
        | Command::SyncRaDec(..)
        | Command::SlewVariable(..)
        | Command::SlewFixed(..)
        | Command::SetLocation(..)
        | Command::SetTime(_)
        | Command::SetTrackingMode(_)
        | Command::CancelGoto => {
            if payload.is_empty() {
                Ok(Response::Ack)
            } else {
                Ok(Response::AckWithPayload(payload.to_vec()))
            }
        }
    }
}

/// Check the payload length and copy it into a fixed array.
fn exact<const N: usize>(payload: &[u8], command: &Command) -> Result<[u8; N]> {
    payload
        .try_into()
        .map_err(|_| malformed(payload, command, N))
}

fn malformed(payload: &[u8], command: &Command, expected: usize) -> NexStarError {
    NexStarError::MalformedResponse {
        command: command.name(),
        expected,
        actual: payload.len(),
        response: payload.to_vec(),
    }
}

/// Parse `XXXX,YYYY` or `XXXXXXXX,YYYYYYYY` into two angles.
fn parse_position(payload: &[u8], command: &Command, precision: Precision) -> Result<Response> {
    if payload.len() != precision.position_len() {
        return Err(malformed(payload, command, precision.position_len()));
    }
    let digits = precision.hex_digits();
    if payload[digits] != b',' {
        return Err(NexStarError::InvalidPosition(format!(
            "expected ',' at offset {digits} in {payload:02X?}"
        )));
    }
    let first = decode_angle(&payload[..digits], precision)?;
    let second = decode_angle(&payload[digits + 1..], precision)?;
    Ok(Response::Position(first, second))
}
