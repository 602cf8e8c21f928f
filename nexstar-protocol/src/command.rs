use crate::angle::{Precision, encode_angle};
use crate::error::{NexStarError, Result};
use crate::location::{LatitudeDms, LongitudeDms};
use crate::model::{DeviceType, TrackingMode};
use crate::time::DeviceTime;

/// Hand control command bytes.
pub mod cmd {
    /// Get RA/Dec (16-bit).
    pub const GET_RA_DEC: u8 = b'E';
    /// Get RA/Dec (32-bit).
    pub const GET_RA_DEC_PRECISE: u8 = b'e';
    /// Get Azm/Alt (16-bit).
    pub const GET_AZM_ALT: u8 = b'Z';
    /// Get Azm/Alt (32-bit).
    pub const GET_AZM_ALT_PRECISE: u8 = b'z';
    pub const GOTO_RA_DEC: u8 = b'R';
    pub const GOTO_RA_DEC_PRECISE: u8 = b'r';
    pub const GOTO_AZM_ALT: u8 = b'B';
    pub const GOTO_AZM_ALT_PRECISE: u8 = b'b';
    pub const SYNC_RA_DEC: u8 = b'S';
    pub const SYNC_RA_DEC_PRECISE: u8 = b's';
    /// Pass-through to a motor or accessory (slew, version).
    pub const PASS_THROUGH: u8 = b'P';
    pub const GET_LOCATION: u8 = b'w';
    pub const SET_LOCATION: u8 = b'W';
    pub const GET_TIME: u8 = b'h';
    pub const SET_TIME: u8 = b'H';
    pub const GET_TRACKING_MODE: u8 = b't';
    pub const SET_TRACKING_MODE: u8 = b'T';
    pub const GET_MODEL: u8 = b'm';
    /// Echo the following byte back.
    pub const ECHO: u8 = b'K';
    pub const IS_ALIGNED: u8 = b'J';
    pub const IS_GOTO_IN_PROGRESS: u8 = b'L';
    pub const CANCEL_GOTO: u8 = b'M';
}

/// Pass-through sub-commands and direction bytes.
pub mod pass_through {
    /// Message length byte for a device version query.
    pub const VERSION: u8 = 1;
    /// Message length byte for a fixed-rate slew.
    pub const FIXED_SLEW: u8 = 2;
    /// Message length byte for a variable-rate slew.
    pub const VARIABLE_SLEW: u8 = 3;
    /// Motor command: get firmware version.
    pub const GET_VERSION: u8 = 0xFE;
    pub const VARIABLE_POSITIVE: u8 = 6;
    pub const VARIABLE_NEGATIVE: u8 = 7;
    pub const FIXED_POSITIVE: u8 = 36;
    pub const FIXED_NEGATIVE: u8 = 37;
    /// Number of reply bytes requested from a version query.
    pub const VERSION_REPLY_LEN: u8 = 2;
}

/// Byte echoed back by a connected hand control.
pub const ECHO_PROBE: u8 = b'x';

/// Largest magnitude accepted by a variable-rate slew, in arcseconds/second.
pub const MAX_VARIABLE_RATE: i32 = 16_384;
/// Largest magnitude accepted by a fixed-rate slew.
pub const MAX_FIXED_RATE: i32 = 9;

/// Motor axis targeted by a slew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Azimuth or right ascension.
    Azimuth = 16,
    /// Altitude or declination.
    Altitude = 17,
}

impl Axis {
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Coordinate frame of a position command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coordinates {
    /// Right ascension / declination.
    RaDec,
    /// Azimuth / altitude.
    AzmAlt,
}

/// Shape of the payload a command answers with, before the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// No payload, just the terminator.
    Empty,
    /// Printable text that never contains the terminator.
    Ascii,
    /// Raw bytes of a fixed length, which may include the terminator value.
    Binary(usize),
}

/// A command to send to the hand control.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetPosition(Coordinates, Precision),
    /// Goto a position in decimal degrees.
    Goto(Coordinates, Precision, f64, f64),
    /// Sync the current position to the given RA/Dec.
    SyncRaDec(Precision, f64, f64),
    /// Slew one axis at a variable rate in arcseconds/second.
    SlewVariable(Axis, i32),
    /// Slew one axis at a fixed rate (0 stops the axis).
    SlewFixed(Axis, i32),
    GetLocation,
    SetLocation(LatitudeDms, LongitudeDms),
    GetTime,
    SetTime(DeviceTime),
    GetTrackingMode,
    SetTrackingMode(TrackingMode),
    GetDeviceVersion(DeviceType),
    GetDeviceModel,
    IsConnected,
    IsAligned,
    IsGotoInProgress,
    CancelGoto,
}

impl Command {
    /// Encode this command into the bytes sent to the hand control.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Command::GetPosition(coords, precision) => {
                let letter = match (coords, precision) {
                    (Coordinates::RaDec, Precision::Coarse) => cmd::GET_RA_DEC,
                    (Coordinates::RaDec, Precision::Precise) => cmd::GET_RA_DEC_PRECISE,
                    (Coordinates::AzmAlt, Precision::Coarse) => cmd::GET_AZM_ALT,
                    (Coordinates::AzmAlt, Precision::Precise) => cmd::GET_AZM_ALT_PRECISE,
                };
                vec![letter]
            }
            Command::Goto(coords, precision, first, second) => {
                let letter = match (coords, precision) {
                    (Coordinates::RaDec, Precision::Coarse) => cmd::GOTO_RA_DEC,
                    (Coordinates::RaDec, Precision::Precise) => cmd::GOTO_RA_DEC_PRECISE,
                    (Coordinates::AzmAlt, Precision::Coarse) => cmd::GOTO_AZM_ALT,
                    (Coordinates::AzmAlt, Precision::Precise) => cmd::GOTO_AZM_ALT_PRECISE,
                };
                position_bytes(letter, *precision, *first, *second)
            }
            Command::SyncRaDec(precision, ra, dec) => {
                let letter = match precision {
                    Precision::Coarse => cmd::SYNC_RA_DEC,
                    Precision::Precise => cmd::SYNC_RA_DEC_PRECISE,
                };
                position_bytes(letter, *precision, *ra, *dec)
            }
            Command::SlewVariable(axis, rate) => {
                let (dir, hi, lo) = variable_slew_rate(*rate)?;
                let hi = u8::try_from(hi)
                    .map_err(|_| NexStarError::out_of_range("Slew rate high byte", hi, 0, 255))?;
                vec![
                    cmd::PASS_THROUGH,
                    pass_through::VARIABLE_SLEW,
                    axis.to_byte(),
                    dir,
                    hi,
                    lo,
                    0,
                    0,
                ]
            }
            Command::SlewFixed(axis, rate) => {
                let (dir, magnitude) = fixed_slew_rate(*rate)?;
                vec![
                    cmd::PASS_THROUGH,
                    pass_through::FIXED_SLEW,
                    axis.to_byte(),
                    dir,
                    magnitude,
                    0,
                    0,
                    0,
                ]
            }
            Command::GetLocation => vec![cmd::GET_LOCATION],
            Command::SetLocation(lat, lon) => {
                let mut bytes = Vec::with_capacity(9);
                bytes.push(cmd::SET_LOCATION);
                bytes.extend_from_slice(&lat.to_bytes());
                bytes.extend_from_slice(&lon.to_bytes());
                bytes
            }
            Command::GetTime => vec![cmd::GET_TIME],
            Command::SetTime(time) => {
                let mut bytes = Vec::with_capacity(9);
                bytes.push(cmd::SET_TIME);
                bytes.extend_from_slice(&time.to_bytes()?);
                bytes
            }
            Command::GetTrackingMode => vec![cmd::GET_TRACKING_MODE],
            Command::SetTrackingMode(mode) => vec![cmd::SET_TRACKING_MODE, mode.to_byte()],
            Command::GetDeviceVersion(device) => vec![
                cmd::PASS_THROUGH,
                pass_through::VERSION,
                device.to_byte(),
                pass_through::GET_VERSION,
                0,
                0,
                0,
                pass_through::VERSION_REPLY_LEN,
            ],
            Command::GetDeviceModel => vec![cmd::GET_MODEL],
            Command::IsConnected => vec![cmd::ECHO, ECHO_PROBE],
            Command::IsAligned => vec![cmd::IS_ALIGNED],
            Command::IsGotoInProgress => vec![cmd::IS_GOTO_IN_PROGRESS],
            Command::CancelGoto => vec![cmd::CANCEL_GOTO],
        };
        Ok(bytes)
    }

    /// Shape of the reply this command expects.
    pub fn reply(&self) -> Reply {
        match self {
            Command::GetPosition(..) | Command::IsConnected | Command::IsGotoInProgress => {
                Reply::Ascii
            }
            Command::GetLocation | Command::GetTime => Reply::Binary(8),
            Command::GetDeviceVersion(_) => Reply::Binary(2),
            Command::GetTrackingMode | Command::GetDeviceModel | Command::IsAligned => {
                Reply::Binary(1)
            }
            Command::Goto(..)
            | Command::SyncRaDec(..)
            | Command::SlewVariable(..)
            | Command::SlewFixed(..)
            | Command::SetLocation(..)
            | Command::SetTime(_)
            | Command::SetTrackingMode(_)
            | Command::CancelGoto => Reply::Empty,
        }
    }

    /// Short human-readable name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetPosition(Coordinates::RaDec, _) => "get RA/Dec",
            Command::GetPosition(Coordinates::AzmAlt, _) => "get Azm/Alt",
            Command::Goto(Coordinates::RaDec, ..) => "goto RA/Dec",
            Command::Goto(Coordinates::AzmAlt, ..) => "goto Azm/Alt",
            Command::SyncRaDec(..) => "sync RA/Dec",
            Command::SlewVariable(..) => "variable slew",
            Command::SlewFixed(..) => "fixed slew",
            Command::GetLocation => "get location",
            Command::SetLocation(..) => "set location",
            Command::GetTime => "get time",
            Command::SetTime(_) => "set time",
            Command::GetTrackingMode => "get tracking mode",
            Command::SetTrackingMode(_) => "set tracking mode",
            Command::GetDeviceVersion(_) => "get device version",
            Command::GetDeviceModel => "get device model",
            Command::IsConnected => "echo",
            Command::IsAligned => "alignment check",
            Command::IsGotoInProgress => "goto in progress check",
            Command::CancelGoto => "cancel goto",
        }
    }
}

fn position_bytes(letter: u8, precision: Precision, first: f64, second: f64) -> Vec<u8> {
    let mut bytes = vec![letter];
    bytes.extend_from_slice(encode_angle(first, precision).as_bytes());
    bytes.push(b',');
    bytes.extend_from_slice(encode_angle(second, precision).as_bytes());
    bytes
}

/// Split a variable slew rate into `(direction, high, low)`.
///
/// The magnitude is scaled by four before being split into bytes. `high` is
/// returned unclamped, so the largest rate yields `(6, 256, 0)`, which cannot
/// be sent.
pub fn variable_slew_rate(rate: i32) -> Result<(u8, u16, u8)> {
    if !(-MAX_VARIABLE_RATE..=MAX_VARIABLE_RATE).contains(&rate) {
        return Err(NexStarError::out_of_range(
            "Slew rate",
            rate,
            -MAX_VARIABLE_RATE,
            MAX_VARIABLE_RATE,
        ));
    }
    let dir = if rate >= 0 {
        pass_through::VARIABLE_POSITIVE
    } else {
        pass_through::VARIABLE_NEGATIVE
    };
    let scaled = rate.unsigned_abs() * 4;
    Ok((dir, (scaled / 256) as u16, (scaled % 256) as u8))
}

/// Split a fixed slew rate into `(direction, magnitude)`.
pub fn fixed_slew_rate(rate: i32) -> Result<(u8, u8)> {
    if !(-MAX_FIXED_RATE..=MAX_FIXED_RATE).contains(&rate) {
        return Err(NexStarError::out_of_range(
            "Slew rate",
            rate,
            -MAX_FIXED_RATE,
            MAX_FIXED_RATE,
        ));
    }
    let dir = if rate >= 0 {
        pass_through::FIXED_POSITIVE
    } else {
        pass_through::FIXED_NEGATIVE
    };
    Ok((dir, rate.unsigned_abs() as u8))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::location::{LatitudeDirection, LongitudeDirection};

    #[test]
    fn test_get_position_letters() {
        let cases = [
            (Coordinates::RaDec, Precision::Coarse, b'E'),
            (Coordinates::RaDec, Precision::Precise, b'e'),
            (Coordinates::AzmAlt, Precision::Coarse, b'Z'),
            (Coordinates::AzmAlt, Precision::Precise, b'z'),
        ];
        for (coords, precision, letter) in cases {
            let bytes = Command::GetPosition(coords, precision).to_bytes().unwrap();
            assert_eq!(bytes, vec![letter]);
        }
    }

    #[test]
    fn test_goto_ra_dec() {
        let bytes = Command::Goto(Coordinates::RaDec, Precision::Coarse, 90.0, 180.0)
            .to_bytes()
            .unwrap();
        assert_eq!(bytes, b"R4000,8000");
        let bytes = Command::Goto(Coordinates::RaDec, Precision::Precise, 90.0, 180.0)
            .to_bytes()
            .unwrap();
        assert_eq!(bytes, b"r40000000,80000000");
    }

    #[test]
    fn test_goto_azm_alt() {
        let bytes = Command::Goto(Coordinates::AzmAlt, Precision::Coarse, 180.0, 90.0)
            .to_bytes()
            .unwrap();
        assert_eq!(bytes, b"B8000,4000");
        let bytes = Command::Goto(Coordinates::AzmAlt, Precision::Precise, 180.0, 90.0)
            .to_bytes()
            .unwrap();
        assert_eq!(bytes, b"b80000000,40000000");
    }

    #[test]
    fn test_sync() {
        let bytes = Command::SyncRaDec(Precision::Coarse, 180.0, 90.0).to_bytes().unwrap();
        assert_eq!(bytes, b"S8000,4000");
        let bytes = Command::SyncRaDec(Precision::Precise, 180.0, 90.0).to_bytes().unwrap();
        assert_eq!(bytes, b"s80000000,40000000");
    }

    #[test]
    fn test_variable_slew_rate() {
        assert_eq!(variable_slew_rate(1000).unwrap(), (6, 15, 160));
        assert_eq!(variable_slew_rate(-1000).unwrap(), (7, 15, 160));
        assert_eq!(variable_slew_rate(0).unwrap(), (6, 0, 0));
        assert_eq!(variable_slew_rate(16384).unwrap(), (6, 256, 0));
        assert!(matches!(
            variable_slew_rate(16385),
            Err(NexStarError::OutOfRange { what: "Slew rate", .. })
        ));
        assert!(variable_slew_rate(-16385).is_err());
    }

    #[test]
    fn test_variable_slew_frames() {
        let azm = Command::SlewVariable(Axis::Azimuth, 1000).to_bytes().unwrap();
        assert_eq!(azm, vec![80, 3, 16, 6, 15, 160, 0, 0]);
        let alt = Command::SlewVariable(Axis::Altitude, -500).to_bytes().unwrap();
        assert_eq!(alt, vec![80, 3, 17, 7, 7, 208, 0, 0]);
    }

    #[test]
    fn test_variable_slew_full_rate_does_not_fit() {
        assert!(matches!(
            Command::SlewVariable(Axis::Azimuth, 16384).to_bytes(),
            Err(NexStarError::OutOfRange { what: "Slew rate high byte", .. })
        ));
        let bytes = Command::SlewVariable(Axis::Azimuth, -16383).to_bytes().unwrap();
        assert_eq!(bytes, vec![80, 3, 16, 7, 255, 252, 0, 0]);
    }

    #[test]
    fn test_fixed_slew_frames() {
        assert_eq!(
            Command::SlewFixed(Axis::Azimuth, -5).to_bytes().unwrap(),
            vec![80, 2, 16, 37, 5, 0, 0, 0]
        );
        assert_eq!(
            Command::SlewFixed(Axis::Altitude, 3).to_bytes().unwrap(),
            vec![80, 2, 17, 36, 3, 0, 0, 0]
        );
        assert_eq!(
            Command::SlewFixed(Axis::Altitude, 0).to_bytes().unwrap(),
            vec![80, 2, 17, 36, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_fixed_slew_range() {
        assert_eq!(fixed_slew_rate(9).unwrap(), (36, 9));
        assert_eq!(fixed_slew_rate(-9).unwrap(), (37, 9));
        assert!(matches!(
            Command::SlewFixed(Axis::Azimuth, 10).to_bytes(),
            Err(NexStarError::OutOfRange { .. })
        ));
        assert!(fixed_slew_rate(-10).is_err());
    }

    #[test]
    fn test_set_tracking_mode() {
        let bytes = Command::SetTrackingMode(TrackingMode::AltAz).to_bytes().unwrap();
        assert_eq!(bytes, vec![84, 1]);
    }

    #[test]
    fn test_device_version() {
        let bytes = Command::GetDeviceVersion(DeviceType::GpsUnit).to_bytes().unwrap();
        assert_eq!(bytes, vec![80, 1, 176, 0xFE, 0, 0, 0, 2]);
    }

    #[test]
    fn test_set_location() {
        let lat = LatitudeDms::new(45, 30, 0, LatitudeDirection::South).unwrap();
        let lon = LongitudeDms::new(120, 45, 0, LongitudeDirection::East).unwrap();
        let bytes = Command::SetLocation(lat, lon).to_bytes().unwrap();
        assert_eq!(bytes, vec![87, 45, 30, 0, 1, 120, 45, 0, 0]);
    }

    #[test]
    fn test_set_time() {
        let dt = FixedOffset::east_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 5, 17, 15, 30, 45)
            .unwrap();
        let bytes = Command::SetTime(DeviceTime::new(dt, true)).to_bytes().unwrap();
        assert_eq!(bytes, b"H\x0f\x1e-\x05\x11\x17\x05\x01");
    }

    #[test]
    fn test_literal_commands() {
        assert_eq!(Command::IsConnected.to_bytes().unwrap(), b"Kx");
        assert_eq!(Command::IsAligned.to_bytes().unwrap(), b"J");
        assert_eq!(Command::IsGotoInProgress.to_bytes().unwrap(), b"L");
        assert_eq!(Command::CancelGoto.to_bytes().unwrap(), b"M");
        assert_eq!(Command::GetDeviceModel.to_bytes().unwrap(), b"m");
        assert_eq!(Command::GetTime.to_bytes().unwrap(), b"h");
        assert_eq!(Command::GetLocation.to_bytes().unwrap(), b"w");
        assert_eq!(Command::GetTrackingMode.to_bytes().unwrap(), b"t");
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(Command::GetLocation.reply(), Reply::Binary(8));
        assert_eq!(Command::GetDeviceVersion(DeviceType::Rtc).reply(), Reply::Binary(2));
        assert_eq!(Command::IsAligned.reply(), Reply::Binary(1));
        assert_eq!(Command::IsGotoInProgress.reply(), Reply::Ascii);
        assert_eq!(Command::CancelGoto.reply(), Reply::Empty);
        assert_eq!(
            Command::GetPosition(Coordinates::AzmAlt, Precision::Precise).reply(),
            Reply::Ascii
        );
    }
}
