use std::fmt;

use crate::angle::to_dms;
use crate::error::{NexStarError, Result};

/// Hemisphere of a latitude. The discriminant is the wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatitudeDirection {
    North = 0,
    South = 1,
}

/// Hemisphere of a longitude. The discriminant is the wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LongitudeDirection {
    East = 0,
    West = 1,
}

impl LatitudeDirection {
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::North),
            1 => Ok(Self::South),
            _ => Err(NexStarError::InvalidEnumValue {
                kind: "latitude direction",
                value,
            }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl LongitudeDirection {
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::East),
            1 => Ok(Self::West),
            _ => Err(NexStarError::InvalidEnumValue {
                kind: "longitude direction",
                value,
            }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LatitudeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::North => write!(f, "N"),
            Self::South => write!(f, "S"),
        }
    }
}

impl fmt::Display for LongitudeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::East => write!(f, "E"),
            Self::West => write!(f, "W"),
        }
    }
}

fn check_field(what: &'static str, value: u8, max: u8) -> Result<()> {
    if value > max {
        return Err(NexStarError::out_of_range(what, value, 0, max));
    }
    Ok(())
}

fn dms_to_decimal(degrees: u8, minutes: u8, seconds: u8) -> f64 {
    degrees as f64 + minutes as f64 / 60.0 + seconds as f64 / 3600.0
}

/// Latitude in whole degrees, minutes and seconds.
///
/// All fields are non-negative; the hemisphere is carried by `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatitudeDms {
    degrees: u8,
    minutes: u8,
    seconds: u8,
    direction: LatitudeDirection,
}

impl LatitudeDms {
    pub fn new(degrees: u8, minutes: u8, seconds: u8, direction: LatitudeDirection) -> Result<Self> {
        check_field("Degrees", degrees, 90)?;
        check_field("Minutes", minutes, 59)?;
        check_field("Seconds", seconds, 59)?;
        Ok(Self {
            degrees,
            minutes,
            seconds,
            direction,
        })
    }

    /// Convert signed decimal degrees (positive = North).
    pub fn from_decimal(value: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&value) {
            return Err(NexStarError::out_of_range("Value", value, -90, 90));
        }
        let direction = if value >= 0.0 {
            LatitudeDirection::North
        } else {
            LatitudeDirection::South
        };
        let (degrees, minutes, seconds) = to_dms(value);
        Self::new(degrees as u8, minutes as u8, seconds as u8, direction)
    }

    pub fn to_decimal(&self) -> f64 {
        let magnitude = dms_to_decimal(self.degrees, self.minutes, self.seconds);
        match self.direction {
            LatitudeDirection::North => magnitude,
            LatitudeDirection::South => -magnitude,
        }
    }

    pub fn degrees(&self) -> u8 {
        self.degrees
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn direction(&self) -> LatitudeDirection {
        self.direction
    }

    /// The four wire bytes: degrees, minutes, seconds, direction.
    pub fn to_bytes(&self) -> [u8; 4] {
        [self.degrees, self.minutes, self.seconds, self.direction.to_byte()]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        let direction = LatitudeDirection::from_byte(bytes[3])?;
        Self::new(bytes[0], bytes[1], bytes[2], direction)
    }
}

impl fmt::Display for LatitudeDms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\u{b0} {}' {}\" {}",
            self.degrees, self.minutes, self.seconds, self.direction
        )
    }
}

/// Longitude in whole degrees, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongitudeDms {
    degrees: u8,
    minutes: u8,
    seconds: u8,
    direction: LongitudeDirection,
}

impl LongitudeDms {
    pub fn new(degrees: u8, minutes: u8, seconds: u8, direction: LongitudeDirection) -> Result<Self> {
        check_field("Degrees", degrees, 180)?;
        check_field("Minutes", minutes, 59)?;
        check_field("Seconds", seconds, 59)?;
        Ok(Self {
            degrees,
            minutes,
            seconds,
            direction,
        })
    }

    /// Convert signed decimal degrees (positive = East).
    pub fn from_decimal(value: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&value) {
            return Err(NexStarError::out_of_range("Value", value, -180, 180));
        }
        let direction = if value >= 0.0 {
            LongitudeDirection::East
        } else {
            LongitudeDirection::West
        };
        let (degrees, minutes, seconds) = to_dms(value);
        Self::new(degrees as u8, minutes as u8, seconds as u8, direction)
    }

    pub fn to_decimal(&self) -> f64 {
        let magnitude = dms_to_decimal(self.degrees, self.minutes, self.seconds);
        match self.direction {
            LongitudeDirection::East => magnitude,
            LongitudeDirection::West => -magnitude,
        }
    }

    pub fn degrees(&self) -> u8 {
        self.degrees
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn direction(&self) -> LongitudeDirection {
        self.direction
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.degrees, self.minutes, self.seconds, self.direction.to_byte()]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        let direction = LongitudeDirection::from_byte(bytes[3])?;
        Self::new(bytes[0], bytes[1], bytes[2], direction)
    }
}

impl fmt::Display for LongitudeDms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\u{b0} {}' {}\" {}",
            self.degrees, self.minutes, self.seconds, self.direction
        )
    }
}
