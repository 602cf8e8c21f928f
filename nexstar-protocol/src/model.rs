use std::fmt;

use crate::error::{NexStarError, Result};

/// Tracking mode of the mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingMode {
    Off = 0,
    AltAz = 1,
    EqNorth = 2,
    EqSouth = 3,
}

impl TrackingMode {
    /// All modes in wire order.
    pub const ALL: [TrackingMode; 4] = [Self::Off, Self::AltAz, Self::EqNorth, Self::EqSouth];

    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::AltAz),
            2 => Ok(Self::EqNorth),
            3 => Ok(Self::EqSouth),
            _ => Err(NexStarError::InvalidEnumValue {
                kind: "tracking mode",
                value,
            }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Next mode in wire order, wrapping after `EqSouth`.
    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::AltAz => write!(f, "Alt-Az"),
            Self::EqNorth => write!(f, "EQ North"),
            Self::EqSouth => write!(f, "EQ South"),
        }
    }
}

/// Sub-devices that answer a version query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    AzmRaMotor = 16,
    AltDecMotor = 17,
    GpsUnit = 176,
    /// CGE mounts only.
    Rtc = 178,
}

impl DeviceType {
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AzmRaMotor => write!(f, "AZM/RA motor"),
            Self::AltDecMotor => write!(f, "ALT/DEC motor"),
            Self::GpsUnit => write!(f, "GPS unit"),
            Self::Rtc => write!(f, "RTC"),
        }
    }
}

/// Mount model reported by the hand control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceModel {
    GpsSeries,
    ISeries,
    ISeriesSe,
    Cge,
    AdvancedGt,
    Slt,
    Cpc,
    Gt,
    Se45,
    Se68,
}

/// Model codes. Codes 2 and 8 are not assigned.
const MODEL_CODES: [(u8, DeviceModel); 10] = [
    (1, DeviceModel::GpsSeries),
    (3, DeviceModel::ISeries),
    (4, DeviceModel::ISeriesSe),
    (5, DeviceModel::Cge),
    (6, DeviceModel::AdvancedGt),
    (7, DeviceModel::Slt),
    (9, DeviceModel::Cpc),
    (10, DeviceModel::Gt),
    (11, DeviceModel::Se45),
    (12, DeviceModel::Se68),
];

impl DeviceModel {
    /// Look up a model code. Returns `None` for unassigned codes.
    pub fn from_code(code: u8) -> Option<Self> {
        MODEL_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, model)| *model)
    }

    pub fn from_byte(value: u8) -> Result<Self> {
        Self::from_code(value).ok_or(NexStarError::InvalidEnumValue {
            kind: "device model",
            value,
        })
    }

    pub fn code(self) -> u8 {
        MODEL_CODES
            .iter()
            .find(|(_, m)| *m == self)
            .map(|(c, _)| *c)
            .unwrap_or_default()
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GpsSeries => "GPS Series",
            Self::ISeries => "i-Series",
            Self::ISeriesSe => "i-Series SE",
            Self::Cge => "CGE",
            Self::AdvancedGt => "Advanced GT",
            Self::Slt => "SLT",
            Self::Cpc => "CPC",
            Self::Gt => "GT",
            Self::Se45 => "4/5 SE",
            Self::Se68 => "6/8 SE",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_mode_bytes() {
        for mode in TrackingMode::ALL {
            assert_eq!(TrackingMode::from_byte(mode.to_byte()).unwrap(), mode);
        }
        assert_eq!(TrackingMode::from_byte(2).unwrap(), TrackingMode::EqNorth);
    }

    #[test]
    fn test_unknown_tracking_mode() {
        assert!(matches!(
            TrackingMode::from_byte(4),
            Err(NexStarError::InvalidEnumValue { kind: "tracking mode", value: 4 })
        ));
    }

    #[test]
    fn test_tracking_mode_cycle() {
        assert_eq!(TrackingMode::Off.next(), TrackingMode::AltAz);
        assert_eq!(TrackingMode::EqSouth.next(), TrackingMode::Off);
    }

    #[test]
    fn test_device_type_values() {
        assert_eq!(DeviceType::AzmRaMotor.to_byte(), 16);
        assert_eq!(DeviceType::AltDecMotor.to_byte(), 17);
        assert_eq!(DeviceType::GpsUnit.to_byte(), 176);
        assert_eq!(DeviceType::Rtc.to_byte(), 178);
    }

    #[test]
    fn test_device_model_lookup() {
        assert_eq!(DeviceModel::from_byte(9).unwrap(), DeviceModel::Cpc);
        assert_eq!(DeviceModel::from_byte(12).unwrap(), DeviceModel::Se68);
        for (code, model) in MODEL_CODES {
            assert_eq!(model.code(), code);
        }
    }

    #[test]
    fn test_device_model_gaps_are_unknown() {
        assert_eq!(DeviceModel::from_code(0), None);
        assert_eq!(DeviceModel::from_code(2), None);
        assert_eq!(DeviceModel::from_code(8), None);
        assert_eq!(DeviceModel::from_code(13), None);
        assert!(matches!(
            DeviceModel::from_byte(8),
            Err(NexStarError::InvalidEnumValue { value: 8, .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackingMode::EqNorth.to_string(), "EQ North");
        assert_eq!(DeviceModel::Se45.to_string(), "4/5 SE");
        assert_eq!(DeviceType::GpsUnit.to_string(), "GPS unit");
    }
}
