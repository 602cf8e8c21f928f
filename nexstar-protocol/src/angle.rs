//! Angle encodings used by the position commands.
//!
//! The hand control expresses angles as a fraction of one revolution, either
//! as a 16-bit value (4 hex digits) or a 32-bit value (8 hex digits).

use crate::error::{NexStarError, Result};

/// Number of 16-bit units in one degree.
pub const UNITS_PER_DEGREE: f64 = 65_536.0 / 360.0;
/// Number of 32-bit units in one degree.
pub const UNITS_PER_DEGREE_PRECISE: f64 = 4_294_967_296.0 / 360.0;

/// Resolution of an angle on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// 16-bit fraction of a revolution.
    Coarse,
    /// 32-bit fraction of a revolution.
    Precise,
}

impl Precision {
    pub fn units_per_degree(self) -> f64 {
        match self {
            Self::Coarse => UNITS_PER_DEGREE,
            Self::Precise => UNITS_PER_DEGREE_PRECISE,
        }
    }

    /// Number of hex digits per angle.
    pub fn hex_digits(self) -> usize {
        match self {
            Self::Coarse => 4,
            Self::Precise => 8,
        }
    }

    /// Length of a two-angle position payload (`XXXX,YYYY`).
    pub fn position_len(self) -> usize {
        self.hex_digits() * 2 + 1
    }

    fn units_per_revolution(self) -> i64 {
        match self {
            Self::Coarse => 1 << 16,
            Self::Precise => 1 << 32,
        }
    }
}

/// Encode decimal degrees as lowercase hex at the given precision.
///
/// The value is rounded half-to-even to the nearest unit and wrapped into one
/// revolution, so `-90.0` encodes the same as `270.0`.
pub fn encode_angle(degrees: f64, precision: Precision) -> String {
    let revolution = precision.units_per_revolution();
    let units = (degrees * revolution as f64 / 360.0).round_ties_even() as i64;
    let wrapped = units.rem_euclid(revolution);
    format!("{:0width$x}", wrapped, width = precision.hex_digits())
}

/// Decode a hex angle into decimal degrees.
pub fn decode_angle(hex: &[u8], precision: Precision) -> Result<f64> {
    let text = std::str::from_utf8(hex)
        .map_err(|_| NexStarError::InvalidPosition(format!("non-ASCII angle {hex:02X?}")))?;
    let units = u64::from_str_radix(text, 16)
        .map_err(|e| NexStarError::InvalidPosition(format!("'{text}': {e}")))?;
    Ok(units as f64 * 360.0 / precision.units_per_revolution() as f64)
}

/// Split a decimal value into whole degrees, minutes and seconds.
///
/// Works on the magnitude of `value`; the caller carries the sign. Every
/// component is truncated, so `45.9999` gives `(45, 59, 59)`.
pub fn to_dms(value: f64) -> (u32, u32, u32) {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = ((value - degrees) * 60.0).trunc();
    let seconds = ((value - degrees - minutes / 60.0) * 3600.0).trunc();
    (degrees as u32, minutes as u32, seconds as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_quarter_and_half_turn() {
        assert_eq!(encode_angle(90.0, Precision::Coarse), "4000");
        assert_eq!(encode_angle(180.0, Precision::Coarse), "8000");
        assert_eq!(encode_angle(90.0, Precision::Precise), "40000000");
        assert_eq!(encode_angle(180.0, Precision::Precise), "80000000");
    }

    #[test]
    fn test_encode_is_zero_padded_lowercase() {
        assert_eq!(encode_angle(0.0, Precision::Coarse), "0000");
        assert_eq!(encode_angle(1.0, Precision::Coarse), "00b6");
        assert_eq!(encode_angle(0.0, Precision::Precise), "00000000");
    }

    #[test]
    fn test_encode_wraps_negative_and_full_turn() {
        assert_eq!(encode_angle(-90.0, Precision::Coarse), "c000");
        assert_eq!(encode_angle(360.0, Precision::Coarse), "0000");
        assert_eq!(encode_angle(-45.0, Precision::Precise), "e0000000");
    }

    #[test]
    fn test_decode() {
        assert!((decode_angle(b"4000", Precision::Coarse).unwrap() - 90.0).abs() < 1e-9);
        assert!((decode_angle(b"80000000", Precision::Precise).unwrap() - 180.0).abs() < 1e-9);
        assert!((decode_angle(b"C000", Precision::Coarse).unwrap() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert!(matches!(
            decode_angle(b"12G4", Precision::Coarse),
            Err(NexStarError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_coarse_roundtrip_within_one_unit() {
        let tolerance = 360.0 / 65_536.0;
        let mut v = 0.0;
        while v < 360.0 {
            let hex = encode_angle(v, Precision::Coarse);
            let decoded = decode_angle(hex.as_bytes(), Precision::Coarse).unwrap();
            assert!((decoded - v).abs() <= tolerance, "{v} -> {hex} -> {decoded}");
            v += 7.3;
        }
    }

    #[test]
    fn test_precise_roundtrip_within_one_unit() {
        let tolerance = 360.0 / 4_294_967_296.0;
        for v in [0.0, 12.345_678, 90.000_001, 181.5, 359.999_99] {
            let hex = encode_angle(v, Precision::Precise);
            let decoded = decode_angle(hex.as_bytes(), Precision::Precise).unwrap();
            assert!((decoded - v).abs() <= tolerance, "{v} -> {hex} -> {decoded}");
        }
    }

    #[test]
    fn test_to_dms() {
        assert_eq!(to_dms(121.135), (121, 8, 6));
        assert_eq!(to_dms(0.0), (0, 0, 0));
        assert_eq!(to_dms(45.0), (45, 0, 0));
        assert_eq!(to_dms(45.5), (45, 30, 0));
        assert_eq!(to_dms(359.9999), (359, 59, 59));
    }

    #[test]
    fn test_to_dms_truncates_instead_of_rounding() {
        assert_eq!(to_dms(-45.9999), (45, 59, 59));
    }

    #[test]
    fn test_to_dms_ignores_sign() {
        for x in [0.25, 12.3456, 89.9999, 179.51] {
            assert_eq!(to_dms(x), to_dms(-x));
        }
    }
}
