use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, TimeZone, Timelike};

use crate::error::{NexStarError, Result};

/// Years are sent as an offset from this epoch in a single byte.
const YEAR_EPOCH: i32 = 2000;

/// Zone bytes above this are negative offsets encoded as `256 + offset`.
const MAX_POSITIVE_ZONE: u8 = 24;

/// Date and time as kept by the hand control.
///
/// The UTC offset already includes any daylight-saving shift; the DST flag
/// travels alongside it for display on the hand control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTime {
    datetime: DateTime<FixedOffset>,
    daylight_saving: bool,
}

impl DeviceTime {
    pub fn new(datetime: DateTime<FixedOffset>, daylight_saving: bool) -> Self {
        Self {
            datetime,
            daylight_saving,
        }
    }

    /// The host's local time. The DST flag is set when the host zone is on
    /// its summer offset.
    pub fn now_local() -> Self {
        let now = Local::now();
        let offset = now.offset().local_minus_utc();
        let daylight_saving = match (
            local_offset_on(now.year(), 1),
            local_offset_on(now.year(), 7),
        ) {
            (Some(january), Some(july)) => is_summer_offset(offset, january, july),
            _ => false,
        };
        Self::new(now.fixed_offset(), daylight_saving)
    }

    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.datetime
    }

    pub fn daylight_saving(&self) -> bool {
        self.daylight_saving
    }

    /// UTC offset in whole hours, rounded towards negative infinity.
    pub fn utc_offset_hours(&self) -> i32 {
        self.datetime.offset().local_minus_utc().div_euclid(3600)
    }

    /// Encode as `[hour, minute, second, month, day, year - 2000, zone, dst]`.
    pub fn to_bytes(&self) -> Result<[u8; 8]> {
        let dt = &self.datetime;
        let year = u8::try_from(dt.year() - YEAR_EPOCH)
            .map_err(|_| NexStarError::out_of_range("Year", dt.year(), YEAR_EPOCH, YEAR_EPOCH + 255))?;
        let offset = self.utc_offset_hours();
        let zone = (if offset >= 0 { offset } else { offset + 256 }) as u8;
        Ok([
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.month() as u8,
            dt.day() as u8,
            year,
            zone,
            self.daylight_saving as u8,
        ])
    }

    /// Decode the eight bytes of a time response.
    pub fn from_bytes(bytes: [u8; 8]) -> Result<Self> {
        let [hour, minute, second, month, day, year, zone, dst] = bytes;

        let offset_hours = if zone > MAX_POSITIVE_ZONE {
            zone as i32 - 256
        } else {
            zone as i32
        };
        let offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| NexStarError::InvalidTime(format!("UTC offset of {offset_hours} hours")))?;

        let naive = NaiveDate::from_ymd_opt(YEAR_EPOCH + year as i32, month as u32, day as u32)
            .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
            .ok_or_else(|| NexStarError::InvalidTime(format!("{bytes:02X?}")))?;
        let datetime = naive
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| NexStarError::InvalidTime(format!("{bytes:02X?}")))?;

        Ok(Self::new(datetime, dst == 1))
    }
}

impl fmt::Display for DeviceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datetime.format("%Y-%m-%d %H:%M:%S %:z"))?;
        if self.daylight_saving {
            write!(f, " DST")?;
        }
        Ok(())
    }
}

/// Host UTC offset in seconds at noon on the first of `month`.
fn local_offset_on(year: i32, month: u32) -> Option<i32> {
    Local
        .with_ymd_and_hms(year, month, 1, 12, 0, 0)
        .single()
        .map(|dt| dt.offset().local_minus_utc())
}

/// Whether `offset` is the later of two differing seasonal offsets.
fn is_summer_offset(offset: i32, january: i32, july: i32) -> bool {
    january != july && offset == january.max(july)
}
