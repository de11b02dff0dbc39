//! Conversions between ZIP MS-DOS timestamps and filesystem times.
//!
//! ZIP stores local wall-clock time with two-second resolution and no zone.
//! Both directions treat that value as UTC so that an extract/compress round
//! trip reproduces the stored timestamp exactly.

use std::time::SystemTime;
use time::Date;
use time::Month;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::Time;

/// Converts a stored ZIP timestamp into seconds since the Unix epoch.
///
/// Returns `None` for field values that do not form a calendar date.
pub(crate) fn zip_to_unix(stamp: zip::DateTime) -> Option<i64> {
    let month = Month::try_from(stamp.month()).ok()?;
    let date = Date::from_calendar_date(i32::from(stamp.year()), month, stamp.day()).ok()?;
    let time = Time::from_hms(stamp.hour(), stamp.minute(), stamp.second()).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp())
}

/// Converts a filesystem modification time into a ZIP timestamp.
///
/// Times outside the representable range (before 1980 or after 2107) clamp
/// to the ZIP epoch, 1980-01-01 00:00:00.
pub(crate) fn system_to_zip(modified: SystemTime) -> zip::DateTime {
    let stamp = OffsetDateTime::from(modified);
    u16::try_from(stamp.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                u8::from(stamp.month()),
                stamp.day(),
                stamp.hour(),
                stamp.minute(),
                stamp.second(),
            )
            .ok()
        })
        .unwrap_or_default()
}
