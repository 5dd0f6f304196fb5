//! Calendar conversions for ASN.1 time values.

use veris_types::CodecError;

/// Convert a date-time to a UNIX timestamp (seconds since 1970-01-01 00:00:00 UTC).
pub fn datetime_to_unix(
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> Result<i64, CodecError> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || min > 59 || sec > 59 {
        return Err(CodecError::InvalidValue);
    }
    // Days from year 0 to the start of the given year (Gregorian)
    let y = if month <= 2 { year - 1 } else { year };
    let m = if month <= 2 { month + 9 } else { month - 3 };
    let days = 365 * y as i64 + y as i64 / 4 - y as i64 / 100
        + y as i64 / 400
        + (m as i64 * 306 + 5) / 10
        + (day as i64 - 1)
        - 719468; // offset so epoch = 1970-01-01
    Ok(days * 86400 + hour as i64 * 3600 + min as i64 * 60 + sec as i64)
}

/// Convert a UNIX timestamp to date-time components.
/// Civil date from days since epoch (algorithm from Howard Hinnant).
pub fn unix_to_datetime(timestamp: i64) -> (i32, u32, u32, u32, u32, u32) {
    // Euclidean division keeps day_secs in 0..86400 for pre-epoch
    // timestamps (UTCTime years 50-69 land before 1970).
    let mut days = timestamp.div_euclid(86400) as i32;
    let day_secs = timestamp.rem_euclid(86400) as u32;
    let hour = day_secs / 3600;
    let minute = (day_secs % 3600) / 60;
    let second = day_secs % 60;

    days += 719468;
    let era = if days >= 0 { days } else { days - 146096 } / 146097;
    let doe = (days - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i32 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };

    (year, m, d, hour, minute, second)
}

/// Format a UNIX timestamp as an ISO-8601 UTC string ("2026-08-29T19:32:55Z").
pub fn to_iso8601(timestamp: i64) -> String {
    let (year, month, day, hour, minute, second) = unix_to_datetime(timestamp);
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}
