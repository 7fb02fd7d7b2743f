//! ISO 9660 date and time encodings

use time::{OffsetDateTime, UtcOffset};

/// Volume descriptor date for fields that are not specified
pub const UNSET_VOLUME_DATETIME: [u8; 17] = *b"0000000000000000\0";

/// 7-byte directory record date (ECMA-119 9.1.5), always in UTC
pub fn record_datetime(timestamp: OffsetDateTime) -> [u8; 7] {
    let ts = timestamp.to_offset(UtcOffset::UTC);
    // Years are stored as an offset from 1900 in a single byte
    let year = (ts.year() - 1900).clamp(0, 255) as u8;
    [
        year,
        u8::from(ts.month()),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        0,
    ]
}

/// 17-byte volume descriptor date (ECMA-119 8.4.26.1), always in UTC
pub fn volume_datetime(timestamp: OffsetDateTime) -> [u8; 17] {
    let ts = timestamp.to_offset(UtcOffset::UTC);
    let digits = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}{:02}",
        ts.year().clamp(1, 9999),
        u8::from(ts.month()),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        ts.millisecond() / 10
    );

    let mut out = [0u8; 17];
    out[..16].copy_from_slice(&digits.as_bytes()[..16]);
    out
}
