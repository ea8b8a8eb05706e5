//! Calendar dates and the `YYYY/MM-DD.txt` log filename codec.
//!
//! A [`LogDate`] can only be constructed in range (year >= 1, month 1-12,
//! day 1-31), so every encoded name decodes back to the same date. The
//! decoder is strict: it accepts exactly the strings the encoder produces.

use std::fmt;

use chrono::Datelike;
use thiserror::Error;

/// Error returned when a log filename does not decode to a date.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateNameError {
    #[error("filename '{0}' does not end with '.txt'")]
    MissingTxtSuffix(String),

    #[error("filename '{0}' has no '/' separating year and month-day")]
    MissingSeparator(String),

    #[error("filename '{0}' has a malformed year")]
    MalformedYear(String),

    #[error("filename '{0}' contains year {1} out of range")]
    YearOutOfRange(String, i64),

    #[error("filename '{0}' has a malformed month")]
    MalformedMonth(String),

    #[error("filename '{0}' contains month {1} out of range")]
    MonthOutOfRange(String, u32),

    #[error("filename '{0}' has a malformed day")]
    MalformedDay(String),

    #[error("filename '{0}' contains day {1} out of range")]
    DayOutOfRange(String, u32),
}

/// A calendar date as carried in repository log filenames.
///
/// Ordering is field order (year, month, day), which is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogDate {
    year: i32,
    month: u32,
    day: u32,
}

impl LogDate {
    /// Constructs a date, checking the field ranges.
    ///
    /// Day validity is per the filename format (1-31), not per calendar
    /// month length.
    pub fn new(year: i32, month: u32, day: u32) -> Option<LogDate> {
        if year < 1 || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(LogDate { year, month, day })
    }

    /// The UTC calendar date of an epoch-seconds timestamp.
    ///
    /// Returns `None` when the timestamp is outside the representable
    /// calendar range.
    pub fn from_epoch(secs: u64) -> Option<LogDate> {
        let secs = i64::try_from(secs).ok()?;
        let date = chrono::DateTime::from_timestamp(secs, 0)?.date_naive();
        LogDate::new(date.year(), date.month(), date.day())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Renders the repo-relative log filename, e.g. `2021/06-04.txt`.
    ///
    /// The year is unpadded; month and day are two digits.
    pub fn encode(&self) -> String {
        format!("{}/{:02}-{:02}.txt", self.year, self.month, self.day)
    }

    /// Decodes a repo-relative log filename.
    ///
    /// Accepts exactly the output of [`LogDate::encode`].
    pub fn decode(name: &str) -> Result<LogDate, DateNameError> {
        let err_name = || name.to_string();

        let stem = name
            .strip_suffix(".txt")
            .ok_or_else(|| DateNameError::MissingTxtSuffix(err_name()))?;
        let (year_part, md_part) = stem
            .split_once('/')
            .ok_or_else(|| DateNameError::MissingSeparator(err_name()))?;

        if year_part.is_empty()
            || !year_part.bytes().all(|b| b.is_ascii_digit())
            || (year_part.len() > 1 && year_part.starts_with('0'))
        {
            return Err(DateNameError::MalformedYear(err_name()));
        }
        let year: i64 = year_part
            .parse()
            .map_err(|_| DateNameError::MalformedYear(err_name()))?;
        if year < 1 || year > i64::from(i32::MAX) {
            return Err(DateNameError::YearOutOfRange(err_name(), year));
        }

        let md = md_part.as_bytes();
        if md.len() != 5 || md[2] != b'-' {
            return Err(DateNameError::MalformedMonth(err_name()));
        }
        if !md[0].is_ascii_digit() || !md[1].is_ascii_digit() {
            return Err(DateNameError::MalformedMonth(err_name()));
        }
        if !md[3].is_ascii_digit() || !md[4].is_ascii_digit() {
            return Err(DateNameError::MalformedDay(err_name()));
        }
        let month = u32::from(md[0] - b'0') * 10 + u32::from(md[1] - b'0');
        let day = u32::from(md[3] - b'0') * 10 + u32::from(md[4] - b'0');
        if !(1..=12).contains(&month) {
            return Err(DateNameError::MonthOutOfRange(err_name(), month));
        }
        if !(1..=31).contains(&day) {
            return Err(DateNameError::DayOutOfRange(err_name(), day));
        }

        Ok(LogDate {
            year: year as i32,
            month,
            day,
        })
    }
}

impl fmt::Display for LogDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// decode(encode(d)) == d over the full field ranges.
        #[test]
        fn encode_decode_roundtrip(
            year in 1i32..=400_000,
            month in 1u32..=12,
            day in 1u32..=31,
        ) {
            let date = LogDate::new(year, month, day).unwrap();
            prop_assert_eq!(LogDate::decode(&date.encode()), Ok(date));
        }

        /// Chronological order matches lexicographic field order.
        #[test]
        fn ordering_matches_fields(
            y1 in 1i32..=9999, m1 in 1u32..=12, d1 in 1u32..=31,
            y2 in 1i32..=9999, m2 in 1u32..=12, d2 in 1u32..=31,
        ) {
            let a = LogDate::new(y1, m1, d1).unwrap();
            let b = LogDate::new(y2, m2, d2).unwrap();
            prop_assert_eq!(a < b, (y1, m1, d1) < (y2, m2, d2));
        }

        /// Arbitrary strings never panic the decoder.
        #[test]
        fn decode_never_panics(name: String) {
            let _ = LogDate::decode(&name);
        }
    }

    #[test]
    fn from_epoch_known_values() {
        assert_eq!(
            LogDate::from_epoch(1622782862),
            LogDate::new(2021, 6, 4)
        );
        assert_eq!(
            LogDate::from_epoch(2522966400),
            LogDate::new(2049, 12, 13)
        );
        assert_eq!(LogDate::from_epoch(10), LogDate::new(1970, 1, 1));
        assert_eq!(LogDate::from_epoch(0), LogDate::new(1970, 1, 1));
    }

    #[test]
    fn from_epoch_out_of_range() {
        assert_eq!(LogDate::from_epoch(u64::MAX), None);
    }

    #[test]
    fn encode_known_values() {
        assert_eq!(LogDate::new(2021, 6, 4).unwrap().encode(), "2021/06-04.txt");
        assert_eq!(LogDate::new(1, 1, 1).unwrap().encode(), "1/01-01.txt");
        assert_eq!(
            LogDate::new(2049, 12, 13).unwrap().encode(),
            "2049/12-13.txt"
        );
    }

    #[test]
    fn decode_rejects_missing_suffix() {
        assert_eq!(
            LogDate::decode("a"),
            Err(DateNameError::MissingTxtSuffix("a".into()))
        );
        assert_eq!(
            LogDate::decode("2021/06-04.TXT"),
            Err(DateNameError::MissingTxtSuffix("2021/06-04.TXT".into()))
        );
    }

    #[test]
    fn decode_rejects_month_out_of_range() {
        assert_eq!(
            LogDate::decode("1/13-01.txt"),
            Err(DateNameError::MonthOutOfRange("1/13-01.txt".into(), 13))
        );
        assert_eq!(
            LogDate::decode("1/00-01.txt"),
            Err(DateNameError::MonthOutOfRange("1/00-01.txt".into(), 0))
        );
    }

    #[test]
    fn decode_rejects_day_out_of_range() {
        assert_eq!(
            LogDate::decode("1/01-00.txt"),
            Err(DateNameError::DayOutOfRange("1/01-00.txt".into(), 0))
        );
        assert_eq!(
            LogDate::decode("1/01-32.txt"),
            Err(DateNameError::DayOutOfRange("1/01-32.txt".into(), 32))
        );
    }

    #[test]
    fn decode_rejects_malformed_shapes() {
        assert_eq!(
            LogDate::decode(".txt"),
            Err(DateNameError::MissingSeparator(".txt".into()))
        );
        assert_eq!(
            LogDate::decode("/01-01.txt"),
            Err(DateNameError::MalformedYear("/01-01.txt".into()))
        );
        assert_eq!(
            LogDate::decode("0/01-01.txt"),
            Err(DateNameError::MalformedYear("0/01-01.txt".into()))
        );
        assert_eq!(
            LogDate::decode("02021/06-04.txt"),
            Err(DateNameError::MalformedYear("02021/06-04.txt".into()))
        );
        assert_eq!(
            LogDate::decode("2021/6-04.txt"),
            Err(DateNameError::MalformedMonth("2021/6-04.txt".into()))
        );
        assert_eq!(
            LogDate::decode("2021/06_04.txt"),
            Err(DateNameError::MalformedMonth("2021/06_04.txt".into()))
        );
        assert_eq!(
            LogDate::decode("2021/06-4x.txt"),
            Err(DateNameError::MalformedDay("2021/06-4x.txt".into()))
        );
        assert_eq!(
            LogDate::decode("99999999999999999999/01-01.txt"),
            Err(DateNameError::MalformedYear(
                "99999999999999999999/01-01.txt".into()
            ))
        );
    }
}
