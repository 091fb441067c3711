//! Calendar-date helpers. Dates travel as `YYYY-MM-DD` strings.

use chrono::{NaiveDate, TimeDelta, Utc};

use crate::error::CoreError;

/// Days shown before today in the date picker.
pub const DAYS_BACK: i64 = 7;

/// Days shown after today in the date picker.
pub const DAYS_AHEAD: i64 = 14;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in UTC, which is what the backend keys days by.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The selectable range around `today`, oldest first, inclusive at both ends.
pub fn date_window(today: NaiveDate) -> Vec<NaiveDate> {
    (-DAYS_BACK..=DAYS_AHEAD)
        .filter_map(|offset| today.checked_add_signed(TimeDelta::days(offset)))
        .collect()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| CoreError::Validation(format!("Invalid date '{value}', expected YYYY-MM-DD")))
}
