//! Calendar-date parsing shared by review validation and export
//! parameter checks.

use chrono::NaiveDate;

/// Parses a date in either `MM/DD/YYYY` or `YYYY-MM-DD` form.
///
/// Returns `None` for anything that is not a real calendar date.
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}
