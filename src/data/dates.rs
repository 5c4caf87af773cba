use chrono::{DateTime, Local, NaiveDate};
use thiserror::Error;

/// A date label that matched none of the accepted layouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised date label '{label}'")]
pub struct DateParseError {
    pub label: String,
}

/// Layouts tried in order for a full calendar date.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse a time-point label.
///
/// Accepts plain dates in the common layouts above, a year-month (`2024-03`,
/// read as the first of the month) and RFC 3339 timestamps.
pub fn parse_date_label(label: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = label.trim();

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d") {
        return Ok(d);
    }

    Err(DateParseError {
        label: trimmed.to_string(),
    })
}

/// Parse a label, substituting today's date when it is malformed.
///
/// The data point ends up misplaced on the time axis but the chart keeps
/// rendering.
pub fn parse_date_or_today(label: &str) -> NaiveDate {
    match parse_date_label(label) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("{e}; substituting today's date");
            Local::now().date_naive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_supported_layouts() {
        assert_eq!(parse_date_label("2024-03-15").unwrap(), ymd(2024, 3, 15));
        assert_eq!(parse_date_label("2024/03/15").unwrap(), ymd(2024, 3, 15));
        assert_eq!(parse_date_label("03/15/2024").unwrap(), ymd(2024, 3, 15));
        assert_eq!(parse_date_label("2024-03").unwrap(), ymd(2024, 3, 1));
        assert_eq!(
            parse_date_label("2024-03-15T10:30:00Z").unwrap(),
            ymd(2024, 3, 15)
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_date_label("next tuesday").unwrap_err();
        assert_eq!(err.label, "next tuesday");
        assert!(parse_date_label("").is_err());
    }

    #[test]
    fn malformed_label_falls_back_to_today() {
        let before = Local::now().date_naive();
        let d = parse_date_or_today("not a date");
        let after = Local::now().date_naive();
        assert!(d >= before && d <= after);
    }
}
