//! Age in whole years from a stored birthdate

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Parse an ISO date ("2000-03-15") or ISO datetime ("2000-03-15T08:30:00")
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
}

/// Whole years between `birthdate` and `as_of`, never negative
pub fn age_from_birthdate(birthdate: &str, as_of: NaiveDate) -> Option<u32> {
    let born = parse_iso_date(birthdate)?;

    let mut years = as_of.year() - born.year();
    if (as_of.month(), as_of.day()) < (born.month(), born.day()) {
        years -= 1;
    }

    Some(years.max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_birthday_not_yet_reached() {
        assert_eq!(age_from_birthdate("2000-03-15", date(2024, 3, 14)), Some(23));
        assert_eq!(age_from_birthdate("2000-03-15", date(2024, 3, 15)), Some(24));
    }

    #[test]
    fn test_accepts_datetime_text() {
        assert_eq!(
            age_from_birthdate("1990-07-01T00:00:00", date(2025, 6, 30)),
            Some(34)
        );
    }

    #[test]
    fn test_future_birthdate_floors_at_zero() {
        assert_eq!(age_from_birthdate("2030-01-01", date(2024, 1, 1)), Some(0));
    }

    #[test]
    fn test_unparseable_is_unavailable() {
        assert_eq!(age_from_birthdate("", date(2024, 1, 1)), None);
        assert_eq!(age_from_birthdate("15/03/2000", date(2024, 1, 1)), None);
    }
}
