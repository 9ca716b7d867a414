use jiff::{civil::Date, fmt::temporal::DateTimeParser, tz::TimeZone};
use serde::Serialize;

use crate::models::AvailabilityStatus;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Countdown {
    pub label: String,
    pub days_remaining: Option<i64>,
}

/// Today's calendar date in the local time zone.
pub fn today() -> Date {
    jiff::Zoned::now().date()
}

/// Whole calendar days from `today` to `release`, negative once the date has passed.
pub fn days_until(release: Date, today: Date) -> i64 {
    i64::from((release - today).get_days())
}

/// A title is available once today has reached its release date. A missing
/// date keeps it upcoming.
pub fn availability(release: Option<Date>, today: Date) -> AvailabilityStatus {
    match release {
        Some(date) if days_until(date, today) <= 0 => AvailabilityStatus::Available,
        _ => AvailabilityStatus::Upcoming,
    }
}

pub fn compute_countdown(release: Option<Date>, today: Date) -> Countdown {
    let Some(release) = release else {
        return Countdown { label: "TBA".to_string(), days_remaining: None };
    };

    let (label, days) = match days_until(release, today) {
        n if n < 0 => ("Available Now".to_string(), 0),
        0 => ("Releasing Today".to_string(), 0),
        1 => ("Releasing Tomorrow".to_string(), 1),
        n => (format!("Releasing in {n} Days"), n),
    };

    Countdown { label, days_remaining: Some(days) }
}

/// Parses a stored or upstream release date. Accepts `YYYY-MM-DD` and RFC 3339
/// timestamps (taken as the UTC calendar day). Anything else is treated as unknown.
pub fn parse_release_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTimeParser::new().parse_timestamp(raw.as_bytes()) {
        return Some(ts.to_zoned(TimeZone::UTC).date());
    }
    raw.parse::<Date>().ok()
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    const TODAY: Date = date(2026, 2, 15);

    #[test]
    fn missing_date_is_tba() {
        assert_eq!(
            compute_countdown(None, TODAY),
            Countdown { label: "TBA".to_string(), days_remaining: None }
        );
    }

    #[test]
    fn past_date_is_available_now() {
        let c = compute_countdown(Some(date(2026, 2, 10)), TODAY);
        assert_eq!(c.label, "Available Now");
        assert_eq!(c.days_remaining, Some(0));
    }

    #[test]
    fn same_day_and_next_day() {
        let c = compute_countdown(Some(TODAY), TODAY);
        assert_eq!((c.label.as_str(), c.days_remaining), ("Releasing Today", Some(0)));

        let c = compute_countdown(Some(date(2026, 2, 16)), TODAY);
        assert_eq!((c.label.as_str(), c.days_remaining), ("Releasing Tomorrow", Some(1)));
    }

    #[test]
    fn counts_whole_days_across_month_boundary() {
        let c = compute_countdown(Some(date(2026, 3, 1)), TODAY);
        assert_eq!(c.label, "Releasing in 14 Days");
        assert_eq!(c.days_remaining, Some(14));

        let c = compute_countdown(Some(date(2027, 2, 15)), TODAY);
        assert_eq!(c.days_remaining, Some(365));
    }

    #[test]
    fn availability_flips_on_release_day() {
        assert_eq!(availability(None, TODAY), AvailabilityStatus::Upcoming);
        assert_eq!(availability(Some(date(2026, 2, 16)), TODAY), AvailabilityStatus::Upcoming);
        assert_eq!(availability(Some(TODAY), TODAY), AvailabilityStatus::Available);
        assert_eq!(availability(Some(date(2025, 12, 31)), TODAY), AvailabilityStatus::Available);
    }

    #[test]
    fn parses_plain_dates_and_timestamps() {
        assert_eq!(parse_release_date("2026-02-16"), Some(date(2026, 2, 16)));
        assert_eq!(parse_release_date(" 2024-01-12T00:00:00.000Z "), Some(date(2024, 1, 12)));
        assert_eq!(parse_release_date("2024-01-12T23:30:00-02:00"), Some(date(2024, 1, 13)));
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("soon"), None);
        assert_eq!(compute_countdown(parse_release_date("soon"), TODAY).label, "TBA");
    }
}
