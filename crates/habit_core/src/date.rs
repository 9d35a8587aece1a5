use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day of the Monday-aligned week strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekDay {
    pub date: NaiveDate,
    /// e.g. `Mon Jan 08`
    pub label: String,
    /// First letter of the weekday name.
    pub short: String,
    pub is_today: bool,
}

impl WeekDay {
    pub fn date_string(&self) -> String {
        format_date(self.date)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn today_string() -> String {
    format_date(today())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses exactly `YYYY-MM-DD`. Anything else, padding included, yields
/// `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

pub fn monday_on_or_before(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(offset))
}

/// The seven days of the week containing `reference`, Monday first.
///
/// Weeks always start on Monday whatever the locale says.
pub fn week_dates(reference: NaiveDate) -> Vec<WeekDay> {
    let monday = monday_on_or_before(reference);
    monday
        .iter_days()
        .take(7)
        .map(|day| {
            let weekday = day.format("%a").to_string();
            WeekDay {
                date: day,
                label: day.format("%a %b %d").to_string(),
                short: weekday.chars().take(1).collect(),
                is_today: day == reference,
            }
        })
        .collect()
}

pub fn current_week() -> Vec<WeekDay> {
    week_dates(today())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert_eq!(parse_date("2024-01-10"), Some(date(2024, 1, 10)));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("10/01/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn parse_requires_exact_shape() {
        assert_eq!(parse_date("2024-1-5"), None);
        assert_eq!(parse_date("2024-01-5"), None);
        assert_eq!(parse_date(" 2024-01-10"), None);
        assert_eq!(parse_date("2024-01-10 "), None);
        assert_eq!(parse_date("+262142-12-31"), None);
        assert_eq!(parse_date("-0001-01-01"), None);
        assert_eq!(parse_date("0000-01-01"), NaiveDate::from_ymd_opt(0, 1, 1));
        assert_eq!(parse_date("9999-12-31"), Some(date(9999, 12, 31)));
    }

    #[test]
    fn format_pads_month_and_day() {
        assert_eq!(format_date(date(2024, 3, 5)), "2024-03-05");
    }

    #[test]
    fn week_starts_on_monday_for_every_weekday() {
        // 2024-01-08 is a Monday.
        for offset in 0..7 {
            let reference = date(2024, 1, 8) + Duration::days(offset);
            let week = week_dates(reference);
            assert_eq!(week.len(), 7);
            assert_eq!(week[0].date, date(2024, 1, 8));
            assert_eq!(week[0].date.weekday(), Weekday::Mon);
            assert_eq!(week.iter().filter(|day| day.is_today).count(), 1);
            assert_eq!(week[offset as usize].date, reference);
            assert!(week[offset as usize].is_today);
        }
    }

    #[test]
    fn sunday_belongs_to_the_preceding_week() {
        let week = week_dates(date(2024, 1, 14));
        assert_eq!(week[0].date, date(2024, 1, 8));
        assert_eq!(week[6].date, date(2024, 1, 14));
        assert!(week[6].is_today);
    }

    #[test]
    fn week_crosses_year_boundary() {
        let week = week_dates(date(2025, 1, 1));
        assert_eq!(week[0].date, date(2024, 12, 30));
        assert_eq!(week[0].date_string(), "2024-12-30");
        assert_eq!(week[6].date, date(2025, 1, 5));
    }

    #[test]
    fn labels_use_abbreviated_names() {
        let week = week_dates(date(2024, 1, 10));
        assert_eq!(week[0].label, "Mon Jan 08");
        assert_eq!(week[0].short, "M");
        assert_eq!(week[3].short, "T");
        assert_eq!(week[6].short, "S");
    }

    #[test]
    fn current_week_contains_today() {
        let week = current_week();
        assert_eq!(week.iter().filter(|day| day.is_today).count(), 1);
        assert!(week.iter().any(|day| day.date == today()));
    }
}
