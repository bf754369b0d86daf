//! Publication date handling.
//!
//! Dates only place records within their year. The day-of-month shuffle is a
//! visualization cosmetic and carries no meaning.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rand::Rng;
use rand::seq::SliceRandom;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d  %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// January 1st of `year`.
#[must_use]
pub fn start_of_year(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Parse a raw publication date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a publication date, falling back to January 1st of `year`.
///
/// Dates that parse but fall outside `year` also fall back, so a record never
/// leaves its year. The flag is true when the fallback was used.
#[must_use]
pub fn date_within_year(raw: Option<&str>, year: i32) -> (NaiveDate, bool) {
    match raw.and_then(parse_date) {
        Some(date) if date.year() == year => (date, false),
        _ => (start_of_year(year), true),
    }
}

/// Number of days in the month containing `date`.
#[must_use]
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map_or(28, |last| last.day())
}

/// Move `date` to a random day of the same month.
pub fn shuffle_day_within_month<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> NaiveDate {
    let day = rng.gen_range(1..=days_in_month(date));
    date.with_day(day).unwrap_or(date)
}

/// Sample one of the year's paper dates; January 1st when there are none.
pub fn representative_date<R: Rng + ?Sized>(dates: &[NaiveDate], year: i32, rng: &mut R) -> NaiveDate {
    dates.choose(rng).copied().unwrap_or_else(|| start_of_year(year))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2019-05-03"), Some(ymd(2019, 5, 3)));
        assert_eq!(parse_date("2019-05-03 00:00:00"), Some(ymd(2019, 5, 3)));
        assert_eq!(parse_date("2019-05-03  00:00:00"), Some(ymd(2019, 5, 3)));
        assert_eq!(parse_date("May 2019"), None);
    }

    #[test]
    fn test_date_within_year_falls_back() {
        assert_eq!(date_within_year(Some("2019-05-03"), 2019), (ymd(2019, 5, 3), false));
        assert_eq!(date_within_year(Some("garbage"), 2019), (ymd(2019, 1, 1), true));
        assert_eq!(date_within_year(None, 2019), (ymd(2019, 1, 1), true));
        // Parsed, but in the wrong year.
        assert_eq!(date_within_year(Some("2018-12-31"), 2019), (ymd(2019, 1, 1), true));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(ymd(2020, 2, 10)), 29);
        assert_eq!(days_in_month(ymd(2019, 2, 10)), 28);
        assert_eq!(days_in_month(ymd(2019, 12, 1)), 31);
        assert_eq!(days_in_month(ymd(2019, 4, 30)), 30);
    }

    #[test]
    fn test_shuffle_stays_in_month() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let shuffled = shuffle_day_within_month(ymd(2019, 2, 14), &mut rng);
            assert_eq!((shuffled.year(), shuffled.month()), (2019, 2));
        }
    }

    #[test]
    fn test_representative_date() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(representative_date(&[], 2020, &mut rng), ymd(2020, 1, 1));

        let dates = [ymd(2020, 3, 1), ymd(2020, 7, 9)];
        let picked = representative_date(&dates, 2020, &mut rng);
        assert!(dates.contains(&picked));
    }
}
