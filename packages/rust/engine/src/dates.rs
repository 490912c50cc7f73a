//! Flexible date interpretation and chronological ordering.
//!
//! Banner dates arrive in whatever shape an editor typed: ISO, `5 June
//! 2021`, `June 5, 2021`, abbreviated months, a bare `5 June`, or a bare
//! year. Entries are ordered by interpreting each date into a comparable
//! [`NaiveDate`]; partial dates resolve against fixed defaults so the same
//! input always orders the same way.

use chrono::NaiveDate;

use histmerge_shared::{HistmergeError, Result};

use crate::history::EventRecord;

/// Year assumed for dates that carry none.
const DEFAULT_YEAR: i32 = 2000;

/// Formats tried against the normalized input, most common first.
const FULL_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y"];

/// Formats tried with [`DEFAULT_YEAR`] appended, for month-day inputs.
const PARTIAL_FORMATS: [&str; 4] = ["%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y"];

/// Interpret a free-form date string as a comparable day.
pub fn parse_flexible(input: &str) -> Result<NaiveDate> {
    // Commas and run-on whitespace carry no meaning; fold them away so one
    // format table covers "June 5, 2021" and "June 5 2021" alike.
    let normalized = input
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if normalized.is_empty() {
        return Err(HistmergeError::date_parse(input));
    }

    for format in FULL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Ok(date);
        }
    }

    let with_default_year = format!("{normalized} {DEFAULT_YEAR}");
    for format in PARTIAL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_default_year, format) {
            return Ok(date);
        }
    }

    // Bare year.
    if normalized.len() == 4 {
        if let Ok(year) = normalized.parse::<i32>() {
            if let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) {
                return Ok(date);
            }
        }
    }

    Err(HistmergeError::date_parse(input))
}

/// Order entries ascending by interpreted date.
///
/// The sort is stable: entries whose dates interpret equal keep their input
/// order, so the first-seen source wins the unnumbered slot. Any
/// uninterpretable date aborts the merge.
pub fn sort_chronological(entries: Vec<EventRecord>) -> Result<Vec<EventRecord>> {
    let mut keyed: Vec<(NaiveDate, EventRecord)> = entries
        .into_iter()
        .map(|entry| parse_flexible(&entry.date).map(|date| (date, entry)))
        .collect::<Result<_>>()?;

    keyed.sort_by_key(|(date, _)| *date);

    Ok(keyed.into_iter().map(|(_, entry)| entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_shapes() {
        assert_eq!(parse_flexible("2004-05-28").unwrap(), day(2004, 5, 28));
        assert_eq!(parse_flexible("12 September 2009").unwrap(), day(2009, 9, 12));
        assert_eq!(parse_flexible("June 5, 2021").unwrap(), day(2021, 6, 5));
        assert_eq!(parse_flexible("6 April 2015").unwrap(), day(2015, 4, 6));
        assert_eq!(parse_flexible("1 Jul 2020").unwrap(), day(2020, 7, 1));
    }

    #[test]
    fn parses_partial_dates_against_fixed_defaults() {
        assert_eq!(parse_flexible("5 June").unwrap(), day(DEFAULT_YEAR, 6, 5));
        assert_eq!(parse_flexible("June 5").unwrap(), day(DEFAULT_YEAR, 6, 5));
        assert_eq!(parse_flexible("2015").unwrap(), day(2015, 1, 1));
    }

    #[test]
    fn tolerates_stray_whitespace() {
        assert_eq!(parse_flexible("  24   December 2013 ").unwrap(), day(2013, 12, 24));
    }

    #[test]
    fn rejects_nonsense() {
        assert!(parse_flexible("").is_err());
        assert!(parse_flexible("the 5th of Junetober").is_err());
        assert!(parse_flexible("12345").is_err());
    }

    #[test]
    fn sorts_ascending() {
        let sorted = sort_chronological(vec![
            EventRecord::dated("1 June 2010"),
            EventRecord::dated("1 June 2009"),
            EventRecord::dated("2008-03-01"),
        ])
        .unwrap();
        let dates: Vec<&str> = sorted.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["2008-03-01", "1 June 2009", "1 June 2010"]);
    }

    #[test]
    fn equal_dates_keep_encounter_order() {
        let sorted = sort_chronological(vec![
            EventRecord {
                date: "1 June 2009".into(),
                secondary: vec!["first".into()],
            },
            EventRecord {
                date: "June 1, 2009".into(),
                secondary: vec!["second".into()],
            },
        ])
        .unwrap();
        assert_eq!(sorted[0].secondary, ["first"]);
        assert_eq!(sorted[1].secondary, ["second"]);
    }

    #[test]
    fn unparseable_entry_fails_the_merge() {
        let result = sort_chronological(vec![
            EventRecord::dated("1 June 2009"),
            EventRecord::dated("not a date"),
        ]);
        assert!(result.is_err());
    }
}
