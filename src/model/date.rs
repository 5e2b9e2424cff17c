use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use std::fmt;

/// Naive layouts tried after RFC 2822 and RFC 3339, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d %b %Y %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight UTC.
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%a %b %d %Y", "%d %b %Y"];

/// A date leaf payload: the text exactly as it appeared in the feed, plus its
/// chronological reading when one could be derived.
#[derive(Debug, Clone)]
pub struct FeedDate {
    raw: String,
    parsed: Option<DateTime<FixedOffset>>,
}

impl FeedDate {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = parse_date(&raw);
        if parsed.is_none() && !raw.trim().is_empty() {
            tracing::debug!(date = %raw, "Unrecognized date format, treating as oldest");
        }
        Self { raw, parsed }
    }

    /// The string as it appeared in the feed.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn parsed(&self) -> Option<DateTime<FixedOffset>> {
        self.parsed
    }

    /// Seconds since the Unix epoch, if the date could be read.
    pub fn timestamp(&self) -> Option<i64> {
        self.parsed.map(|dt| dt.timestamp())
    }

    /// True if `self` is strictly later than `other`.
    ///
    /// Unparseable dates sort before every parseable one and tie with each
    /// other. Ties are never newer.
    pub fn is_newer_than(&self, other: &FeedDate) -> bool {
        match (self.parsed, other.parsed) {
            (Some(new), Some(old)) => new > old,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl PartialEq for FeedDate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for FeedDate {}

impl fmt::Display for FeedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Reads the date layouts seen in RSS feeds in the wild.
pub fn parse_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(dt) = parse_rfc822(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    // chrono rejects a weekday that disagrees with the date; the date wins.
    if let Some(dt) = strip_weekday(s).and_then(parse_rfc822) {
        return Some(dt);
    }

    let utc = FixedOffset::east_opt(0)?;
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(utc.from_utc_datetime(&naive));
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn parse_rfc822(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    // Zone abbreviations chrono doesn't know (CEST, IST, ...) are read as UTC.
    let stripped = strip_zone_abbreviation(s)?;
    DateTime::parse_from_rfc2822(&format!("{stripped} +0000")).ok()
}

/// Drops a leading `Ddd, ` (or spelled-out weekday).
fn strip_weekday(s: &str) -> Option<&str> {
    let (day, rest) = s.split_once(',')?;
    if (3..=9).contains(&day.len()) && day.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn strip_zone_abbreviation(s: &str) -> Option<&str> {
    let (head, zone) = s.rsplit_once(' ')?;
    if (2..=5).contains(&zone.len()) && zone.chars().all(|c| c.is_ascii_uppercase()) {
        Some(head)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_rfc2822() {
        let date = FeedDate::new("Tue, 10 Jun 2003 04:00:00 GMT");
        assert_eq!(date.timestamp(), Some(1055217600));
        assert_eq!(date.as_str(), "Tue, 10 Jun 2003 04:00:00 GMT");
    }

    #[test]
    fn test_parses_rfc3339() {
        let date = FeedDate::new("2003-06-10T04:00:00Z");
        assert_eq!(date.timestamp(), Some(1055217600));
    }

    #[test]
    fn test_parses_unknown_zone_abbreviation_as_utc() {
        let date = FeedDate::new("Tue, 10 Jun 2003 04:00:00 CEST");
        assert_eq!(date.timestamp(), Some(1055217600));
    }

    #[test]
    fn test_wrong_weekday_is_ignored() {
        // 10 June 2003 was a Tuesday.
        let date = FeedDate::new("Mon, 10 Jun 2003 04:00:00 GMT");
        assert_eq!(date.timestamp(), Some(1055217600));
        assert!(date.is_newer_than(&FeedDate::new("Mon, 09 Jun 2003 04:00:00 GMT")));

        let date = FeedDate::new("Sunday, 10 Jun 2003 04:00:00 CEST");
        assert_eq!(date.timestamp(), Some(1055217600));
    }

    #[test]
    fn test_parses_date_only() {
        let date = FeedDate::new("2003-06-10");
        assert_eq!(date.timestamp(), Some(1055203200));
    }

    #[test]
    fn test_compares_across_offsets_chronologically() {
        // 04:00 GMT is later than 05:00 +0200 (03:00 GMT).
        let gmt = FeedDate::new("Tue, 10 Jun 2003 04:00:00 GMT");
        let plus_two = FeedDate::new("Tue, 10 Jun 2003 05:00:00 +0200");
        assert!(gmt.is_newer_than(&plus_two));
        assert!(!plus_two.is_newer_than(&gmt));
    }

    #[test]
    fn test_tie_is_not_newer() {
        let a = FeedDate::new("Tue, 10 Jun 2003 04:00:00 GMT");
        let b = FeedDate::new("2003-06-10T04:00:00+00:00");
        assert!(!a.is_newer_than(&b));
        assert!(!b.is_newer_than(&a));
    }

    #[test]
    fn test_unparseable_is_older_than_parseable() {
        let garbage = FeedDate::new("sometime last week");
        let real = FeedDate::new("Tue, 10 Jun 2003 04:00:00 GMT");
        assert!(garbage.parsed().is_none());
        assert!(real.is_newer_than(&garbage));
        assert!(!garbage.is_newer_than(&real));
    }

    #[test]
    fn test_two_unparseable_dates_tie() {
        let a = FeedDate::new("yesterday");
        let b = FeedDate::new("today");
        assert!(!a.is_newer_than(&b));
        assert!(!b.is_newer_than(&a));
    }

    #[test]
    fn test_equality_uses_raw_text() {
        assert_eq!(FeedDate::new("x"), FeedDate::new("x"));
        assert_ne!(
            FeedDate::new("Tue, 10 Jun 2003 04:00:00 GMT"),
            FeedDate::new("2003-06-10T04:00:00Z")
        );
    }
}
