// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of the heterogeneous duration and publish-date encodings found
//! in the wild. Both return `None` on unparsable input; neither is ever
//! fatal to the surrounding episode.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};

/// Parse an iTunes duration by sniffing the colon count:
/// no colons is plain seconds, one is minutes:seconds, two is
/// hours:minutes:seconds.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let seconds = match parts.as_slice() {
        [secs] => secs.parse::<u64>().ok()?,
        [mins, secs] => mins
            .parse::<u64>()
            .ok()?
            .checked_mul(60)?
            .checked_add(secs.parse::<u64>().ok()?)?,
        [hours, mins, secs] => hours
            .parse::<u64>()
            .ok()?
            .checked_mul(60)?
            .checked_add(mins.parse::<u64>().ok()?)?
            .checked_mul(60)?
            .checked_add(secs.parse::<u64>().ok()?)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

/// Alternative layouts tried after RFC 2822, in order. The first is the
/// seconds-less RFC 2822 shape some feeds emit.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M %z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Parse a publish date against RFC 2822 and a fixed fallback order.
pub fn parse_pub_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed);
    }
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(text, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_without_colons_is_seconds() {
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
    }

    #[test]
    fn duration_with_one_colon_is_minutes_seconds() {
        assert_eq!(parse_duration("12:30"), Some(Duration::from_secs(750)));
    }

    #[test]
    fn duration_with_two_colons_is_hours_minutes_seconds() {
        assert_eq!(parse_duration("1:02:03"), Some(Duration::from_secs(3723)));
    }

    #[test]
    fn unparsable_duration_is_omitted() {
        assert_eq!(parse_duration("x:y"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
    }

    #[test]
    fn duration_overflowing_u64_seconds_is_omitted() {
        assert_eq!(parse_duration("307445734561825862:00"), None);
        assert_eq!(parse_duration("18446744073709551615:59:59"), None);
    }

    #[test]
    fn duration_tolerates_surrounding_whitespace() {
        assert_eq!(parse_duration(" 30:00 "), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn pub_date_parses_rfc2822() {
        let parsed = parse_pub_date("Mon, 01 Jan 2024 12:00:00 +0000").unwrap();
        assert_eq!(parsed.timestamp(), 1_704_110_400);
    }

    #[test]
    fn pub_date_falls_back_to_seconds_less_layout() {
        assert!(parse_pub_date("Mon, 01 Jan 2024 12:00 +0000").is_some());
    }

    #[test]
    fn pub_date_falls_back_to_iso_layout() {
        assert!(parse_pub_date("2024-01-01T12:00:00+00:00").is_some());
    }

    #[test]
    fn unparsable_pub_date_is_omitted() {
        assert_eq!(parse_pub_date("yesterday"), None);
    }
}
