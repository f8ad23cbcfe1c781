// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Field extraction helpers shared by the feed parser.
//!
//! Each descriptor field has one of three presence policies: required
//! (missing fails the feed), optional-with-default, or optional-omitted.
//! The helpers here make the policy explicit at every call site.

use crate::error::FeedError;

/// Unescape HTML/XML entities and collapse all runs of whitespace to a
/// single space, trimming the ends.
pub fn clean_text(raw: &str) -> String {
    let unescaped = html_escape::decode_html_entities(raw);
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Required field: absent or effectively empty fails the feed.
pub fn required(value: Option<&str>, field: &'static str) -> Result<String, FeedError> {
    match value.map(clean_text).filter(|text| !text.is_empty()) {
        Some(text) => Ok(text),
        None => Err(FeedError::MalformedFeed { field }),
    }
}

/// Optional field defaulting to the empty string when absent.
pub fn optional_text(value: Option<&str>) -> String {
    value.map(clean_text).unwrap_or_default()
}

/// Optional field omitted entirely when absent.
pub fn optional(value: Option<&str>) -> Option<String> {
    value.map(clean_text)
}

fn truthy(text: &str) -> bool {
    text.trim() != "no"
}

/// Ternary flag text: "no" means false, anything else means true.
/// `missing` supplies the field-specific default on absence.
pub fn flag(value: Option<&str>, missing: bool) -> bool {
    value.map(truthy).unwrap_or(missing)
}

/// Ternary flag that must be present; missing fails the feed. This is a
/// distinct policy from [`flag`]: the channel-level explicit marker has no
/// default while the episode-level one defaults to false.
pub fn required_flag(value: Option<&str>, field: &'static str) -> Result<bool, FeedError> {
    value
        .map(truthy)
        .ok_or(FeedError::MalformedFeed { field })
}
