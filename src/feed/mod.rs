pub mod codec;
pub mod extract;
pub mod fetch;
pub mod parse;

pub use fetch::{FetchOutcome, fetch_conditional, fetch_unconditional};
pub use parse::{Episode, ParsedFeed, Podcast, parse_feed};
