// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::error::FeedError;

use super::codec::{parse_duration, parse_pub_date};
use super::extract::{clean_text, flag, optional, optional_text, required, required_flag};

/// Channel-level descriptor of a podcast. All text fields are normalized
/// (entities unescaped, whitespace collapsed); immutable after parse.
#[derive(Debug, Clone)]
pub struct Podcast {
    pub title: String,
    pub author: String,
    pub image_url: String,
    pub summary: String,
    pub category: String,
    pub explicit: bool,
    pub link: String,
    pub language: String,
    pub copyright: String,
    pub blocked: bool,
    pub complete: bool,
    pub keywords: String,
    pub owner_name: String,
    pub owner_email: String,
}

/// One item-level entry of a feed, in document order.
#[derive(Debug, Clone)]
pub struct Episode {
    pub guid: Option<String>,
    pub title: Option<String>,
    /// Enclosure URL when present, otherwise the item `<link>` text
    pub link: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub duration: Option<Duration>,
    pub explicit: bool,
    pub keywords: Option<String>,
    pub blocked: bool,
}

impl Episode {
    /// Durable identity used for novelty diffing: the declared guid, or the
    /// link as fallback. `None` means the episode is untrackable.
    pub fn identity(&self) -> Option<&str> {
        self.guid.as_deref().or(self.link.as_deref())
    }
}

/// Result of parsing one feed document.
///
/// A relocated feed's transitional representation may lack most fields, so
/// the relocation marker is checked before any required field is touched.
#[derive(Debug, Clone)]
pub enum ParsedFeed {
    Relocated {
        new_url: String,
    },
    Feed {
        podcast: Podcast,
        episodes: Vec<Episode>,
    },
}

/// Parse RSS feed XML bytes into a podcast descriptor and its full episode
/// list, eagerly and in document order.
pub fn parse_feed(xml: &[u8]) -> Result<ParsedFeed, FeedError> {
    let channel = rss::Channel::read_from(xml)?;
    let itunes = channel.itunes_ext();

    if let Some(new_url) = itunes.and_then(|ext| ext.new_feed_url()) {
        return Ok(ParsedFeed::Relocated {
            new_url: new_url.trim().to_string(),
        });
    }

    let author = required(itunes.and_then(|ext| ext.author()), "itunes:author")?;

    // Owner name falls back to the author when the owner block is absent or
    // carries no name; the email then defaults to empty.
    let owner = itunes.and_then(|ext| ext.owner());
    let owner_name = owner
        .and_then(|o| o.name())
        .map(clean_text)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| author.clone());
    let owner_email = optional_text(owner.and_then(|o| o.email()));

    let image_url = itunes
        .and_then(|ext| ext.image())
        .or_else(|| channel.image().map(|img| img.url()));
    let category = itunes
        .and_then(|ext| ext.categories().first())
        .map(|category| category.text());

    let podcast = Podcast {
        title: required(Some(channel.title()), "title")?,
        author,
        image_url: required(image_url, "itunes:image")?,
        summary: optional_text(itunes.and_then(|ext| ext.summary())),
        category: required(category, "itunes:category")?,
        explicit: required_flag(itunes.and_then(|ext| ext.explicit()), "itunes:explicit")?,
        link: required(Some(channel.link()), "link")?,
        language: required(channel.language(), "language")?,
        copyright: optional_text(channel.copyright()),
        blocked: flag(itunes.and_then(|ext| ext.block()), false),
        complete: flag(itunes.and_then(|ext| ext.complete()), false),
        keywords: optional_text(itunes.and_then(|ext| ext.keywords())),
        owner_name,
        owner_email,
    };

    let episodes = channel.items().iter().map(parse_episode).collect();

    Ok(ParsedFeed::Feed { podcast, episodes })
}

fn parse_episode(item: &rss::Item) -> Episode {
    let itunes = item.itunes_ext();

    let link = item
        .enclosure()
        .map(|enclosure| enclosure.url().trim().to_string())
        .filter(|url| !url.is_empty())
        .or_else(|| {
            item.link()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
        });

    let guid = item
        .guid()
        .map(|guid| guid.value().trim().to_string())
        .filter(|guid| !guid.is_empty());

    let published_at = item.pub_date().and_then(|raw| {
        let parsed = parse_pub_date(raw);
        if parsed.is_none() {
            tracing::warn!(pub_date = raw, "unparsable publish date, omitting");
        }
        parsed
    });

    let duration = itunes.and_then(|ext| ext.duration()).and_then(|raw| {
        let parsed = parse_duration(raw);
        if parsed.is_none() {
            tracing::warn!(duration = raw, "unparsable duration, omitting");
        }
        parsed
    });

    Episode {
        guid,
        title: optional(item.title()),
        link,
        subtitle: optional(itunes.and_then(|ext| ext.subtitle())),
        description: optional(
            item.description()
                .or_else(|| itunes.and_then(|ext| ext.summary())),
        ),
        published_at,
        duration,
        explicit: flag(itunes.and_then(|ext| ext.explicit()), false),
        keywords: optional(itunes.and_then(|ext| ext.keywords())),
        blocked: flag(itunes.and_then(|ext| ext.block()), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Test &amp; Podcast</title>
    <link>https://example.com</link>
    <language>en-us</language>
    <copyright>© 2024 Example</copyright>
    <itunes:author>Test Author</itunes:author>
    <itunes:summary>A test   podcast</itunes:summary>
    <itunes:image href="https://example.com/image.jpg"/>
    <itunes:category text="Technology"/>
    <itunes:explicit>no</itunes:explicit>
    <itunes:keywords>tests, podcasts</itunes:keywords>
    <itunes:owner>
      <itunes:name>Owner Name</itunes:name>
      <itunes:email>owner@example.com</itunes:email>
    </itunes:owner>
    <item>
      <title>Episode 1</title>
      <description>First episode</description>
      <pubDate>Mon, 01 Jan 2024 12:00:00 +0000</pubDate>
      <guid>ep1-guid</guid>
      <enclosure url="https://example.com/ep1.mp3" length="1234567" type="audio/mpeg"/>
      <itunes:subtitle>The first one</itunes:subtitle>
      <itunes:duration>30:00</itunes:duration>
      <itunes:explicit>yes</itunes:explicit>
    </item>
    <item>
      <title>Episode 2</title>
      <link>https://example.com/ep2</link>
      <itunes:duration>x:y</itunes:duration>
    </item>
  </channel>
</rss>"#;

    fn parse_sample() -> (Podcast, Vec<Episode>) {
        match parse_feed(SAMPLE_FEED.as_bytes()).unwrap() {
            ParsedFeed::Feed { podcast, episodes } => (podcast, episodes),
            ParsedFeed::Relocated { new_url } => panic!("unexpected relocation to {new_url}"),
        }
    }

    #[test]
    fn parse_feed_extracts_channel_fields() {
        let (podcast, _) = parse_sample();

        assert_eq!(podcast.title, "Test & Podcast");
        assert_eq!(podcast.author, "Test Author");
        assert_eq!(podcast.image_url, "https://example.com/image.jpg");
        assert_eq!(podcast.summary, "A test podcast");
        assert_eq!(podcast.category, "Technology");
        assert!(!podcast.explicit);
        assert_eq!(podcast.link, "https://example.com");
        assert_eq!(podcast.language, "en-us");
        assert_eq!(podcast.copyright, "© 2024 Example");
        assert_eq!(podcast.keywords, "tests, podcasts");
        assert_eq!(podcast.owner_name, "Owner Name");
        assert_eq!(podcast.owner_email, "owner@example.com");
        assert!(!podcast.blocked);
        assert!(!podcast.complete);
    }

    #[test]
    fn parse_feed_extracts_episodes_in_document_order() {
        let (_, episodes) = parse_sample();

        assert_eq!(episodes.len(), 2);

        let first = &episodes[0];
        assert_eq!(first.guid.as_deref(), Some("ep1-guid"));
        assert_eq!(first.title.as_deref(), Some("Episode 1"));
        assert_eq!(first.link.as_deref(), Some("https://example.com/ep1.mp3"));
        assert_eq!(first.subtitle.as_deref(), Some("The first one"));
        assert_eq!(first.description.as_deref(), Some("First episode"));
        assert_eq!(first.duration, Some(Duration::from_secs(1800)));
        assert!(first.explicit);
        assert!(first.published_at.is_some());
    }

    #[test]
    fn episode_optional_fields_are_omitted_when_absent() {
        let (_, episodes) = parse_sample();
        let second = &episodes[1];

        assert!(second.guid.is_none());
        assert!(second.subtitle.is_none());
        assert!(second.description.is_none());
        assert!(second.published_at.is_none());
        // unparsable duration is omitted, not fatal
        assert!(second.duration.is_none());
        assert!(!second.explicit);
        assert!(!second.blocked);
    }

    #[test]
    fn episode_identity_falls_back_to_link() {
        let (_, episodes) = parse_sample();

        assert_eq!(episodes[0].identity(), Some("ep1-guid"));
        assert_eq!(episodes[1].identity(), Some("https://example.com/ep2"));
    }

    #[test]
    fn relocation_marker_short_circuits_required_fields() {
        // Transitional document: nothing but the relocation marker
        let moved = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <itunes:new-feed-url>https://new.example.com/feed.xml</itunes:new-feed-url>
  </channel>
</rss>"#;

        match parse_feed(moved.as_bytes()).unwrap() {
            ParsedFeed::Relocated { new_url } => {
                assert_eq!(new_url, "https://new.example.com/feed.xml");
            }
            ParsedFeed::Feed { .. } => panic!("expected relocation"),
        }
    }

    #[test]
    fn missing_channel_explicit_is_malformed() {
        let feed = SAMPLE_FEED.replace("<itunes:explicit>no</itunes:explicit>", "");
        match parse_feed(feed.as_bytes()) {
            Err(FeedError::MalformedFeed { field }) => assert_eq!(field, "itunes:explicit"),
            other => panic!("expected MalformedFeed, got {other:?}"),
        }
    }

    #[test]
    fn missing_channel_author_is_malformed() {
        let feed = SAMPLE_FEED.replace("<itunes:author>Test Author</itunes:author>", "");
        assert!(matches!(
            parse_feed(feed.as_bytes()),
            Err(FeedError::MalformedFeed {
                field: "itunes:author"
            })
        ));
    }

    #[test]
    fn missing_optional_channel_fields_default_to_empty() {
        let feed = SAMPLE_FEED
            .replace("<itunes:summary>A test   podcast</itunes:summary>", "")
            .replace("<copyright>© 2024 Example</copyright>", "")
            .replace("<itunes:keywords>tests, podcasts</itunes:keywords>", "");
        let ParsedFeed::Feed { podcast, .. } = parse_feed(feed.as_bytes()).unwrap() else {
            panic!("expected feed");
        };

        assert_eq!(podcast.summary, "");
        assert_eq!(podcast.copyright, "");
        assert_eq!(podcast.keywords, "");
    }

    #[test]
    fn owner_name_falls_back_to_author() {
        let feed = SAMPLE_FEED.replace(
            r#"    <itunes:owner>
      <itunes:name>Owner Name</itunes:name>
      <itunes:email>owner@example.com</itunes:email>
    </itunes:owner>
"#,
            "",
        );
        let ParsedFeed::Feed { podcast, .. } = parse_feed(feed.as_bytes()).unwrap() else {
            panic!("expected feed");
        };

        assert_eq!(podcast.owner_name, "Test Author");
        assert_eq!(podcast.owner_email, "");
    }

    #[test]
    fn blocked_channel_flag_is_parsed() {
        let feed = SAMPLE_FEED.replace(
            "<itunes:explicit>no</itunes:explicit>",
            "<itunes:explicit>no</itunes:explicit><itunes:block>Yes</itunes:block>",
        );
        let ParsedFeed::Feed { podcast, .. } = parse_feed(feed.as_bytes()).unwrap() else {
            panic!("expected feed");
        };

        assert!(podcast.blocked);
    }
}
