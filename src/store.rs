// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use url::Url;

use crate::error::StoreError;
use crate::feed::{Episode, Podcast};

/// Timestamp rendering the downstream API expects
const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The downstream data store, specified at its interface boundary.
/// Upserts use lookup-before-insert semantics; concurrent creation races
/// resolve to success with the existing record's id.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn upsert_publisher(&self, name: &str, email: &str) -> Result<i64, StoreError>;
    async fn upsert_podcast(&self, publisher_id: i64, podcast: &Podcast)
    -> Result<i64, StoreError>;
    async fn publish_episode(&self, podcast_id: i64, episode: &Episode) -> Result<(), StoreError>;
}

/// HTTP implementation of [`DataStore`]: bearer-authenticated,
/// form-encoded posts against `<base>/{publisher,podcast,episode}/`.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpStore {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        client: reqwest::Client,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        Ok(self.base_url.join(&format!("{table}/"))?)
    }

    /// Query a table by natural key; `Ok(None)` means no match.
    async fn find(&self, table: &str, filter: &[(&str, String)]) -> Result<Option<i64>, StoreError> {
        let mut url = self.table_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filter {
                if !value.is_empty() {
                    pairs.append_pair(key, value);
                }
            }
        }

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| StoreError::RequestFailed {
                url: url.to_string(),
                source,
            })?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(StoreError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| StoreError::RequestFailed {
                url: url.to_string(),
                source,
            })?;
        let records: Vec<serde_json::Value> =
            serde_json::from_slice(&body).map_err(|source| StoreError::InvalidResponse {
                url: url.to_string(),
                source,
            })?;

        Ok(records.first().and_then(record_id))
    }

    /// Insert a record; empty fields are skipped entirely. `Ok(None)` means
    /// the server reported a duplicate key and the caller should re-query.
    async fn insert(
        &self,
        table: &str,
        fields: &[(&'static str, String)],
    ) -> Result<Option<i64>, StoreError> {
        let url = self.table_url(table)?;
        let form: Vec<(&str, &str)> = fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (*key, value.as_str()))
            .collect();

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.token)
            .form(&form)
            .send()
            .await
            .map_err(|source| StoreError::RequestFailed {
                url: url.to_string(),
                source,
            })?;
        let status = response.status().as_u16();
        if status == 409 {
            return Ok(None);
        }
        if !(200..300).contains(&status) {
            return Err(StoreError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| StoreError::RequestFailed {
                url: url.to_string(),
                source,
            })?;
        let record: serde_json::Value =
            serde_json::from_slice(&body).map_err(|source| StoreError::InvalidResponse {
                url: url.to_string(),
                source,
            })?;

        match record_id(&record) {
            Some(id) => Ok(Some(id)),
            None => Err(StoreError::MissingId {
                url: url.to_string(),
            }),
        }
    }

    async fn upsert(
        &self,
        table: &str,
        filter: &[(&str, String)],
        fields: &[(&'static str, String)],
    ) -> Result<i64, StoreError> {
        if let Some(id) = self.find(table, filter).await? {
            return Ok(id);
        }
        if let Some(id) = self.insert(table, fields).await? {
            return Ok(id);
        }
        // Duplicate-key response: another worker created the record between
        // our lookup and insert, so the re-query must find it.
        match self.find(table, filter).await? {
            Some(id) => Ok(id),
            None => Err(StoreError::MissingId {
                url: self.table_url(table)?.to_string(),
            }),
        }
    }
}

fn record_id(value: &serde_json::Value) -> Option<i64> {
    value.get("id").and_then(|id| id.as_i64())
}

fn render_flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

fn render_duration(duration: &std::time::Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn podcast_fields(publisher_id: i64, podcast: &Podcast) -> Vec<(&'static str, String)> {
    vec![
        ("publisher", publisher_id.to_string()),
        ("title", podcast.title.clone()),
        ("author", podcast.author.clone()),
        ("summary", podcast.summary.clone()),
        ("category", podcast.category.clone()),
        ("explicit", render_flag(podcast.explicit)),
        ("link", podcast.link.clone()),
        ("copyright", podcast.copyright.clone()),
        ("blocked", render_flag(podcast.blocked)),
        ("complete", render_flag(podcast.complete)),
        ("keywords", podcast.keywords.clone()),
    ]
}

fn episode_fields(podcast_id: i64, episode: &Episode) -> Vec<(&'static str, String)> {
    vec![
        ("podcast", podcast_id.to_string()),
        ("title", episode.title.clone().unwrap_or_default()),
        ("link", episode.link.clone().unwrap_or_default()),
        ("subtitle", episode.subtitle.clone().unwrap_or_default()),
        (
            "description",
            episode.description.clone().unwrap_or_default(),
        ),
        (
            "pubdate",
            episode
                .published_at
                .map(|at| at.format(API_DATE_FORMAT).to_string())
                .unwrap_or_default(),
        ),
        (
            "duration",
            episode
                .duration
                .as_ref()
                .map(render_duration)
                .unwrap_or_default(),
        ),
        ("explicit", render_flag(episode.explicit)),
        ("keywords", episode.keywords.clone().unwrap_or_default()),
        ("blocked", render_flag(episode.blocked)),
    ]
}

#[async_trait]
impl DataStore for HttpStore {
    async fn upsert_publisher(&self, name: &str, email: &str) -> Result<i64, StoreError> {
        let filter = [("name", name.to_string())];
        let fields = [
            ("name", name.to_string()),
            ("email", email.to_string()),
        ];
        self.upsert("publisher", &filter, &fields).await
    }

    async fn upsert_podcast(
        &self,
        publisher_id: i64,
        podcast: &Podcast,
    ) -> Result<i64, StoreError> {
        let filter = [
            ("publisher", publisher_id.to_string()),
            ("title", podcast.title.clone()),
        ];
        let fields = podcast_fields(publisher_id, podcast);
        self.upsert("podcast", &filter, &fields).await
    }

    async fn publish_episode(&self, podcast_id: i64, episode: &Episode) -> Result<(), StoreError> {
        // No lookup here: novelty is already established by the diff engine,
        // and a duplicate-key response just means a previous attempt landed.
        self.insert("episode", &episode_fields(podcast_id, episode))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;
    use std::time::Duration;

    fn make_episode() -> Episode {
        Episode {
            guid: Some("guid-1".to_string()),
            title: Some("Episode 1".to_string()),
            link: Some("https://example.com/ep1.mp3".to_string()),
            subtitle: None,
            description: Some("First".to_string()),
            published_at: DateTime::parse_from_rfc2822("Mon, 01 Jan 2024 12:30:45 +0000").ok(),
            duration: Some(Duration::from_secs(3723)),
            explicit: true,
            keywords: None,
            blocked: false,
        }
    }

    #[test]
    fn episode_fields_render_api_formats() {
        let fields = episode_fields(7, &make_episode());
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("podcast"), "7");
        assert_eq!(get("pubdate"), "2024-01-01T12:30:45");
        assert_eq!(get("duration"), "01:02:03");
        assert_eq!(get("explicit"), "true");
        assert_eq!(get("blocked"), "false");
        // absent optional fields render empty and are skipped at send time
        assert_eq!(get("subtitle"), "");
        assert_eq!(get("keywords"), "");
    }

    #[test]
    fn duration_renders_zero_padded() {
        assert_eq!(render_duration(&Duration::from_secs(45)), "00:00:45");
        assert_eq!(render_duration(&Duration::from_secs(750)), "00:12:30");
        assert_eq!(render_duration(&Duration::from_secs(36_000)), "10:00:00");
    }

    #[test]
    fn record_id_reads_numeric_id() {
        assert_eq!(record_id(&serde_json::json!({"id": 42})), Some(42));
        assert_eq!(record_id(&serde_json::json!({"name": "x"})), None);
        assert_eq!(record_id(&serde_json::json!({"id": "42"})), None);
    }

    #[test]
    fn table_url_joins_trailing_slash() {
        let store = HttpStore::new(
            "https://api.example.com/v1/",
            "token",
            reqwest::Client::new(),
        )
        .unwrap();

        assert_eq!(
            store.table_url("episode").unwrap().as_str(),
            "https://api.example.com/v1/episode/"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = HttpStore::new("not a url", "token", reqwest::Client::new());
        assert!(matches!(result, Err(StoreError::InvalidUrl(_))));
    }
}
