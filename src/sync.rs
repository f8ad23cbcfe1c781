// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::Utc;
use futures::StreamExt;
use futures::stream;

use crate::diff::diff_episodes;
use crate::error::{FetchError, SyncError};
use crate::events::{SharedSyncReporter, SyncEvent};
use crate::feed::{FetchOutcome, ParsedFeed, fetch_conditional, fetch_unconditional, parse_feed};
use crate::http::HttpClient;
use crate::registry::{FeedRegistry, FeedSource};
use crate::store::DataStore;

/// Options for feed synchronization
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Identifying string sent with every feed request
    pub user_agent: String,
    /// Maximum relocation hops followed within one pass
    pub max_redirects: usize,
    /// Maximum number of feeds synchronized concurrently
    pub max_concurrent: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("feedsync/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 1,
            max_concurrent: 4,
        }
    }
}

/// Outcome of one feed's pass
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub published: usize,
    pub failed: usize,
    pub unmodified: bool,
    pub blocked: bool,
}

/// Aggregate outcome of one crawl cycle over every registered feed
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub feeds: usize,
    pub synced: usize,
    pub failed: usize,
    pub episodes_published: usize,
    pub episodes_failed: usize,
}

/// Run one synchronization pass for a single feed:
/// fetch -> parse -> (relocate) -> diff -> publish -> persist.
///
/// The registry is saved exactly as much as the pass earned: a failed fetch
/// leaves the record untouched; a successful fetch always persists the crawl
/// timestamp; a malformed document additionally persists the new validator
/// (so a permanently broken feed is not refetched unconditionally forever);
/// known-id updates land once the publishing stage was reached; and the
/// validator lands only when publishing at least partially succeeded, so a
/// pass whose every publish failed still refetches and retries next time.
pub async fn sync_feed<C, S, R>(
    client: &C,
    store: &S,
    registry: &R,
    mut source: FeedSource,
    options: &SyncOptions,
    reporter: &SharedSyncReporter,
) -> Result<PassReport, SyncError>
where
    C: HttpClient,
    S: DataStore,
    R: FeedRegistry,
{
    // Registry saves key by the record's currently-persisted URL; a
    // relocation save rewrites it, so the key follows along.
    let mut registry_key = source.url.clone();

    reporter.report(SyncEvent::FetchingFeed {
        url: source.url.clone(),
    });

    let outcome = fetch_conditional(
        client,
        &source.url,
        source.etag.as_deref(),
        source.last_crawled,
        &options.user_agent,
    )
    .await?;

    source.last_crawled = Some(Utc::now());

    let (mut document, mut etag) = match outcome {
        FetchOutcome::Unmodified => {
            registry.save(&registry_key, &source)?;
            reporter.report(SyncEvent::FeedUnmodified { url: source.url });
            return Ok(PassReport {
                unmodified: true,
                ..Default::default()
            });
        }
        FetchOutcome::Fetched { body, etag } => (body, etag),
    };

    let mut hops = 0;
    let (podcast, episodes) = loop {
        let parsed = match parse_feed(&document) {
            Ok(parsed) => parsed,
            Err(error) => {
                // The fetch succeeded, so the new validator is persisted even
                // though the document is unusable.
                source.etag = etag;
                registry.save(&registry_key, &source)?;
                return Err(error.into());
            }
        };

        match parsed {
            ParsedFeed::Feed { podcast, episodes } => break (podcast, episodes),
            ParsedFeed::Relocated { new_url } => {
                if hops >= options.max_redirects {
                    return Err(SyncError::TooManyRedirects {
                        url: new_url,
                        max_hops: options.max_redirects,
                    });
                }
                hops += 1;

                reporter.report(SyncEvent::FeedRelocated {
                    old_url: source.url.clone(),
                    new_url: new_url.clone(),
                });

                // Persist the new location before further processing so
                // future crawls target it even if this pass fails later.
                source.url = new_url;
                source.etag = None;
                registry.save(&registry_key, &source)?;
                registry_key = source.url.clone();

                match fetch_unconditional(client, &source.url, &options.user_agent).await? {
                    FetchOutcome::Fetched {
                        body,
                        etag: new_etag,
                    } => {
                        document = body;
                        etag = new_etag;
                        source.last_crawled = Some(Utc::now());
                    }
                    FetchOutcome::Unmodified => {
                        // 304 without validators is a protocol violation
                        return Err(FetchError::HttpStatus {
                            url: source.url.clone(),
                            status: 304,
                        }
                        .into());
                    }
                }
            }
        }
    };

    reporter.report(SyncEvent::FeedParsed {
        url: source.url.clone(),
        podcast_title: podcast.title.clone(),
        total_episodes: episodes.len(),
    });

    if podcast.blocked {
        // Bookkeeping still happens for a blocked feed; its episodes are
        // withheld and the known-id set is left alone so a later unblock
        // publishes the backlog.
        source.etag = etag;
        registry.save(&registry_key, &source)?;
        reporter.report(SyncEvent::FeedBlocked { url: source.url });
        return Ok(PassReport {
            blocked: true,
            ..Default::default()
        });
    }

    let publisher_id = match store
        .upsert_publisher(&podcast.owner_name, &podcast.owner_email)
        .await
    {
        Ok(id) => id,
        Err(error) => {
            registry.save(&registry_key, &source)?;
            return Err(error.into());
        }
    };
    let podcast_id = match store.upsert_podcast(publisher_id, &podcast).await {
        Ok(id) => id,
        Err(error) => {
            registry.save(&registry_key, &source)?;
            return Err(error.into());
        }
    };

    let diff = match diff_episodes(&episodes, &source.known_guids) {
        Ok(diff) => diff,
        Err(error) => {
            registry.save(&registry_key, &source)?;
            return Err(error.into());
        }
    };

    reporter.report(SyncEvent::NewEpisodes {
        url: source.url.clone(),
        count: diff.new_episodes.len(),
    });

    let mut known_ids = diff.known_ids;
    let mut published = 0usize;
    let mut failed = 0usize;
    for episode in &diff.new_episodes {
        let label = episode
            .title
            .as_deref()
            .or_else(|| episode.identity())
            .unwrap_or_default()
            .to_string();

        match store.publish_episode(podcast_id, episode).await {
            Ok(()) => {
                published += 1;
                reporter.report(SyncEvent::EpisodePublished {
                    url: source.url.clone(),
                    episode: label,
                });
            }
            Err(error) => {
                failed += 1;
                reporter.report(SyncEvent::PublishFailed {
                    url: source.url.clone(),
                    episode: label,
                    error: error.to_string(),
                });
                // Withhold the identity so the episode is retried on the
                // next crawl; siblings are still attempted.
                if let Some(id) = episode.identity() {
                    known_ids.remove(id);
                }
            }
        }
    }

    source.known_guids = known_ids;
    if published > 0 || failed == 0 {
        source.etag = etag;
    }
    // When every publish failed the old validator stays, so the next crawl
    // refetches the content and retries the withheld episodes.
    registry.save(&registry_key, &source)?;

    reporter.report(SyncEvent::PassCompleted {
        url: source.url,
        published,
        failed,
    });

    Ok(PassReport {
        published,
        failed,
        ..Default::default()
    })
}

/// Synchronize every registered feed once. Feeds run through a bounded
/// concurrency pool; each worker exclusively owns its `FeedSource` for the
/// duration of the pass, and one feed's failure never affects another.
pub async fn sync_all<C, S, R>(
    client: &C,
    store: &S,
    registry: &R,
    options: &SyncOptions,
    reporter: &SharedSyncReporter,
) -> Result<SyncSummary, SyncError>
where
    C: HttpClient,
    S: DataStore,
    R: FeedRegistry,
{
    let sources = registry.load_all()?;

    let mut summary = SyncSummary {
        feeds: sources.len(),
        ..Default::default()
    };

    let results: Vec<(String, Result<PassReport, SyncError>)> = stream::iter(sources)
        .map(|source| {
            let url = source.url.clone();
            async move {
                let result = sync_feed(client, store, registry, source, options, reporter).await;
                (url, result)
            }
        })
        .buffer_unordered(options.max_concurrent.max(1))
        .collect()
        .await;

    for (url, result) in results {
        match result {
            Ok(report) => {
                summary.synced += 1;
                summary.episodes_published += report.published;
                summary.episodes_failed += report.failed;
            }
            Err(error) => {
                summary.failed += 1;
                reporter.report(SyncEvent::PassFailed {
                    url,
                    error: error.to_string(),
                });
            }
        }
    }

    Ok(summary)
}
