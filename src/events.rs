use std::sync::Arc;

/// Lifecycle events emitted during feed synchronization.
///
/// This is the observability port of the engine: failures and milestones
/// are reported as values so tests can capture them without intercepting
/// output streams.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A feed is being fetched
    FetchingFeed { url: String },

    /// The server answered 304; bookkeeping only
    FeedUnmodified { url: String },

    /// The feed declared a new canonical URL
    FeedRelocated { old_url: String, new_url: String },

    /// The feed document was parsed successfully
    FeedParsed {
        url: String,
        podcast_title: String,
        total_episodes: usize,
    },

    /// The feed owner requested blocking; episodes are not published
    FeedBlocked { url: String },

    /// Diffing finished; `count` episodes are unseen
    NewEpisodes { url: String, count: usize },

    /// One episode was handed to the downstream store
    EpisodePublished { url: String, episode: String },

    /// One episode failed to publish; siblings are still attempted
    PublishFailed {
        url: String,
        episode: String,
        error: String,
    },

    /// A pass finished its publishing stage
    PassCompleted {
        url: String,
        published: usize,
        failed: usize,
    },

    /// A pass aborted; other feeds are unaffected
    PassFailed { url: String, error: String },
}

/// Trait for observing synchronization events.
pub trait SyncReporter: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// A shared reference to a reporter
pub type SharedSyncReporter = Arc<dyn SyncReporter>;

/// A no-op reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl SyncReporter for NoopReporter {
    fn report(&self, _event: SyncEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedSyncReporter {
        Arc::new(Self)
    }
}

/// Reporter that forwards events to structured `tracing` logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn shared() -> SharedSyncReporter {
        Arc::new(Self)
    }
}

impl SyncReporter for TracingReporter {
    fn report(&self, event: SyncEvent) {
        match event {
            SyncEvent::FetchingFeed { url } => {
                tracing::debug!(url = %url, "fetching feed");
            }
            SyncEvent::FeedUnmodified { url } => {
                tracing::debug!(url = %url, "feed unmodified");
            }
            SyncEvent::FeedRelocated { old_url, new_url } => {
                tracing::info!(old_url = %old_url, new_url = %new_url, "feed relocated");
            }
            SyncEvent::FeedParsed {
                url,
                podcast_title,
                total_episodes,
            } => {
                tracing::debug!(
                    url = %url,
                    title = %podcast_title,
                    episodes = total_episodes,
                    "feed parsed"
                );
            }
            SyncEvent::FeedBlocked { url } => {
                tracing::warn!(url = %url, "feed blocked by owner, episodes withheld");
            }
            SyncEvent::NewEpisodes { url, count } => {
                tracing::info!(url = %url, count = count, "new episodes detected");
            }
            SyncEvent::EpisodePublished { url, episode } => {
                tracing::debug!(url = %url, episode = %episode, "episode published");
            }
            SyncEvent::PublishFailed {
                url,
                episode,
                error,
            } => {
                tracing::warn!(url = %url, episode = %episode, error = %error, "episode publish failed");
            }
            SyncEvent::PassCompleted {
                url,
                published,
                failed,
            } => {
                tracing::info!(url = %url, published = published, failed = failed, "pass completed");
            }
            SyncEvent::PassFailed { url, error } => {
                tracing::error!(url = %url, error = %error, "pass failed");
            }
        }
    }
}
