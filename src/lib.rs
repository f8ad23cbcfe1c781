pub mod diff;
pub mod error;
pub mod events;
pub mod feed;
pub mod http;
pub mod registry;
pub mod store;
pub mod sync;

// Re-export main types for convenience
pub use diff::{EpisodeDiff, diff_episodes};
pub use error::{DiffError, FeedError, FetchError, RegistryError, StoreError, SyncError};
pub use events::{
    NoopReporter, SharedSyncReporter, SyncEvent, SyncReporter, TracingReporter,
};
pub use feed::{
    Episode, FetchOutcome, ParsedFeed, Podcast, fetch_conditional, fetch_unconditional, parse_feed,
};
pub use http::{ConditionalGet, HttpClient, RawResponse, ReqwestClient};
pub use registry::{FeedRegistry, FeedSource, JsonFileRegistry};
pub use store::{DataStore, HttpStore};
pub use sync::{PassReport, SyncOptions, SyncSummary, sync_all, sync_feed};
