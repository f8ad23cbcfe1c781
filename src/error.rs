use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching a feed document
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },
}

/// Errors that can occur while parsing a feed document
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("failed to parse RSS document: {0}")]
    Xml(#[from] rss::Error),

    #[error("feed is missing required field '{field}'")]
    MalformedFeed { field: &'static str },
}

/// Errors that can occur while diffing episodes against the known-id set
#[derive(Error, Debug)]
pub enum DiffError {
    /// An episode without a guid or link cannot be tracked; dropping it
    /// silently could let it be reposted on a later crawl.
    #[error("episode at index {index} has neither guid nor link")]
    UnidentifiableEpisode { index: usize },
}

/// Errors that can occur while talking to the downstream data store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid response body from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {url} carries no record id")]
    MissingId { url: String },

    #[error("invalid data-store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors that can occur in the feed registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read registry file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write registry file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse registry file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize registry: {0}")]
    SerializeFailed(#[from] serde_json::Error),

    #[error("no registry entry for feed {url}")]
    UnknownFeed { url: String },
}

/// Top-level errors for one feed's synchronization pass
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("diff failed: {0}")]
    Diff(#[from] DiffError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("feed relocated more than {max_hops} time(s), last target {url}")]
    TooManyRedirects { url: String, max_hops: usize },
}
