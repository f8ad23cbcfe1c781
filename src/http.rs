// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header;

/// A conditional GET request for a feed document.
///
/// `etag` and `last_modified` become `If-None-Match` and `If-Modified-Since`
/// when present, letting the server answer 304 instead of resending the body.
#[derive(Debug, Clone)]
pub struct ConditionalGet<'a> {
    pub url: &'a str,
    pub etag: Option<&'a str>,
    /// RFC 2822 rendering of the last crawl time
    pub last_modified: Option<String>,
    pub user_agent: &'a str,
}

impl<'a> ConditionalGet<'a> {
    /// A request carrying no cache validators (used for relocation hops,
    /// where the feed identity has changed)
    pub fn unconditional(url: &'a str, user_agent: &'a str) -> Self {
        Self {
            url,
            etag: None,
            last_modified: None,
            user_agent,
        }
    }
}

/// Raw HTTP response: status, cache validator, and the full body
pub struct RawResponse {
    pub status: u16,
    /// `ETag` response header, if the server sent one
    pub etag: Option<String>,
    pub body: Bytes,
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform exactly one GET round trip with the given validators
    async fn get(&self, request: ConditionalGet<'_>) -> Result<RawResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    /// (e.g. one carrying a per-request timeout)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, request: ConditionalGet<'_>) -> Result<RawResponse, reqwest::Error> {
        let mut builder = self
            .client
            .get(request.url)
            .header(header::USER_AGENT, request.user_agent);

        if let Some(etag) = request.etag {
            builder = builder.header(header::IF_NONE_MATCH, etag);
        }
        if let Some(since) = &request.last_modified {
            builder = builder.header(header::IF_MODIFIED_SINCE, since.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        Ok(RawResponse { status, etag, body })
    }
}
