// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::http::{ConditionalGet, HttpClient};

/// Classified result of one conditional fetch. Failures (connection errors,
/// non-2xx statuses other than 304) are reported through `FetchError`.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered 304; the cached content is still current
    Unmodified,
    /// Fresh document bytes plus the validator to send on the next crawl.
    /// A server that sends no validator is tolerated; the next crawl is
    /// simply unconditional.
    Fetched {
        body: Bytes,
        etag: Option<String>,
    },
}

/// Fetch a feed with cache-validation headers. Exactly one network round
/// trip; retry policy belongs to the caller's next scheduled crawl.
pub async fn fetch_conditional<C: HttpClient>(
    client: &C,
    url: &str,
    etag: Option<&str>,
    last_crawled: Option<DateTime<Utc>>,
    user_agent: &str,
) -> Result<FetchOutcome, FetchError> {
    let request = ConditionalGet {
        url,
        etag,
        last_modified: last_crawled.map(|at| at.to_rfc2822()),
        user_agent,
    };

    let response = client
        .get(request)
        .await
        .map_err(|source| FetchError::RequestFailed {
            url: url.to_string(),
            source,
        })?;

    if response.status == 304 {
        return Ok(FetchOutcome::Unmodified);
    }
    if !(200..300).contains(&response.status) {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    Ok(FetchOutcome::Fetched {
        body: response.body,
        etag: response.etag,
    })
}

/// Fetch without validators, used after a relocation hop where the feed
/// identity changed and the cached validator no longer applies.
pub async fn fetch_unconditional<C: HttpClient>(
    client: &C,
    url: &str,
    user_agent: &str,
) -> Result<FetchOutcome, FetchError> {
    fetch_conditional(client, url, None, None, user_agent).await
}
