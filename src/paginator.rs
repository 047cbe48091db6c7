use rand::Rng;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::config::Settings;
use crate::error::SearchError;
use crate::models::PendingRequest;
use crate::progress::Reporter;

/// Statuses retried with backoff before being surfaced. 429 is deliberately
/// absent: throttling truncates the walk instead of retrying.
const RETRYABLE_STATUSES: [StatusCode; 3] = [
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

const MAX_ATTEMPTS: u32 = 3;

/// Walk one paginated collection to exhaustion, applying `transform` to every
/// record of every page.
///
/// Follows the `Link: rel="next"` header, mutating the cursor in place: the
/// URL is replaced with the next-page link and the query parameters are
/// cleared, since keyset links already carry their own. Between pages the
/// walk pauses for a uniformly random duration in `[0, max_jitter_secs]`.
///
/// A 429 answer ends the walk early and returns what was accumulated so far.
/// Any other non-success status is an error. The settings' max page depth
/// bounds the walk against misbehaving `next` chains.
pub async fn paginate<T, F>(
    client: &Client,
    settings: &Settings,
    mut request: PendingRequest,
    transform: F,
    max_jitter_secs: f64,
    reporter: &Reporter,
) -> Result<Vec<T>, SearchError>
where
    F: Fn(Value) -> Result<T, SearchError>,
{
    let mut collected = Vec::new();

    for page in 0..settings.max_page_depth {
        if page > 0 && max_jitter_secs > 0.0 {
            let pause = rand::rng().random_range(0.0..=max_jitter_secs);
            sleep(Duration::from_secs_f64(pause)).await;
        }

        debug!("URL: {} PARAMS: {:?}", request.url, request.params);

        let response = get_with_retry(client, &request).await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            reporter.println(&format!(
                "URL: {} PARAMS: {:?} HttpStatus Code 429 SKIP this search",
                request.url, request.params
            ));
            break;
        }
        if !status.is_success() {
            return Err(SearchError::Status {
                status,
                url: request.url.clone(),
            });
        }

        let next = next_page_url(response.headers());

        let records: Vec<Value> = serde_json::from_str(&response.text().await?)?;
        for record in records {
            collected.push(transform(record)?);
        }

        match next {
            Some(url) => {
                request.url = url;
                request.params.clear();
            }
            None => break,
        }
    }

    Ok(collected)
}

/// Issue one GET, retrying a bounded number of times with doubling backoff
/// when the status is a transient gateway failure.
async fn get_with_retry(
    client: &Client,
    request: &PendingRequest,
) -> Result<Response, SearchError> {
    let mut attempt = 1;
    loop {
        let response = client
            .get(request.url.as_str())
            .query(&request.params)
            .send()
            .await?;

        if attempt < MAX_ATTEMPTS && RETRYABLE_STATUSES.contains(&response.status()) {
            let backoff = Duration::from_secs(1 << (attempt - 1));
            debug!(
                "status {} for {}, retrying in {:?}",
                response.status(),
                request.url,
                backoff
            );
            sleep(backoff).await;
            attempt += 1;
            continue;
        }

        return Ok(response);
    }
}

/// Extract the `rel="next"` target from an RFC 5988 `Link` header.
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;

    for part in link.split(',') {
        let mut sections = part.split(';');
        let target = sections.next()?.trim();
        if sections.any(|param| param.trim() == r#"rel="next""#) {
            return Some(
                target
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            );
        }
    }

    None
}
