//! HTTP fetching for the source page and calendar feeds.
//!
//! Feeds are downloaded concurrently (bounded by `fetch.concurrency`) but
//! [`Fetcher::fetch_all`] always hands results back in the order the links
//! were given, so downstream merging stays deterministic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use calmerge_shared::{CalMergeError, FeedLink, FetchConfig, Result};

/// Maximum response size we accept (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// FeedFetch
// ---------------------------------------------------------------------------

/// Outcome of downloading one feed.
#[derive(Debug)]
pub struct FeedFetch {
    /// The feed that was requested.
    pub link: FeedLink,
    /// Body text on success.
    pub result: Result<String>,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Shared HTTP client for page and feed downloads.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    concurrency: usize,
}

impl Fetcher {
    /// Build a client from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CalMergeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            concurrency: config.concurrency.max(1) as usize,
        })
    }

    /// GET `url` and return the decoded body.
    ///
    /// Non-2xx statuses and oversized bodies are errors. `webcal://` URLs
    /// are requested over `https://`.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_text(&self, url: &Url) -> Result<String> {
        let url = http_url(url)?;
        debug!("fetching");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CalMergeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalMergeError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(CalMergeError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| CalMergeError::Network(format!("{url}: body read failed: {e}")))?;

        if body.len() as u64 > MAX_RESPONSE_SIZE {
            return Err(CalMergeError::validation(format!(
                "{url}: response too large ({} bytes, max {MAX_RESPONSE_SIZE})",
                body.len()
            )));
        }

        debug!(bytes = body.len(), "fetched");
        Ok(body)
    }

    /// Download every feed, returning one [`FeedFetch`] per link in input order.
    ///
    /// A failing feed is reported in its `result`; it never fails the batch.
    #[instrument(skip_all, fields(feeds = links.len(), concurrency = self.concurrency))]
    pub async fn fetch_all(&self, links: &[FeedLink]) -> Vec<FeedFetch> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = links
            .iter()
            .map(|link| {
                let fetcher = self.clone();
                let sem = semaphore.clone();
                let url = link.url().clone();

                tokio::spawn(async move {
                    let _permit = sem
                        .acquire_owned()
                        .await
                        .map_err(|e| CalMergeError::Network(format!("fetch pool closed: {e}")))?;
                    fetcher.fetch_text(&url).await
                })
            })
            .collect();

        // Await in spawn order so results line up with `links`.
        let mut results = Vec::with_capacity(links.len());
        for (link, handle) in links.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CalMergeError::Network(format!("{link}: task failed: {e}"))),
            };
            if let Err(e) = &result {
                warn!(url = %link, error = %e, "feed download failed");
            }
            results.push(FeedFetch {
                link: link.clone(),
                result,
            });
        }

        let failed = results.iter().filter(|f| f.result.is_err()).count();
        info!(
            fetched = results.len() - failed,
            failed,
            duration_ms = start.elapsed().as_millis(),
            "feed downloads finished"
        );

        results
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map `webcal`/`webcals` to `https`; reject anything that is not HTTP(S).
fn http_url(url: &Url) -> Result<Url> {
    match url.scheme() {
        "http" | "https" => Ok(url.clone()),
        "webcal" | "webcals" => {
            let rest = &url.as_str()[url.scheme().len()..];
            Url::parse(&format!("https{rest}"))
                .map_err(|e| CalMergeError::parse(format!("{url}: {e}")))
        }
        other => Err(CalMergeError::validation(format!(
            "{url}: unsupported scheme '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(concurrency: u32) -> Fetcher {
        let config = FetchConfig {
            concurrency,
            timeout_secs: 5,
            ..FetchConfig::default()
        };
        Fetcher::new(&config).unwrap()
    }

    fn link(server: &MockServer, p: &str) -> FeedLink {
        FeedLink::new(Url::parse(&format!("{}{p}", server.uri())).unwrap())
    }

    #[test]
    fn webcal_maps_to_https() {
        let url = Url::parse("webcal://cal.example/games.ics?team=1").unwrap();
        assert_eq!(
            http_url(&url).unwrap().as_str(),
            "https://cal.example/games.ics?team=1"
        );
    }

    #[test]
    fn non_http_scheme_rejected() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(http_url(&url).is_err());
        let url = Url::parse("mailto:info@club.example").unwrap();
        assert!(http_url(&url).is_err());
    }

    #[tokio::test]
    async fn fetch_text_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/team.ics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("BEGIN:VCALENDAR"))
            .mount(&server)
            .await;

        let body = fetcher(2)
            .fetch_text(link(&server, "/team.ics").url())
            .await
            .unwrap();
        assert_eq!(body, "BEGIN:VCALENDAR");
    }

    #[tokio::test]
    async fn fetch_text_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.ics"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher(2)
            .fetch_text(link(&server, "/gone.ics").url())
            .await
            .unwrap_err();
        assert!(matches!(err, CalMergeError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn fetch_all_keeps_link_order() {
        let server = MockServer::start().await;

        // The first feed is the slowest; results must still come back first.
        Mock::given(path("/a.ics"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("A")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(path("/b.ics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(path("/c.ics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("C"))
            .mount(&server)
            .await;

        let links = vec![
            link(&server, "/a.ics"),
            link(&server, "/b.ics"),
            link(&server, "/c.ics"),
        ];
        let results = fetcher(3).fetch_all(&links).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].link, links[0]);
        assert_eq!(results[0].result.as_deref().unwrap(), "A");
        assert!(results[1].result.is_err());
        assert_eq!(results[2].result.as_deref().unwrap(), "C");
    }

    #[tokio::test]
    async fn fetch_all_with_single_permit() {
        let server = MockServer::start().await;
        Mock::given(path("/x.ics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("X"))
            .expect(2)
            .mount(&server)
            .await;

        let links = vec![link(&server, "/x.ics"), link(&server, "/x.ics")];
        let results = fetcher(1).fetch_all(&links).await;
        assert!(results.iter().all(|f| f.result.is_ok()));
    }
}
