//! OpenAlex API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - Fixed inter-request delay (OpenAlex polite pool)
//! - Response caching keyed by request
//! - Cursor pagination over the works endpoint

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult, TimelineError, TimelineResult};
use crate::models::{AuthorRecord, CareerSpan, Work, WorksPage, openalex_key};
use crate::sources::CareerSpanResolver;

/// OpenAlex API client.
#[derive(Clone)]
pub struct OpenAlexClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Response cache.
    cache: Cache<String, serde_json::Value>,

    /// Polite-pool contact (optional).
    mailto: Option<String>,

    /// API base URL.
    api_url: String,

    /// Rate limit delay.
    rate_limit_delay: Duration,
}

impl OpenAlexClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, reqwest::header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("coauthor-timeline/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(3);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = Cache::builder()
            .max_capacity(config.cache_max_size)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            client,
            cache,
            mailto: config.mailto.clone(),
            api_url: config.api_url.clone(),
            rate_limit_delay: config.rate_limit_delay,
        })
    }

    /// Check if a polite-pool contact is configured.
    #[must_use]
    pub fn has_mailto(&self) -> bool {
        self.mailto.is_some()
    }

    /// Fetch one page of an author's works for a year.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn works_page(&self, author_id: &str, year: i32, cursor: &str) -> ClientResult<WorksPage> {
        let url = format!("{}/works", self.api_url);
        let params = vec![
            (
                "filter".to_string(),
                format!("publication_year:{year},authorships.author.id:{}", openalex_key(author_id)),
            ),
            ("per-page".to_string(), api::PAGE_SIZE.to_string()),
            ("cursor".to_string(), cursor.to_string()),
        ];

        self.get(&url, &params).await
    }

    /// Fetch every work of an author in one year, following cursors.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn works_for_author_year(&self, author_id: &str, year: i32) -> ClientResult<Vec<Work>> {
        let mut works = Vec::new();
        let mut cursor = "*".to_string();

        loop {
            let page = self.works_page(author_id, year, &cursor).await?;
            let fetched = page.results.len();
            works.extend(page.results);

            match page.meta.next_cursor {
                Some(next) if fetched > 0 => cursor = next,
                _ => break,
            }
        }

        tracing::debug!(author_id, year, works = works.len(), "Fetched works");
        Ok(works)
    }

    /// Fetch an author's earliest work by publication date.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn earliest_work(&self, author_id: &str) -> ClientResult<Option<Work>> {
        let url = format!("{}/works", self.api_url);
        let params = vec![
            ("filter".to_string(), format!("authorships.author.id:{}", openalex_key(author_id))),
            ("sort".to_string(), "publication_date:asc".to_string()),
            ("per-page".to_string(), "1".to_string()),
        ];

        let page: WorksPage = self.get(&url, &params).await?;
        Ok(page.results.into_iter().next())
    }

    /// Get an author by ID.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_author(&self, author_id: &str) -> ClientResult<AuthorRecord> {
        let url = format!("{}/authors/{}", self.api_url, openalex_key(author_id));
        let params: Vec<(String, String)> = vec![];

        self.get(&url, &params).await
    }

    /// First year from the earliest work, last year from yearly activity counts.
    ///
    /// An unknown author yields an absent span.
    ///
    /// # Errors
    ///
    /// Returns error on API failure other than 404.
    pub async fn fetch_career_span(&self, author_id: &str) -> ClientResult<CareerSpan> {
        let first_year = match self.earliest_work(author_id).await {
            Ok(work) => work.and_then(|w| w.publication_year),
            Err(ClientError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        let last_year = match self.get_author(author_id).await {
            Ok(author) => author.latest_active_year(),
            Err(ClientError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok(CareerSpan { first_year, last_year })
    }

    /// Make a GET request.
    async fn get<T>(&self, url: &str, params: &[(String, String)]) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut params = params.to_vec();
        if let Some(mailto) = &self.mailto {
            params.push(("mailto".to_string(), mailto.clone()));
        }

        // Check cache
        let cache_key = self.cache_key("GET", url, &params);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return serde_json::from_value(cached).map_err(ClientError::from);
        }

        // Rate limit
        tokio::time::sleep(self.rate_limit_delay).await;

        let response = self.client.get(url).query(&params).send().await?;

        let response = self.handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;

        // Cache response
        self.cache.insert(cache_key, value.clone()).await;

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Handle API response status codes.
    async fn handle_response(&self, response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::bad_request(text))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }

    /// Generate cache key.
    fn cache_key(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(method.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");

        for (k, v) in params {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }

        format!("{:x}", hasher.finalize())
    }
}

#[async_trait::async_trait]
impl CareerSpanResolver for OpenAlexClient {
    async fn career_span(&self, author_id: &str) -> TimelineResult<CareerSpan> {
        self.fetch_career_span(author_id).await.map_err(TimelineError::from)
    }
}

impl std::fmt::Debug for OpenAlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAlexClient")
            .field("api_url", &self.api_url)
            .field("has_mailto", &self.has_mailto())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_depends_on_params() {
        let client = OpenAlexClient::new(&Config::for_testing("http://localhost")).unwrap();
        let a = client.cache_key("GET", "u", &[("cursor".into(), "*".into())]);
        let b = client.cache_key("GET", "u", &[("cursor".into(), "abc".into())]);
        assert_ne!(a, b);
        assert_eq!(a, client.cache_key("GET", "u", &[("cursor".into(), "*".into())]));
    }

    #[test]
    fn test_debug_hides_contact() {
        let config = Config { mailto: Some("me@example.org".into()), ..Config::for_testing("http://localhost") };
        let client = OpenAlexClient::new(&config).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("has_mailto: true"));
        assert!(!debug.contains("example.org"));
    }
}
