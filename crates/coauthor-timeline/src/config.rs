//! Configuration for the coauthor timeline pipeline.

use std::time::Duration;

use anyhow::Context;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for the OpenAlex API.
    pub const OPENALEX_API: &str = "https://api.openalex.org";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Delay between requests (100ms = 10 req/s, the OpenAlex polite limit).
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(100);

    /// Works per page for cursor pagination (OpenAlex maximum).
    pub const PAGE_SIZE: u32 = 200;

    /// Cache TTL (10 minutes).
    pub const CACHE_TTL: Duration = Duration::from_secs(600);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 2000;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Publication filtering rules applied while harvesting.
pub mod filters {
    /// Work types kept in the corpus.
    pub const ACCEPTED_WORK_TYPES: &[&str] = &["article", "preprint", "book-chapter", "book", "report"];

    /// Lowercased title patterns of works mislabelled as articles.
    pub const EXCLUDED_TITLE_PATTERNS: &[&str] = &[
        "^table",
        "appendix",
        "issue cover",
        "this week in science",
        "^figure ",
        "^data for ",
        "^author correction: ",
        "supporting information",
        "^supplementary material",
        "^list of contributors",
    ];
}

/// Data quality defaults.
pub mod quality {
    /// First publication years before this are treated as upstream errors.
    pub const MIN_VALID_FIRST_YEAR: i32 = 1950;

    /// Career ages above this are reported as suspicious.
    pub const MAX_AUTHOR_AGE: i32 = 70;

    /// Targets processed concurrently.
    pub const CONCURRENCY: usize = 4;
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Contact email for the OpenAlex polite pool (optional).
    pub mailto: Option<String>,

    /// Base URL for the OpenAlex API (for testing with mock servers).
    pub api_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Delay between requests.
    pub rate_limit_delay: Duration,

    /// Cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cache size.
    pub cache_max_size: u64,

    /// Earliest plausible first publication year; earlier values are nulled.
    pub min_valid_first_year: i32,

    /// Largest plausible career age.
    pub max_author_age: i32,

    /// Number of targets processed concurrently.
    pub concurrency: usize,

    /// Work types kept while harvesting.
    pub accepted_work_types: Vec<String>,

    /// Drop works whose language is not English.
    pub english_only: bool,

    /// Randomise the day of month of publication dates (visualization only).
    pub shuffle_dates: bool,

    /// Seed for representative date sampling; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Config {
    /// Create a configuration with an optional polite-pool contact.
    #[must_use]
    pub fn new(mailto: Option<String>) -> Self {
        Self {
            mailto,
            api_url: api::OPENALEX_API.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            rate_limit_delay: api::RATE_LIMIT_DELAY,
            cache_ttl: api::CACHE_TTL,
            cache_max_size: api::CACHE_MAX_SIZE,
            min_valid_first_year: quality::MIN_VALID_FIRST_YEAR,
            max_author_age: quality::MAX_AUTHOR_AGE,
            concurrency: quality::CONCURRENCY,
            accepted_work_types: filters::ACCEPTED_WORK_TYPES
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
            english_only: true,
            shuffle_dates: true,
            seed: None,
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_delay: Duration::from_millis(0), // No delay in tests
            cache_ttl: Duration::from_secs(0),          // No caching in tests
            cache_max_size: 0,
            shuffle_dates: false,
            seed: Some(7),
            ..Self::new(None)
        }
    }

    /// Create configuration from environment variables (and a `.env` file if present).
    ///
    /// # Errors
    ///
    /// Returns error if a numeric environment variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::new(std::env::var("OPENALEX_MAILTO").ok());

        if let Ok(url) = std::env::var("OPENALEX_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(year) = std::env::var("COAUTHOR_MIN_VALID_YEAR") {
            config.min_valid_first_year =
                year.parse().context("COAUTHOR_MIN_VALID_YEAR must be a year")?;
        }
        if let Ok(n) = std::env::var("COAUTHOR_CONCURRENCY") {
            config.concurrency = n.parse().context("COAUTHOR_CONCURRENCY must be an integer")?;
        }
        if let Ok(seed) = std::env::var("COAUTHOR_SEED") {
            config.seed = Some(seed.parse().context("COAUTHOR_SEED must be an integer")?);
        }

        Ok(config)
    }

    /// Check if a polite-pool contact is configured.
    #[must_use]
    pub const fn has_mailto(&self) -> bool {
        self.mailto.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.has_mailto());
        assert_eq!(config.min_valid_first_year, 1950);
        assert!(config.english_only);
    }

    #[test]
    fn test_config_for_testing_disables_delays() {
        let config = Config::for_testing("http://127.0.0.1:9999/");
        assert_eq!(config.api_url, "http://127.0.0.1:9999");
        assert_eq!(config.rate_limit_delay, Duration::ZERO);
        assert!(!config.shuffle_dates);
    }
}
