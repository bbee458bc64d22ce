//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults (the values below)
//! 2. An optional config file (TOML, JSON or YAML by extension)
//! 3. Environment variables prefixed `HARVESTER__`, nested with `__`
//!    (e.g. `HARVESTER__CRAWLING__MAX_PAGES=20`)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::infrastructure::parsing::ParsingConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawling: CrawlingConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,

    /// CSS selectors for listing and item pages
    pub parsing: ParsingConfig,
}

/// What to harvest and how fast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlingConfig {
    /// First page of the listing feed
    pub base_url: String,

    pub max_pages: u32,
    pub max_items: usize,

    /// Pause between listing pages
    pub page_delay: DelayRange,

    /// Pause after each item page
    pub item_delay: DelayRange,

    /// Visit every item page; when off, only URLs are emitted
    pub deep_scrape: bool,

    /// Local currency units per USD for the mint dataset
    pub fx_rate_kgs_per_usd: f64,

    /// Emit a progress line every N items
    pub progress_every: usize,
}

/// Inclusive random delay range in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,

    /// Extra attempts after the first request
    pub max_retries: u32,

    /// Retry delay is `backoff_factor * 2^(attempt - 1)` seconds
    pub backoff_factor: f64,

    /// Statuses that are retried like network errors
    pub retry_statuses: Vec<u16>,

    pub max_requests_per_second: u32,
    pub max_redirects: usize,
}

/// Where datasets are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub full_csv: String,
    pub full_json: String,
    pub mint_csv: String,
    pub save_json: bool,

    /// Prefix CSV files with a UTF-8 byte-order mark
    pub csv_bom: bool,
}

impl OutputConfig {
    pub fn full_csv_path(&self) -> PathBuf {
        self.directory.join(&self.full_csv)
    }

    pub fn full_json_path(&self) -> PathBuf {
        self.directory.join(&self.full_json)
    }

    pub fn mint_csv_path(&self) -> PathBuf {
        self.directory.join(&self.mint_csv)
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Log directory; the user data directory when unset
    pub log_dir: Option<PathBuf>,

    /// Offset from UTC used for timestamps, in hours
    pub utc_offset_hours: i32,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: usize,

    /// Per-target levels for chatty dependencies, ignored at "trace"
    pub module_filters: HashMap<String, String>,
}

impl Default for CrawlingConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            max_pages: defaults::MAX_PAGES,
            max_items: defaults::MAX_ITEMS,
            page_delay: defaults::PAGE_DELAY,
            item_delay: defaults::ITEM_DELAY,
            deep_scrape: defaults::DEEP_SCRAPE,
            fx_rate_kgs_per_usd: defaults::FX_RATE_KGS_PER_USD,
            progress_every: defaults::PROGRESS_EVERY,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            backoff_factor: defaults::BACKOFF_FACTOR,
            retry_statuses: defaults::RETRY_STATUSES.to_vec(),
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            max_redirects: defaults::MAX_REDIRECTS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            full_csv: defaults::FULL_CSV.to_string(),
            full_json: defaults::FULL_JSON.to_string(),
            mint_csv: defaults::MINT_CSV.to_string(),
            save_json: true,
            csv_bom: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            log_dir: None,
            utc_offset_hours: defaults::LOG_UTC_OFFSET_HOURS,
            max_files: defaults::LOG_MAX_FILES,
            module_filters: defaults::NOISY_TARGETS
                .iter()
                .map(|target| ((*target).to_string(), "warn".to_string()))
                .collect(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `path` if given, then `HARVESTER__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading environment overrides from `env` instead of
    /// the process environment when it is provided.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            info!("Loading configuration from {:?}", path);
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("HARVESTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Validation {
                message: message.to_string(),
            })
        };

        if url::Url::parse(&self.crawling.base_url).is_err() {
            return invalid("crawling.base_url must be an absolute URL");
        }
        if self.crawling.max_pages == 0 {
            return invalid("crawling.max_pages must be greater than 0");
        }
        if self.crawling.max_items == 0 {
            return invalid("crawling.max_items must be greater than 0");
        }
        if self.crawling.page_delay.min_ms > self.crawling.page_delay.max_ms {
            return invalid("crawling.page_delay.min_ms cannot be greater than max_ms");
        }
        if self.crawling.item_delay.min_ms > self.crawling.item_delay.max_ms {
            return invalid("crawling.item_delay.min_ms cannot be greater than max_ms");
        }
        if !(self.crawling.fx_rate_kgs_per_usd.is_finite() && self.crawling.fx_rate_kgs_per_usd > 0.0) {
            return invalid("crawling.fx_rate_kgs_per_usd must be a positive number");
        }
        if self.crawling.progress_every == 0 {
            return invalid("crawling.progress_every must be greater than 0");
        }
        if self.http.max_requests_per_second == 0 {
            return invalid("http.max_requests_per_second must be greater than 0");
        }
        if !(self.http.backoff_factor.is_finite() && self.http.backoff_factor >= 0.0) {
            return invalid("http.backoff_factor must be a finite, non-negative number");
        }

        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    use super::DelayRange;

    pub const BASE_URL: &str = "https://lalafo.kg/kyrgyzstan/kvartiry/prodazha-kvartir";

    pub const MAX_PAGES: u32 = 150;
    pub const MAX_ITEMS: usize = 5000;
    pub const PAGE_DELAY: DelayRange = DelayRange::new(700, 1300);
    pub const ITEM_DELAY: DelayRange = DelayRange::new(400, 1000);
    pub const DEEP_SCRAPE: bool = true;
    pub const FX_RATE_KGS_PER_USD: f64 = 87.0;
    pub const PROGRESS_EVERY: usize = 25;

    pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
    pub const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_RETRIES: u32 = 5;
    pub const BACKOFF_FACTOR: f64 = 0.6;
    pub const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];
    pub const MAX_REQUESTS_PER_SECOND: u32 = 5;
    pub const MAX_REDIRECTS: usize = 10;

    pub const FULL_CSV: &str = "lalafo_flats.csv";
    pub const FULL_JSON: &str = "lalafo_flats.json";
    pub const MINT_CSV: &str = "apartments_for_mint.csv";

    pub const LOG_LEVEL: &str = "info";
    /// Bishkek time
    pub const LOG_UTC_OFFSET_HOURS: i32 = 6;
    pub const LOG_MAX_FILES: usize = 5;
    pub const NOISY_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "html5ever", "selectors"];
}

/// URL building helpers
pub mod urls {
    /// URL of listing page `page` (1-based). Page 1 is the feed URL itself.
    pub fn listing_page_url(base_url: &str, page: u32) -> String {
        if page <= 1 {
            base_url.to_string()
        } else if base_url.contains('?') {
            format!("{base_url}&page={page}")
        } else {
            format!("{base_url}?page={page}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.crawling.max_pages, 150);
        assert_eq!(config.crawling.max_items, 5000);
        assert_eq!(config.http.retry_statuses, vec![429, 500, 502, 503, 504]);
        assert_eq!(config.output.mint_csv_path(), PathBuf::from("./apartments_for_mint.csv"));
    }

    #[test]
    fn test_load_without_sources_yields_defaults() {
        let config = AppConfig::load_with_env(None, Some(HashMap::new())).unwrap();
        assert_eq!(config.crawling.base_url, defaults::BASE_URL);
        assert_eq!(config.crawling.page_delay, defaults::PAGE_DELAY);
        assert!((config.crawling.fx_rate_kgs_per_usd - 87.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_file_then_env_layering() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[crawling]
max_pages = 3
deep_scrape = false

[output]
directory = "out"
"#
        )
        .unwrap();

        let env = HashMap::from([
            ("HARVESTER__CRAWLING__MAX_PAGES".to_string(), "7".to_string()),
            ("HARVESTER__HTTP__TIMEOUT_SECONDS".to_string(), "5".to_string()),
        ]);
        let config = AppConfig::load_with_env(Some(file.path()), Some(env)).unwrap();

        assert_eq!(config.crawling.max_pages, 7);
        assert!(!config.crawling.deep_scrape);
        assert_eq!(config.http.timeout_seconds, 5);
        assert_eq!(config.output.full_csv_path(), PathBuf::from("out/lalafo_flats.csv"));
        assert_eq!(config.crawling.max_items, defaults::MAX_ITEMS);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.crawling.max_items = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));

        let mut config = AppConfig::default();
        config.crawling.page_delay = DelayRange::new(2000, 100);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.crawling.fx_rate_kgs_per_usd = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.crawling.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unusable_backoff() {
        for factor in [f64::INFINITY, f64::NAN, -0.5] {
            let mut config = AppConfig::default();
            config.http.backoff_factor = factor;
            assert!(
                matches!(config.validate(), Err(ConfigError::Validation { .. })),
                "backoff_factor {factor} should be rejected"
            );
        }

        let mut config = AppConfig::default();
        config.http.backoff_factor = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = AppConfig::load_with_env(Some(Path::new("/nonexistent/harvester.toml")), None);
        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_listing_page_url() {
        let base = "https://lalafo.kg/kyrgyzstan/kvartiry/prodazha-kvartir";
        assert_eq!(urls::listing_page_url(base, 1), base);
        assert_eq!(urls::listing_page_url(base, 2), format!("{base}?page=2"));
        assert_eq!(
            urls::listing_page_url("https://lalafo.kg/search?q=flat", 3),
            "https://lalafo.kg/search?q=flat&page=3"
        );
    }
}
