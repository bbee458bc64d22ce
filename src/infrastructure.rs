//! Infrastructure layer: configuration, logging, transport, pacing, HTML parsing
//! and dataset output.

pub mod config;
pub mod dataset_writer;
pub mod http_client;
pub mod logging;
pub mod pacing;
pub mod parsing;
pub mod parsing_error;

pub use config::{AppConfig, ConfigError};
pub use dataset_writer::{DatasetError, DatasetWriter, WrittenDatasets};
pub use http_client::{HttpClient, RetryPolicy};
pub use logging::{init_logging, log_system_info};
pub use pacing::Pacer;
pub use parsing::{ItemDetailParser, ListingPageParser, ParsingConfig, ParsingError, ParsingResult};
