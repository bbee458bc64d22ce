//! Parsing error types for listing and item pages
//!
//! Absent elements are never errors here (they become `None` fields); these
//! variants cover selectors that do not compile, structured-data blocks that do
//! not parse, links that cannot be resolved and markup with an unexpected shape.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("Invalid CSS selector for {field}: {selector} - {reason}")]
    InvalidSelector {
        field: String,
        selector: String,
        reason: String,
    },

    #[error("Invalid pattern for {field}: {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("Malformed structured-data block: {reason}")]
    StructuredDataMalformed { reason: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },

    #[error("Unexpected markup in {step}: {reason}")]
    UnexpectedMarkup { step: String, reason: String },
}

impl ParsingError {
    pub fn invalid_selector(field: &str, selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            field: field.to_string(),
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unexpected_markup(step: &str, reason: impl ToString) -> Self {
        Self::UnexpectedMarkup {
            step: step.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether extraction can carry on with the remaining fields after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidSelector { .. } | Self::InvalidPattern { .. } => false,
            Self::StructuredDataMalformed { .. }
            | Self::UrlResolutionFailed { .. }
            | Self::UnexpectedMarkup { .. } => true,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
