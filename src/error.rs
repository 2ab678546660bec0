//! Error types for dialect configuration and thread extraction
//!
//! BBCode conversion itself never fails: malformed markup degrades into
//! [`ConversionWarning`](crate::converter::ConversionWarning)s. The only
//! fallible steps are building a dialect and reading a forum page.

use std::path::PathBuf;

/// Errors raised while building a [`ConversionConfig`](crate::config::ConversionConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Two rules share a name (names compare case-insensitively)
    #[error("duplicate tag name '{0}'")]
    DuplicateTag(String),
    /// Tag name contains characters the tag scanner can never produce
    #[error("invalid tag name '{0}'")]
    InvalidTagName(String),
    /// Attribute name contains characters the tag scanner can never produce
    #[error("invalid attribute name '{attribute}' on tag '{tag}'")]
    InvalidAttributeName { tag: String, attribute: String },
    /// A paired tag's template never references its inner content
    #[error("template for tag '{tag}' is missing required placeholder {{{placeholder}}}")]
    MissingPlaceholder {
        tag: String,
        placeholder: &'static str,
    },
    /// A self-closing tag's template references inner content it cannot have
    #[error("self-closing tag '{tag}' cannot use the {{inner}} placeholder")]
    InnerInSelfClosing { tag: String },
    /// Template references an attribute the rule does not allow
    #[error("template for tag '{tag}' references unknown placeholder {{{placeholder}}}")]
    UnknownPlaceholder { tag: String, placeholder: String },
    /// Template text could not be compiled
    #[error("invalid template for tag '{tag}': {message}")]
    Template { tag: String, message: String },
    /// Nesting limit must allow at least one open tag
    #[error("max_depth must be at least 1")]
    InvalidMaxDepth,
    /// Dialect file does not exist
    #[error("dialect file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error while reading a dialect file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML syntax or shape error in a dialect file
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised while decoding a thread page or extracting its posts
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Input cannot be processed at all (e.g. empty page)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Page bytes do not decode with the detected charset
    #[error("encoding error: {0}")]
    Encoding(String),
    /// A post element lacks a field every vBulletin post carries
    #[error("post #{post} has no {field}")]
    MissingField { post: u32, field: &'static str },
    /// Thread reference is neither a thread number nor a thread URL
    #[error("'{0}' is not a thread number or valid thread URL")]
    InvalidThreadReference(String),
    /// Post body could not be serialized back to HTML
    #[error("failed to serialize post body: {0}")]
    Serialize(#[from] std::io::Error),
}
