//! vBulletin BBCode Converter
//!
//! Converts the BBCode markup of vBulletin forum posts into HTML and
//! extracts posts from saved thread pages.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `converter`: stack-based BBCode to HTML conversion with warnings
//! - `config`: tag rules and forum dialects (Rust values or TOML files)
//! - `template`: HTML templates with `{inner}` / `{attribute}` placeholders
//! - `tag`: bracket tag scanner
//! - `security`: HTML escaping, URL scheme checks and nesting limits
//! - `charset`: Character encoding detection and handling
//! - `parser`: thread page parsing using html5ever
//! - `post`: forum post extraction from parsed pages
//! - `thread`: posts grouped by thread and author
//!
//! # Example
//!
//! ```rust
//! use vbulletin_bbcode::{ConversionConfig, convert};
//!
//! let config = ConversionConfig::vbulletin().expect("built-in dialect is valid");
//! let result = convert("[b]Hello[/b] [i]world", &config);
//!
//! assert_eq!(result.html, "<b>Hello</b> <i>world");
//! assert_eq!(result.warnings.len(), 1);
//! ```
//!
//! Conversion never fails: malformed markup is kept as text and reported
//! through [`ConversionWarning`]s.

pub mod charset;
pub mod config;
pub mod converter;
pub mod error;
pub mod parser;
pub mod post;
pub mod security;
pub mod tag;
pub mod template;
pub mod thread;

// Re-export main types for convenience
pub use config::{ConversionConfig, TagKind, TagRule, UnknownTagPolicy};
pub use converter::{BbCodeConverter, ConversionResult, ConversionWarning, WarningReason, convert};
pub use error::{ConfigError, ExtractionError};
pub use parser::{parse_page, parse_page_with_charset};
pub use post::{ForumPost, PostExtractor, PostTimestamp};
pub use thread::{Author, Thread, parse_thread_reference};
