//! Thread page parsing using html5ever
//!
//! Saved vBulletin pages are often malformed (unclosed `<li>`, stray
//! `</div>` left by forum templates). html5ever applies the WHATWG recovery
//! rules, so the tree handed to [`PostExtractor`](crate::post::PostExtractor)
//! matches what a browser would build.
//!
//! # Examples
//!
//! ```rust
//! use vbulletin_bbcode::parser::parse_page;
//!
//! let dom = parse_page(b"<ol id=\"posts\"><li id=\"post_1\">unclosed").expect("parses");
//! # let _ = dom;
//! ```

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::RcDom;

use crate::charset::{decode_to_utf8, detect_charset};
use crate::error::ExtractionError;

/// Parse page bytes into a DOM tree, honouring a Content-Type header
///
/// The charset comes from `content_type`, then from a meta tag, then
/// defaults to UTF-8 (see [`crate::charset`]).
///
/// # Errors
///
/// - [`ExtractionError::InvalidInput`] when `html` is empty
/// - [`ExtractionError::Encoding`] when the bytes are invalid for the
///   detected charset or the charset is unknown
pub fn parse_page_with_charset(
    html: &[u8],
    content_type: Option<&str>,
) -> Result<RcDom, ExtractionError> {
    if html.is_empty() {
        return Err(ExtractionError::InvalidInput("page is empty".to_string()));
    }

    let charset = detect_charset(content_type, html);
    let text = decode_to_utf8(html, &charset)?;

    tracing::debug!(charset = %charset, bytes = html.len(), "parsing thread page");

    Ok(parse_document(RcDom::default(), Default::default()).one(text.as_ref()))
}

/// Parse page bytes into a DOM tree
///
/// Same as [`parse_page_with_charset`] without a Content-Type header.
pub fn parse_page(html: &[u8]) -> Result<RcDom, ExtractionError> {
    parse_page_with_charset(html, None)
}
