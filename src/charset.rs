//! Character encoding detection and transcoding for thread pages
//!
//! Older vBulletin installs commonly serve ISO-8859-1 or windows-1252, so a
//! page is decoded to UTF-8 before html5ever sees it. The charset is chosen
//! by a three-level cascade:
//!
//! 1. **Content-Type header**: `charset=` parameter
//! 2. **HTML meta tags**: `<meta charset>` or `<meta http-equiv="Content-Type">`
//!    within the first 1024 bytes
//! 3. **Default**: UTF-8
//!
//! # Examples
//!
//! ```rust
//! use vbulletin_bbcode::charset::detect_charset;
//!
//! let charset = detect_charset(Some("text/html; charset=ISO-8859-1"), b"<html></html>");
//! assert_eq!(charset, "ISO-8859-1");
//!
//! let html = br#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1252" />"#;
//! assert_eq!(detect_charset(None, html), "WINDOWS-1252");
//!
//! assert_eq!(detect_charset(None, b"<p>plain</p>"), "UTF-8");
//! ```

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::ExtractionError;

/// Charset used when nothing is declared
const DEFAULT_CHARSET: &str = "UTF-8";

/// Bytes scanned for meta charset tags
const META_SCAN_LIMIT: usize = 1024;

/// Detect the page charset, normalized to uppercase
pub fn detect_charset(content_type: Option<&str>, html: &[u8]) -> String {
    content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(html))
        .map_or_else(|| DEFAULT_CHARSET.to_string(), |charset| charset.to_uppercase())
}

/// Extract the `charset=` parameter of a Content-Type value
///
/// ```rust
/// use vbulletin_bbcode::charset::charset_from_content_type;
///
/// assert_eq!(
///     charset_from_content_type("text/html; charset=\"UTF-8\""),
///     Some("UTF-8".to_string())
/// );
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    static CHARSET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex =
        CHARSET_REGEX.get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";,\s]+)"?"#).ok());

    regex
        .as_ref()?
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract a charset declared by a meta tag near the start of the page
pub fn charset_from_meta(html: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&html[..html.len().min(META_SCAN_LIMIT)]);

    static META_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = META_REGEX.get_or_init(|| {
        Regex::new(
            r#"(?i)<meta\s+(?:charset\s*=\s*"?([^";>\s/]+)|http-equiv\s*=\s*"?Content-Type"?\s+content\s*=\s*"?[^">]*charset\s*=\s*([^";>\s/]+))"#,
        )
        .ok()
    });

    let caps = regex.as_ref()?.captures(&prefix)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Decode page bytes to UTF-8 using `charset`
///
/// UTF-8 input is borrowed, other encodings are transcoded with
/// `encoding_rs`. Byte sequences that are invalid for the charset are an
/// error rather than being replaced.
pub fn decode_to_utf8<'a>(html: &'a [u8], charset: &str) -> Result<Cow<'a, str>, ExtractionError> {
    if charset.eq_ignore_ascii_case(DEFAULT_CHARSET) {
        return std::str::from_utf8(html).map(Cow::Borrowed).map_err(|e| {
            ExtractionError::Encoding(format!(
                "invalid UTF-8 at byte {}: {e}",
                e.valid_up_to()
            ))
        });
    }

    let encoding = encoding_rs::Encoding::for_label(charset.as_bytes()).ok_or_else(|| {
        ExtractionError::Encoding(format!("unsupported charset '{charset}'"))
    })?;

    encoding
        .decode_without_bom_handling_and_without_replacement(html)
        .ok_or_else(|| ExtractionError::Encoding(format!("invalid byte sequence for '{charset}'")))
}
