//! Output sanitization for converted post bodies
//!
//! Post bodies come from arbitrary forum users. The converter never lets
//! a tag attribute break out of its HTML context:
//!
//! 1. **Attribute escaping**: every attribute value is escaped for a quoted
//!    attribute context before it reaches a template. Values taken from
//!    DOM-extracted HTML keep their character references
//! 2. **URL screening**: values using an executable or local URL scheme are
//!    dropped, after character references are decoded
//! 3. **Depth limit**: the number of simultaneously open tags is bounded
//! 4. **Text escaping**: optional, for sources that are plain text rather
//!    than DOM-extracted HTML

use std::borrow::Cow;

/// Default maximum number of simultaneously open tags
pub const MAX_NESTING_DEPTH: usize = 64;

/// URL schemes that are never allowed into an attribute
const DANGEROUS_URL_SCHEMES: &[&str] = &[
    "javascript:", // Script execution
    "data:",       // Inline documents
    "vbscript:",   // Legacy IE scripting
    "file:",       // Local file access
    "about:",      // Browser internal URLs
];

/// Screens attribute values and tracks the nesting limit for one dialect
#[derive(Debug, Clone)]
pub struct SecurityValidator {
    max_depth: usize,
}

impl SecurityValidator {
    /// Create a validator with the default nesting limit
    pub fn new() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Create a validator with a custom nesting limit
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Maximum number of simultaneously open tags
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Check whether opening one more tag at `depth` open tags is allowed
    ///
    /// # Examples
    ///
    /// ```
    /// use vbulletin_bbcode::security::SecurityValidator;
    ///
    /// let validator = SecurityValidator::with_max_depth(2);
    /// assert!(validator.allows_depth(1));
    /// assert!(!validator.allows_depth(2));
    /// ```
    pub fn allows_depth(&self, depth: usize) -> bool {
        depth < self.max_depth
    }

    /// Check if a URL uses a dangerous scheme
    ///
    /// Browsers decode character references in attribute values and ignore
    /// ASCII whitespace and control characters inside a scheme, so
    /// `java\tscript:` and `&#106;avascript:` are treated like `javascript:`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vbulletin_bbcode::security::SecurityValidator;
    ///
    /// let validator = SecurityValidator::new();
    /// assert!(validator.is_dangerous_url("javascript:alert('xss')"));
    /// assert!(validator.is_dangerous_url(" JaVa\tScript:alert(1)"));
    /// assert!(validator.is_dangerous_url("&#106;avascript&colon;alert(1)"));
    /// assert!(!validator.is_dangerous_url("https://example.com"));
    /// assert!(!validator.is_dangerous_url("/forum/showthread.php?t=1"));
    /// ```
    pub fn is_dangerous_url(&self, url: &str) -> bool {
        let compact: String = decode_char_refs(url)
            .chars()
            .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
            .take(16)
            .flat_map(char::to_lowercase)
            .collect();
        DANGEROUS_URL_SCHEMES
            .iter()
            .any(|scheme| compact.starts_with(scheme))
    }

    /// Return the URL if it is safe, `None` otherwise
    pub fn sanitize_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        if self.is_dangerous_url(url) {
            None
        } else {
            Some(url)
        }
    }
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape text content (`&`, `<`, `>`)
///
/// ```
/// use vbulletin_bbcode::security::escape_text;
///
/// assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
/// ```
pub fn escape_text(text: &str) -> Cow<'_, str> {
    escape_with(text, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    })
}

/// Escape a value for a quoted attribute context
///
/// ```
/// use vbulletin_bbcode::security::escape_attribute;
///
/// assert_eq!(
///     escape_attribute(r#"x" onmouseover="alert(1)"#),
///     "x&quot; onmouseover=&quot;alert(1)"
/// );
/// ```
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    escape_with(value, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    })
}

/// Escape an HTML fragment for a quoted attribute context
///
/// Complete character references (`&amp;`, `&#38;`, `&#x26;`) are kept as
/// they are, so text serialized from a parsed page is not escaped twice.
/// Bare `&` and the markup characters are escaped as in [`escape_attribute`].
///
/// ```
/// use vbulletin_bbcode::security::escape_html_attribute;
///
/// assert_eq!(
///     escape_html_attribute("http://a.b/?x=1&amp;y=2&z=3"),
///     "http://a.b/?x=1&amp;y=2&amp;z=3"
/// );
/// assert_eq!(escape_html_attribute(r#"a"b"#), "a&quot;b");
/// ```
pub fn escape_html_attribute(value: &str) -> Cow<'_, str> {
    let Some(first) = value.find(|c: char| matches!(c, '&' | '<' | '>' | '"' | '\'')) else {
        return Cow::Borrowed(value);
    };

    let mut escaped = String::with_capacity(value.len() + 16);
    escaped.push_str(&value[..first]);
    let mut rest = &value[first..];
    while let Some(c) = rest.chars().next() {
        let step = match c {
            '&' => match reference_len(rest) {
                Some(len) => {
                    escaped.push_str(&rest[..len]);
                    len
                }
                None => {
                    escaped.push_str("&amp;");
                    1
                }
            },
            '<' => {
                escaped.push_str("&lt;");
                1
            }
            '>' => {
                escaped.push_str("&gt;");
                1
            }
            '"' => {
                escaped.push_str("&quot;");
                1
            }
            '\'' => {
                escaped.push_str("&#39;");
                1
            }
            _ => {
                escaped.push(c);
                c.len_utf8()
            }
        };
        rest = &rest[step..];
    }
    Cow::Owned(escaped)
}

/// Named references that can spell out a URL scheme
const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("apos", '\''),
    ("colon", ':'),
    ("gt", '>'),
    ("lt", '<'),
    ("NewLine", '\n'),
    ("quot", '"'),
    ("Tab", '\t'),
];

/// Decode the character references a browser would decode in an attribute
///
/// Numeric references are decoded in full. Named references are decoded
/// when they can spell out a URL scheme; others are left as written.
///
/// ```
/// use vbulletin_bbcode::security::decode_char_refs;
///
/// assert_eq!(decode_char_refs("&#106;ava&#x73;cript&colon;"), "javascript:");
/// assert_eq!(decode_char_refs("a &amp;b &copy;"), "a &b &copy;");
/// ```
pub fn decode_char_refs(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(at) = rest.find('&') {
        decoded.push_str(&rest[..at]);
        rest = &rest[at..];
        match decode_reference(rest) {
            Some((c, consumed)) => {
                decoded.push(c);
                rest = &rest[consumed..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    Cow::Owned(decoded)
}

/// Length of the complete character reference at the start of `input`
fn reference_len(input: &str) -> Option<usize> {
    let body = input.strip_prefix('&')?;
    let (prefix, len) = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        (2, hex.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(hex.len()))
    } else if let Some(decimal) = body.strip_prefix('#') {
        (1, decimal.find(|c: char| !c.is_ascii_digit()).unwrap_or(decimal.len()))
    } else {
        (0, body.find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(body.len()))
    };
    (len > 0 && body[prefix + len..].starts_with(';')).then_some(1 + prefix + len + 1)
}

/// Decode one character reference at the start of `input`
///
/// Returns the character and the bytes consumed. Numeric references may
/// omit the semicolon.
fn decode_reference(input: &str) -> Option<(char, usize)> {
    let body = input.strip_prefix('&')?;
    if let Some(number) = body.strip_prefix('#') {
        let (radix, prefix) = match number.as_bytes().first() {
            Some(b'x' | b'X') => (16, 1),
            _ => (10, 0),
        };
        let digits = &number[prefix..];
        let len = digits.find(|c: char| !c.is_digit(radix)).unwrap_or(digits.len());
        if len == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).ok()?;
        let c = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
        let semicolon = usize::from(digits[len..].starts_with(';'));
        return Some((c, 2 + prefix + len + semicolon));
    }

    let len = body.find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(body.len());
    if len == 0 || !body[len..].starts_with(';') {
        return None;
    }
    let name = &body[..len];
    NAMED_REFERENCES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|&(_, c)| (c, len + 2))
}

/// Render raw bracket text so it can never be read as BBCode again
///
/// ```
/// use vbulletin_bbcode::security::escape_bracket_tag;
///
/// assert_eq!(escape_bracket_tag("[marquee]"), "&#91;marquee&#93;");
/// ```
pub fn escape_bracket_tag(raw: &str) -> String {
    escape_with(raw, |c| match c {
        '[' => Some("&#91;"),
        ']' => Some("&#93;"),
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        _ => None,
    })
    .into_owned()
}

fn escape_with(input: &str, replacement: impl Fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = input.find(|c| replacement(c).is_some()) else {
        return Cow::Borrowed(input);
    };

    let mut escaped = String::with_capacity(input.len() + 16);
    escaped.push_str(&input[..first]);
    for c in input[first..].chars() {
        match replacement(c) {
            Some(entity) => escaped.push_str(entity),
            None => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
