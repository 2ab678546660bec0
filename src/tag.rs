//! Bracket tag scanner
//!
//! Recognizes a single bracket token starting at a `[` and classifies it as
//! an opening or closing tag. Anything that does not look like tag syntax is
//! left for the caller to treat as plain text.
//!
//! Accepted forms:
//!
//! - `[name]`, `[/name]`
//! - `[name=value]`, `[name="value"]`, `[name='value']`
//! - `[name key=value key2="two words"]`

/// Longest bracket token considered, in bytes, including both brackets
pub(crate) const MAX_TAG_LEN: usize = 256;

/// Attribute name used for the `[name=value]` form
pub const DEFAULT_ATTRIBUTE: &str = "value";

/// One scanned bracket token
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TagToken {
    Open(OpenTag),
    Close { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenTag {
    /// Lowercased tag name
    pub(crate) name: String,
    /// Lowercased attribute names with their raw (unescaped) values
    pub(crate) attributes: Vec<(String, String)>,
    /// Attribute values that were empty or had an unterminated quote
    pub(crate) malformed: Vec<String>,
}

/// Whether a string is a valid tag name
///
/// Tag names start with an ASCII letter (or are `*`, the list item marker)
/// and continue with ASCII alphanumerics, `_` or `-`.
pub fn is_valid_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some('*') => chars.all(|c| c == '*'),
        Some(c) if c.is_ascii_alphabetic() => chars.all(is_name_char),
        _ => false,
    }
}

/// Whether a string is a valid attribute name
pub fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic()) && chars.all(is_name_char)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Scan the token starting at byte `start` (which must hold `[`)
///
/// Returns the token and the byte offset just past its closing `]`.
pub(crate) fn scan_tag(input: &str, start: usize) -> Option<(TagToken, usize)> {
    let rest = input.get(start..)?;
    if !rest.starts_with('[') {
        return None;
    }

    let window = &rest.as_bytes()[..rest.len().min(MAX_TAG_LEN)];
    let close = window.iter().position(|&b| b == b']')?;
    let body = &rest[1..close];
    let end = start + close + 1;

    if let Some(name) = body.strip_prefix('/') {
        let name = name.trim_end();
        return is_valid_tag_name(name).then(|| {
            (
                TagToken::Close {
                    name: name.to_ascii_lowercase(),
                },
                end,
            )
        });
    }

    let name_len = if body.starts_with('*') {
        body.find(|c: char| c != '*')
    } else {
        body.find(|c: char| !is_name_char(c))
    }
    .unwrap_or(body.len());
    let (name, tail) = body.split_at(name_len);
    if !is_valid_tag_name(name) {
        return None;
    }

    let mut tag = OpenTag {
        name: name.to_ascii_lowercase(),
        attributes: Vec::new(),
        malformed: Vec::new(),
    };

    if let Some(value) = tail.strip_prefix('=') {
        match unquote(value) {
            Unquoted::Value(v) if v.is_empty() => tag.malformed.push(DEFAULT_ATTRIBUTE.to_string()),
            Unquoted::Value(v) => tag.attributes.push((DEFAULT_ATTRIBUTE.to_string(), v.to_string())),
            Unquoted::Unterminated(v) => {
                tag.malformed.push(DEFAULT_ATTRIBUTE.to_string());
                if !v.is_empty() {
                    tag.attributes.push((DEFAULT_ATTRIBUTE.to_string(), v.to_string()));
                }
            }
        }
    } else if tail.starts_with(|c: char| c.is_ascii_whitespace()) {
        parse_named_attributes(tail, &mut tag)?;
    } else if !tail.is_empty() {
        return None;
    }

    Some((TagToken::Open(tag), end))
}

enum Unquoted<'a> {
    Value(&'a str),
    Unterminated(&'a str),
}

fn unquote(value: &str) -> Unquoted<'_> {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote) {
            return match inner.strip_suffix(quote) {
                Some(v) => Unquoted::Value(v),
                None => Unquoted::Unterminated(inner),
            };
        }
    }
    Unquoted::Value(value)
}

/// Parse `key=value` pairs; any other shape means the token is not a tag
fn parse_named_attributes(mut rest: &str, tag: &mut OpenTag) -> Option<()> {
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Some(());
        }

        let eq = rest.find('=')?;
        let key = &rest[..eq];
        if !is_valid_attribute_name(key) {
            return None;
        }
        let key = key.to_ascii_lowercase();
        let after = &rest[eq + 1..];

        let (value, next, terminated) = match after.chars().next() {
            Some(quote @ ('"' | '\'')) => match after[1..].find(quote) {
                Some(q) => (&after[1..1 + q], &after[q + 2..], true),
                None => (&after[1..], "", false),
            },
            _ => {
                let stop = after
                    .find(|c: char| c.is_ascii_whitespace())
                    .unwrap_or(after.len());
                (&after[..stop], &after[stop..], true)
            }
        };

        if !terminated || value.is_empty() {
            tag.malformed.push(key.clone());
        }
        if !value.is_empty() {
            tag.attributes.push((key, value.to_string()));
        }
        rest = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(input: &str) -> OpenTag {
        match scan_tag(input, 0) {
            Some((TagToken::Open(tag), _)) => tag,
            other => panic!("expected opening tag for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_open_and_close() {
        assert_eq!(open("[b]").name, "b");
        assert_eq!(
            scan_tag("[/b]", 0),
            Some((TagToken::Close { name: "b".to_string() }, 4))
        );
    }

    #[test]
    fn test_names_are_lowercased() {
        assert_eq!(open("[QUOTE]").name, "quote");
        assert_eq!(
            scan_tag("[/Quote]", 0),
            Some((TagToken::Close { name: "quote".to_string() }, 8))
        );
    }

    #[test]
    fn test_end_offset_is_relative_to_input() {
        let input = "abc [i]x";
        let (_, end) = scan_tag(input, 4).expect("tag");
        assert_eq!(end, 7);
        assert_eq!(&input[end..], "x");
    }

    #[test]
    fn test_default_attribute() {
        let tag = open("[url=http://example.com/?a=1]");
        assert_eq!(
            tag.attributes,
            vec![("value".to_string(), "http://example.com/?a=1".to_string())]
        );
        assert!(tag.malformed.is_empty());
    }

    #[test]
    fn test_quoted_default_attribute() {
        let tag = open("[quote=\"Some Author;1234\"]");
        assert_eq!(tag.attributes[0].1, "Some Author;1234");
        let tag = open("[font='Comic Sans MS']");
        assert_eq!(tag.attributes[0].1, "Comic Sans MS");
    }

    #[test]
    fn test_empty_default_attribute_is_malformed() {
        let tag = open("[url=]");
        assert!(tag.attributes.is_empty());
        assert_eq!(tag.malformed, vec!["value".to_string()]);
    }

    #[test]
    fn test_unterminated_quote_keeps_text() {
        let tag = open("[color=\"red]");
        assert_eq!(tag.attributes, vec![("value".to_string(), "red".to_string())]);
        assert_eq!(tag.malformed, vec!["value".to_string()]);
    }

    #[test]
    fn test_named_attributes() {
        let tag = open("[img width=100 alt=\"a cat\" Height='50']");
        assert_eq!(tag.name, "img");
        assert_eq!(
            tag.attributes,
            vec![
                ("width".to_string(), "100".to_string()),
                ("alt".to_string(), "a cat".to_string()),
                ("height".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_item_marker() {
        assert_eq!(open("[*]").name, "*");
        assert!(scan_tag("[*b]", 0).is_none());
    }

    #[test]
    fn test_non_tags_are_rejected() {
        for input in [
            "[", "[]", "[ b]", "[1]", "[1 2]", "[b!]", "[/]", "[/ b]", "[a b]", "[a =x]", "[b",
        ] {
            assert!(scan_tag(input, 0).is_none(), "{input:?} should not be a tag");
        }
    }

    #[test]
    fn test_overlong_token_is_rejected() {
        let input = format!("[url={}]", "a".repeat(MAX_TAG_LEN));
        assert!(scan_tag(&input, 0).is_none());
    }

    #[test]
    fn test_multibyte_attribute_value() {
        let tag = open("[quote=Zoë]");
        assert_eq!(tag.attributes[0].1, "Zoë");
    }

    #[test]
    fn test_tag_name_validation() {
        assert!(is_valid_tag_name("spoiler"));
        assert!(is_valid_tag_name("h1"));
        assert!(is_valid_tag_name("*"));
        assert!(!is_valid_tag_name(""));
        assert!(!is_valid_tag_name("1st"));
        assert!(!is_valid_tag_name("a b"));
        assert!(is_valid_attribute_name("width"));
        assert!(!is_valid_attribute_name("*"));
    }
}
