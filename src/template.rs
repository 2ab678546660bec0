//! Compiled HTML templates for tag rules
//!
//! A template is HTML text with placeholders:
//!
//! - `{inner}`: the converted content between the opening and closing tag
//! - `{name}`: the value of attribute `name` (empty when absent)
//! - `{name|other}`: attribute `name`, falling back to attribute `other`, or
//!   to the inner content when `other` is `inner`
//! - `{{` and `}}`: literal braces
//!
//! Attribute values reach the template already escaped for an attribute
//! context, so `{name}` is safe inside a quoted attribute.
//!
//! # Examples
//!
//! ```rust
//! use vbulletin_bbcode::template::Template;
//!
//! let template = Template::compile("url", r#"<a href="{value|inner}">{inner}</a>"#).unwrap();
//! assert_eq!(template.inner_count(), 1);
//! assert!(template.uses_inner_fallback());
//! assert_eq!(template.attribute_names().collect::<Vec<_>>(), vec!["value"]);
//! ```

use crate::error::ConfigError;

const INNER: &str = "inner";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Inner,
    Attribute {
        name: String,
        fallback: Option<Fallback>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fallback {
    Inner,
    Attribute(String),
}

/// Values substituted into a template
#[derive(Debug, Default, Clone, Copy)]
pub struct Bindings<'a> {
    /// Converted inner HTML
    pub inner: &'a str,
    /// Inner content escaped for an attribute context
    pub inner_as_attribute: &'a str,
    /// Escaped attribute values, first occurrence wins
    pub attributes: &'a [(String, String)],
}

impl Bindings<'_> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A parsed HTML template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile template `source` belonging to tag `tag`
    ///
    /// Only the syntax is checked here; whether the placeholders fit the
    /// rule (inner content, allowed attributes) is checked by
    /// [`ConversionConfig::new`](crate::config::ConversionConfig::new).
    pub fn compile(tag: &str, source: &str) -> Result<Self, ConfigError> {
        let template_error = |message: String| ConfigError::Template {
            tag: tag.to_string(),
            message,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, next)| next) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, next)| next) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let body_start = offset + 1;
                    let body_len = source[body_start..]
                        .find('}')
                        .ok_or_else(|| template_error(format!("unclosed '{{' at byte {offset}")))?;
                    let body = &source[body_start..body_start + body_len];
                    // Skip the placeholder body and its closing brace.
                    while chars.next_if(|&(i, _)| i <= body_start + body_len).is_some() {}

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(body).map_err(template_error)?);
                }
                '}' => {
                    return Err(template_error(format!("unmatched '}}' at byte {offset}")));
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Template text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of direct `{inner}` placeholders
    pub fn inner_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Inner))
            .count()
    }

    /// Whether any attribute placeholder falls back to the inner content
    pub fn uses_inner_fallback(&self) -> bool {
        self.inner_fallback_names().next().is_some()
    }

    /// Attributes whose placeholder falls back to the inner content
    pub fn inner_fallback_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Attribute {
                name,
                fallback: Some(Fallback::Inner),
            } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Whether the template references inner content at all
    pub fn references_inner(&self) -> bool {
        self.inner_count() > 0 || self.uses_inner_fallback()
    }

    /// Attribute names referenced by placeholders, fallbacks included
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().flat_map(|segment| {
            let (name, fallback) = match segment {
                Segment::Attribute { name, fallback } => (Some(name.as_str()), fallback),
                _ => (None, &None),
            };
            let fallback = match fallback {
                Some(Fallback::Attribute(other)) => Some(other.as_str()),
                _ => None,
            };
            name.into_iter().chain(fallback)
        })
    }

    /// Render the whole template into `out`
    pub fn render(&self, bindings: &Bindings<'_>, out: &mut String) {
        for segment in &self.segments {
            render_segment(segment, bindings, out);
        }
    }

    /// Render the part before the first `{inner}` into `out`
    ///
    /// Used for tags still open at end of input. A template without a
    /// direct `{inner}` renders in full.
    pub fn render_opening(&self, bindings: &Bindings<'_>, out: &mut String) {
        for segment in self
            .segments
            .iter()
            .take_while(|segment| !matches!(segment, Segment::Inner))
        {
            render_segment(segment, bindings, out);
        }
    }
}

fn render_segment(segment: &Segment, bindings: &Bindings<'_>, out: &mut String) {
    match segment {
        Segment::Literal(text) => out.push_str(text),
        Segment::Inner => out.push_str(bindings.inner),
        Segment::Attribute { name, fallback } => {
            let value = bindings.attribute(name).or_else(|| match fallback {
                Some(Fallback::Inner) => Some(bindings.inner_as_attribute),
                Some(Fallback::Attribute(other)) => bindings.attribute(other),
                None => None,
            });
            out.push_str(value.unwrap_or_default());
        }
    }
}

fn parse_placeholder(body: &str) -> Result<Segment, String> {
    let (name, fallback) = match body.split_once('|') {
        Some((name, fallback)) => (name.trim(), Some(fallback.trim())),
        None => (body.trim(), None),
    };

    if !is_placeholder_name(name) {
        return Err(format!("invalid placeholder '{{{body}}}'"));
    }

    if name == INNER {
        return match fallback {
            None => Ok(Segment::Inner),
            Some(_) => Err("{inner} takes no fallback".to_string()),
        };
    }

    let fallback = match fallback {
        None => None,
        Some(INNER) => Some(Fallback::Inner),
        Some(other) if is_placeholder_name(other) => Some(Fallback::Attribute(other.to_string())),
        Some(_) => return Err(format!("invalid placeholder '{{{body}}}'")),
    };

    Ok(Segment::Attribute {
        name: name.to_ascii_lowercase(),
        fallback: fallback.map(|f| match f {
            Fallback::Attribute(other) => Fallback::Attribute(other.to_ascii_lowercase()),
            Fallback::Inner => Fallback::Inner,
        }),
    })
}

fn is_placeholder_name(name: &str) -> bool {
    crate::tag::is_valid_attribute_name(name)
}
