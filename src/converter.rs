//! BBCode to HTML converter
//!
//! Converts a post body written in a forum's BBCode dialect into HTML.
//!
//! # Conversion Strategy
//!
//! The input is scanned once, left to right. Text is appended to the
//! innermost open tag (or to the output when no tag is open). The scanner
//! keeps a stack of open tags:
//!
//! 1. An opening tag from the dialect is pushed with its attributes
//! 2. Its closing tag pops it and renders the full template around the
//!    content gathered since it opened
//! 3. A self-closing tag renders immediately
//!
//! # Graceful Degradation
//!
//! Conversion never fails. Anything the dialect cannot express becomes a
//! [`ConversionWarning`] and the text is kept on a best-effort basis:
//!
//! - a closing tag with no open counterpart stays as literal text
//! - tags still open at end of input render only the opening half of their
//!   template, followed by their content
//! - a closing tag that skips over other open tags closes those first
//! - unknown tags follow the dialect's [`UnknownTagPolicy`]
//!
//! # Examples
//!
//! ```rust
//! use vbulletin_bbcode::config::{ConversionConfig, TagRule, UnknownTagPolicy};
//! use vbulletin_bbcode::converter::convert;
//!
//! let config = ConversionConfig::new(
//!     vec![TagRule::paired("b", "<b>{inner}</b>")],
//!     UnknownTagPolicy::Passthrough,
//! )
//! .unwrap();
//!
//! let result = convert("[b]hi[/b]", &config);
//! assert_eq!(result.html, "<b>hi</b>");
//! assert!(result.warnings.is_empty());
//!
//! let result = convert("[b]hello", &config);
//! assert_eq!(result.html, "<b>hello");
//! assert_eq!(result.warnings.len(), 1);
//! ```

use serde::Serialize;
use std::fmt;

use crate::config::{CompiledRule, ConversionConfig, TagKind, UnknownTagPolicy};
use crate::security::{
    SecurityValidator, escape_attribute, escape_bracket_tag, escape_html_attribute, escape_text,
};
use crate::tag::{OpenTag, TagToken, scan_tag};
use crate::template::Bindings;

/// Why a tag could not be converted cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningReason {
    /// Closing tag with no matching open tag; kept as literal text
    UnmatchedClose,
    /// Tag still open at end of input; rendered with its opening half only
    Unclosed,
    /// Tag closed early because an enclosing tag was closed first
    ImplicitlyClosed,
    /// Tag name not in the dialect and the policy altered the text
    UnknownTag,
    /// Attribute not allowed for this tag; dropped
    AttributeNotAllowed,
    /// Attribute with an empty value or unterminated quote
    MalformedAttribute,
    /// Attribute or URL content with a dangerous scheme; replaced by nothing
    UnsafeAttribute,
    /// Opening tag past the nesting limit; kept as literal text
    DepthExceeded,
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WarningReason::UnmatchedClose => "closing tag without matching opening tag",
            WarningReason::Unclosed => "tag not closed before end of input",
            WarningReason::ImplicitlyClosed => "tag implicitly closed by an enclosing tag",
            WarningReason::UnknownTag => "unknown tag",
            WarningReason::AttributeNotAllowed => "attribute not allowed",
            WarningReason::MalformedAttribute => "malformed attribute",
            WarningReason::UnsafeAttribute => "unsafe attribute value removed",
            WarningReason::DepthExceeded => "nesting depth exceeded",
        };
        f.write_str(text)
    }
}

/// A non-fatal problem found during conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionWarning {
    /// Lowercased tag name
    pub tag_name: String,
    /// Byte offset of the tag's `[` in the input
    pub position: usize,
    /// What went wrong
    pub reason: WarningReason,
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] at byte {}: {}",
            self.tag_name, self.position, self.reason
        )
    }
}

/// Output of one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// Converted HTML
    pub html: String,
    /// Warnings in the order they were found
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionResult {
    /// Whether the input converted without any warning
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Converter bound to one dialect
///
/// Holds no per-call state, so a single converter can serve any number of
/// threads.
///
/// ```rust
/// use vbulletin_bbcode::config::ConversionConfig;
/// use vbulletin_bbcode::converter::BbCodeConverter;
///
/// let converter = BbCodeConverter::new(ConversionConfig::vbulletin().unwrap());
/// let result = converter.convert("[i]so[/i] [u]there[/u]");
/// assert_eq!(result.html, "<i>so</i> <u>there</u>");
/// ```
#[derive(Debug, Clone)]
pub struct BbCodeConverter {
    config: ConversionConfig,
    security_validator: SecurityValidator,
}

impl BbCodeConverter {
    /// Create a converter for `config`
    pub fn new(config: ConversionConfig) -> Self {
        let security_validator = SecurityValidator::with_max_depth(config.max_depth());
        Self {
            config,
            security_validator,
        }
    }

    /// The dialect in use
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert one post body
    pub fn convert(&self, text: &str) -> ConversionResult {
        Conversion::new(&self.config, &self.security_validator).run(text)
    }
}

/// Convert `text` with `config`
///
/// Equivalent to `BbCodeConverter::new(config.clone()).convert(text)`
/// without the clone.
pub fn convert(text: &str, config: &ConversionConfig) -> ConversionResult {
    let validator = SecurityValidator::with_max_depth(config.max_depth());
    Conversion::new(config, &validator).run(text)
}

/// An open paired tag
struct Frame<'c> {
    rule: &'c CompiledRule,
    position: usize,
    attributes: Vec<(String, String)>,
    body: String,
}

/// State of a single conversion
struct Conversion<'c> {
    config: &'c ConversionConfig,
    validator: &'c SecurityValidator,
    stack: Vec<Frame<'c>>,
    output: String,
    warnings: Vec<ConversionWarning>,
}

impl<'c> Conversion<'c> {
    fn new(config: &'c ConversionConfig, validator: &'c SecurityValidator) -> Self {
        Self {
            config,
            validator,
            stack: Vec::new(),
            output: String::new(),
            warnings: Vec::new(),
        }
    }

    fn run(mut self, text: &str) -> ConversionResult {
        self.output.reserve(text.len());

        let mut cursor = 0;
        let mut text_start = 0;
        while let Some(offset) = text[cursor..].find('[') {
            let start = cursor + offset;
            match scan_tag(text, start) {
                Some((token, end)) => {
                    self.push_text(&text[text_start..start]);
                    self.handle_token(token, &text[start..end], start);
                    cursor = end;
                    text_start = end;
                }
                None => cursor = start + 1,
            }
        }
        self.push_text(&text[text_start..]);

        self.finish()
    }

    fn handle_token(&mut self, token: TagToken, raw: &str, position: usize) {
        match token {
            TagToken::Open(tag) => self.open_tag(tag, raw, position),
            TagToken::Close { name } => self.close_tag(&name, raw, position),
        }
    }

    fn open_tag(&mut self, tag: OpenTag, raw: &str, position: usize) {
        let config = self.config;
        let Some(rule) = config.compiled(&tag.name) else {
            self.unknown_tag(&tag.name, raw, position);
            return;
        };

        if rule.rule.kind == TagKind::Paired && !self.validator.allows_depth(self.stack.len()) {
            self.warn(&tag.name, position, WarningReason::DepthExceeded);
            self.push_text(raw);
            return;
        }

        let attributes = self.bind_attributes(rule, tag, position);
        match rule.rule.kind {
            TagKind::SelfClosing => {
                let bindings = Bindings {
                    attributes: &attributes,
                    ..Default::default()
                };
                let mut html = String::new();
                rule.template.render(&bindings, &mut html);
                self.buffer().push_str(&html);
            }
            TagKind::Paired => self.stack.push(Frame {
                rule,
                position,
                attributes,
                body: String::new(),
            }),
        }
    }

    fn close_tag(&mut self, name: &str, raw: &str, position: usize) {
        if self.config.compiled(name).is_none() {
            self.unknown_tag(name, raw, position);
            return;
        }

        let Some(depth) = self
            .stack
            .iter()
            .rposition(|frame| frame.rule.rule.name == name)
        else {
            self.warn(name, position, WarningReason::UnmatchedClose);
            self.push_text(raw);
            return;
        };

        while self.stack.len() > depth + 1 {
            if let Some(frame) = self.stack.pop() {
                self.warn(
                    &frame.rule.rule.name,
                    frame.position,
                    WarningReason::ImplicitlyClosed,
                );
                self.render_closed(frame);
            }
        }
        if let Some(frame) = self.stack.pop() {
            self.render_closed(frame);
        }
    }

    fn unknown_tag(&mut self, name: &str, raw: &str, position: usize) {
        match self.config.unknown_tags() {
            UnknownTagPolicy::Passthrough => self.push_text(raw),
            UnknownTagPolicy::Strip => self.warn(name, position, WarningReason::UnknownTag),
            UnknownTagPolicy::Escape => {
                self.warn(name, position, WarningReason::UnknownTag);
                let escaped = escape_bracket_tag(raw);
                self.buffer().push_str(&escaped);
            }
        }
    }

    /// Filter, screen and escape the attributes of an opening tag
    fn bind_attributes(
        &mut self,
        rule: &CompiledRule,
        tag: OpenTag,
        position: usize,
    ) -> Vec<(String, String)> {
        for _ in &tag.malformed {
            self.warn(&tag.name, position, WarningReason::MalformedAttribute);
        }

        let mut bound = Vec::with_capacity(tag.attributes.len());
        for (key, value) in tag.attributes {
            if !rule.rule.attributes_allowed.contains(&key) {
                self.warn(&tag.name, position, WarningReason::AttributeNotAllowed);
                continue;
            }
            if self.validator.is_dangerous_url(&value) {
                self.warn(&tag.name, position, WarningReason::UnsafeAttribute);
                bound.push((key, String::new()));
                continue;
            }
            let escaped = if self.config.escape_text() {
                escape_attribute(&value)
            } else {
                escape_html_attribute(&value)
            };
            bound.push((key, escaped.into_owned()));
        }
        bound
    }

    /// Render a frame whose closing tag was seen
    fn render_closed(&mut self, frame: Frame<'c>) {
        let inner_as_attribute = self.inner_as_attribute(&frame);
        let bindings = Bindings {
            inner: &frame.body,
            inner_as_attribute: &inner_as_attribute,
            attributes: &frame.attributes,
        };
        let mut html = String::with_capacity(frame.body.len() + frame.rule.template.source().len());
        frame.rule.template.render(&bindings, &mut html);
        self.buffer().push_str(&html);
    }

    /// Render a frame left open at end of input
    fn render_unclosed(&mut self, frame: Frame<'c>) {
        let inner_as_attribute = self.inner_as_attribute(&frame);
        let bindings = Bindings {
            inner: &frame.body,
            inner_as_attribute: &inner_as_attribute,
            attributes: &frame.attributes,
        };
        let mut html = String::with_capacity(frame.body.len() + frame.rule.template.source().len());
        frame.rule.template.render_opening(&bindings, &mut html);
        html.push_str(&frame.body);
        self.buffer().push_str(&html);
    }

    fn inner_as_attribute(&mut self, frame: &Frame<'c>) -> String {
        let needs_inner = frame
            .rule
            .template
            .inner_fallback_names()
            .any(|name| !frame.attributes.iter().any(|(key, _)| key == name));
        if !needs_inner {
            return String::new();
        }
        if self.validator.is_dangerous_url(&frame.body) {
            self.warn(
                &frame.rule.rule.name,
                frame.position,
                WarningReason::UnsafeAttribute,
            );
            return String::new();
        }
        // The body is HTML either way: escaped text or markup from the page.
        escape_html_attribute(frame.body.trim()).into_owned()
    }

    fn finish(mut self) -> ConversionResult {
        let unclosed: Vec<(String, usize)> = self
            .stack
            .iter()
            .map(|frame| (frame.rule.rule.name.clone(), frame.position))
            .collect();
        for (name, position) in unclosed {
            self.warn(&name, position, WarningReason::Unclosed);
        }

        while let Some(frame) = self.stack.pop() {
            self.render_unclosed(frame);
        }

        ConversionResult {
            html: self.output,
            warnings: self.warnings,
        }
    }

    /// Append plain text to the innermost open tag
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.config.escape_text() {
            let escaped = escape_text(text);
            self.buffer().push_str(&escaped);
        } else {
            self.buffer().push_str(text);
        }
    }

    fn buffer(&mut self) -> &mut String {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.body,
            None => &mut self.output,
        }
    }

    fn warn(&mut self, tag_name: &str, position: usize, reason: WarningReason) {
        tracing::debug!(tag = tag_name, position, %reason, "bbcode conversion warning");
        self.warnings.push(ConversionWarning {
            tag_name: tag_name.to_string(),
            position,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagRule;
    use proptest::prelude::*;

    fn bold_only(policy: UnknownTagPolicy) -> ConversionConfig {
        ConversionConfig::new(vec![TagRule::paired("b", "<b>{inner}</b>")], policy)
            .expect("valid dialect")
    }

    fn small_dialect(policy: UnknownTagPolicy) -> ConversionConfig {
        ConversionConfig::new(
            vec![
                TagRule::paired("b", "<b>{inner}</b>"),
                TagRule::paired("i", "<i>{inner}</i>"),
                TagRule::paired("quote", "<blockquote><cite>{value}</cite>{inner}</blockquote>")
                    .with_attributes(["value"]),
                TagRule::paired("url", r#"<a href="{value|inner}">{inner}</a>"#)
                    .with_attributes(["value"]),
                TagRule::paired("img", r#"<img src="{value|inner}" width="{width}" />"#)
                    .with_attributes(["value", "width"]),
                TagRule::self_closing("hr", "<hr />"),
            ],
            policy,
        )
        .expect("valid dialect")
    }

    fn reasons(result: &ConversionResult) -> Vec<WarningReason> {
        result.warnings.iter().map(|w| w.reason).collect()
    }

    #[test]
    fn test_simple_bold() {
        let result = convert("[b]hi[/b]", &bold_only(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<b>hi</b>");
        assert!(result.is_clean());
    }

    #[test]
    fn test_empty_input() {
        let result = convert("", &small_dialect(UnknownTagPolicy::Strip));
        assert_eq!(result, ConversionResult::default());
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "No tags here, just [1] footnote and a [ bracket.";
        let result = convert(text, &small_dialect(UnknownTagPolicy::Strip));
        assert_eq!(result.html, text);
        assert!(result.is_clean());
    }

    #[test]
    fn test_unmatched_close() {
        let result = convert("[/b]hello", &bold_only(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "[/b]hello");
        assert_eq!(
            result.warnings,
            vec![ConversionWarning {
                tag_name: "b".to_string(),
                position: 0,
                reason: WarningReason::UnmatchedClose,
            }]
        );
    }

    #[test]
    fn test_unclosed_open() {
        let result = convert("[b]hello", &bold_only(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<b>hello");
        assert_eq!(reasons(&result), vec![WarningReason::Unclosed]);
        assert_eq!(result.warnings[0].position, 0);
    }

    #[test]
    fn test_unclosed_keeps_opening_half_with_attributes() {
        let result = convert(
            "before [quote=Ann]said it",
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert_eq!(result.html, "before <blockquote><cite>Ann</cite>said it");
        assert_eq!(result.warnings[0].position, 7);
    }

    #[test]
    fn test_nested_unclosed_warn_in_opening_order() {
        let result = convert("[b]x[i]y", &small_dialect(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<b>x<i>y");
        let names: Vec<_> = result.warnings.iter().map(|w| w.tag_name.as_str()).collect();
        assert_eq!(names, vec!["b", "i"]);
    }

    #[test]
    fn test_case_insensitive_tags() {
        let result = convert("[B]loud[/b]", &small_dialect(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<b>loud</b>");
        assert!(result.is_clean());
    }

    #[test]
    fn test_identical_nesting_is_literal() {
        let result = convert("[b][b]x[/b][/b]", &bold_only(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<b><b>x</b></b>");
        assert!(result.is_clean());
    }

    #[test]
    fn test_misnested_close_implicitly_closes() {
        let result = convert("[b][i]x[/b]y[/i]", &small_dialect(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<b><i>x</i></b>y[/i]");
        assert_eq!(
            reasons(&result),
            vec![WarningReason::ImplicitlyClosed, WarningReason::UnmatchedClose]
        );
        assert_eq!(result.warnings[0].position, 3);
        assert_eq!(result.warnings[1].position, 12);
    }

    #[test]
    fn test_self_closing() {
        let result = convert("a[hr]b", &small_dialect(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "a<hr />b");
        assert!(result.is_clean());

        let result = convert("a[/hr]b", &small_dialect(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "a[/hr]b");
        assert_eq!(reasons(&result), vec![WarningReason::UnmatchedClose]);
    }

    #[test]
    fn test_unknown_passthrough() {
        let result = convert("[marquee]x[/marquee]", &bold_only(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "[marquee]x[/marquee]");
        assert!(result.is_clean());
    }

    #[test]
    fn test_unknown_strip() {
        let result = convert("[marquee]x[/marquee]", &bold_only(UnknownTagPolicy::Strip));
        assert_eq!(result.html, "x");
        assert_eq!(
            reasons(&result),
            vec![WarningReason::UnknownTag, WarningReason::UnknownTag]
        );
        assert_eq!(result.warnings[1].position, 10);
    }

    #[test]
    fn test_unknown_escape() {
        let result = convert("[marquee]x[/marquee]", &bold_only(UnknownTagPolicy::Escape));
        assert_eq!(result.html, "&#91;marquee&#93;x&#91;/marquee&#93;");
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_url_falls_back_to_inner() {
        let result = convert(
            "[url]http://example.com/?a=1&b=2[/url]",
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert_eq!(
            result.html,
            r#"<a href="http://example.com/?a=1&amp;b=2">http://example.com/?a=1&b=2</a>"#
        );
        assert!(result.is_clean());
    }

    #[test]
    fn test_url_with_value() {
        let result = convert(
            "[url=https://example.com]site[/url]",
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert_eq!(result.html, r#"<a href="https://example.com">site</a>"#);
        assert!(result.is_clean());
    }

    #[test]
    fn test_javascript_url_is_removed() {
        let result = convert(
            "[url=javascript:alert(1)]click[/url]",
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert_eq!(result.html, r#"<a href="">click</a>"#);
        assert_eq!(reasons(&result), vec![WarningReason::UnsafeAttribute]);

        let result = convert(
            "[img]javascript:alert(1)[/img]",
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert_eq!(result.html, r#"<img src="" width="" />"#);
        assert_eq!(reasons(&result), vec![WarningReason::UnsafeAttribute]);
    }

    #[test]
    fn test_serialized_ampersands_are_not_escaped_twice() {
        let dialect = small_dialect(UnknownTagPolicy::Passthrough);

        let result = convert("[url]http://a.b/?x=1&amp;y=2[/url]", &dialect);
        assert_eq!(
            result.html,
            r#"<a href="http://a.b/?x=1&amp;y=2">http://a.b/?x=1&amp;y=2</a>"#
        );

        let result = convert("[url=http://a.b/?x=1&amp;y=2&z=3]go[/url]", &dialect);
        assert_eq!(result.html, r#"<a href="http://a.b/?x=1&amp;y=2&amp;z=3">go</a>"#);
        assert!(result.is_clean());
    }

    #[test]
    fn test_plain_text_attributes_escape_every_ampersand() {
        let dialect = small_dialect(UnknownTagPolicy::Passthrough).with_escape_text(true);

        let result = convert("[url=http://a.b/?x=1&amp;y=2]go[/url]", &dialect);
        assert_eq!(result.html, r#"<a href="http://a.b/?x=1&amp;amp;y=2">go</a>"#);

        let result = convert("[url]http://a.b/?x=1&y=2[/url]", &dialect);
        assert_eq!(
            result.html,
            r#"<a href="http://a.b/?x=1&amp;y=2">http://a.b/?x=1&amp;y=2</a>"#
        );
    }

    #[test]
    fn test_encoded_javascript_url_is_dropped() {
        let dialect = small_dialect(UnknownTagPolicy::Passthrough);

        let result = convert("[url=&#106;avascript&colon;alert(1)]x[/url]", &dialect);
        assert_eq!(result.html, r#"<a href="">x</a>"#);
        assert_eq!(reasons(&result), vec![WarningReason::UnsafeAttribute]);

        let result = convert("[url]&#x6A;avascript:alert(1)[/url]", &dialect);
        assert!(!result.html.contains("avascript:alert(1)\""));
        assert_eq!(reasons(&result), vec![WarningReason::UnsafeAttribute]);
    }

    #[test]
    fn test_attribute_breakout_is_escaped() {
        let result = convert(
            r#"[url=x" onclick="evil()]y[/url]"#,
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert!(!result.html.contains(r#"" onclick"#));
        assert!(result.html.contains("&quot;"));
    }

    #[test]
    fn test_attribute_not_allowed() {
        let result = convert("[b=big]x[/b]", &small_dialect(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<b>x</b>");
        assert_eq!(reasons(&result), vec![WarningReason::AttributeNotAllowed]);
    }

    #[test]
    fn test_named_attributes() {
        let result = convert(
            "[img width=100 height=20]pic.png[/img]",
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert_eq!(result.html, r#"<img src="pic.png" width="100" />"#);
        assert_eq!(reasons(&result), vec![WarningReason::AttributeNotAllowed]);
    }

    #[test]
    fn test_malformed_attribute() {
        let result = convert("[quote=]x[/quote]", &small_dialect(UnknownTagPolicy::Passthrough));
        assert_eq!(result.html, "<blockquote><cite></cite>x</blockquote>");
        assert_eq!(reasons(&result), vec![WarningReason::MalformedAttribute]);
    }

    #[test]
    fn test_depth_limit() {
        let config = bold_only(UnknownTagPolicy::Passthrough)
            .with_max_depth(2)
            .expect("valid depth");
        let result = convert("[b][b][b]x[/b][/b][/b]", &config);
        assert_eq!(result.html, "<b><b>[b]x</b></b>[/b]");
        assert_eq!(
            reasons(&result),
            vec![WarningReason::DepthExceeded, WarningReason::UnmatchedClose]
        );
    }

    #[test]
    fn test_escape_text_option() {
        let config = bold_only(UnknownTagPolicy::Passthrough).with_escape_text(true);
        let result = convert("[b]<script>[/b] & co", &config);
        assert_eq!(result.html, "<b>&lt;script&gt;</b> &amp; co");
    }

    #[test]
    fn test_output_preserves_order() {
        let result = convert(
            "one [b]two[/b] three [i]four[/i] five",
            &small_dialect(UnknownTagPolicy::Passthrough),
        );
        assert_eq!(result.html, "one <b>two</b> three <i>four</i> five");
    }

    #[test]
    fn test_converter_struct_matches_free_function() {
        let config = small_dialect(UnknownTagPolicy::Escape);
        let converter = BbCodeConverter::new(config.clone());
        let input = "[quote=Bob][b]x[/quote][zzz]";
        assert_eq!(converter.convert(input), convert(input, &config));
        assert_eq!(converter.config().unknown_tags(), UnknownTagPolicy::Escape);
    }

    #[test]
    fn test_warning_display() {
        let warning = ConversionWarning {
            tag_name: "b".to_string(),
            position: 4,
            reason: WarningReason::Unclosed,
        };
        assert_eq!(warning.to_string(), "[b] at byte 4: tag not closed before end of input");
    }

    // Well-formed input built from the dialect converts without warnings.
    fn well_formed() -> impl Strategy<Value = (String, String)> {
        let leaf = "[a-z ]{0,8}".prop_map(|s| (s.clone(), s));
        leaf.prop_recursive(4, 32, 3, |inner| {
            prop_oneof![
                (prop::sample::select(vec!["b", "i"]), inner.clone()).prop_map(|(tag, (src, html))| {
                    (format!("[{tag}]{src}[/{tag}]"), format!("<{tag}>{html}</{tag}>"))
                }),
                prop::collection::vec(inner, 1..3).prop_map(|parts| {
                    parts.into_iter().fold((String::new(), String::new()), |mut acc, (s, h)| {
                        acc.0.push_str(&s);
                        acc.1.push_str(&h);
                        acc
                    })
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_well_formed_input_converts_cleanly((source, expected) in well_formed()) {
            let result = convert(&source, &small_dialect(UnknownTagPolicy::Strip));
            prop_assert_eq!(result.html, expected);
            prop_assert!(result.warnings.is_empty());
        }

        #[test]
        fn prop_conversion_never_panics(input in "[\\[\\]/=a-z\"' ]{0,64}") {
            let config = small_dialect(UnknownTagPolicy::Escape);
            let _ = convert(&input, &config);
        }

        #[test]
        fn prop_converted_output_is_stable(source in "[a-z <>/]{0,16}") {
            let config = small_dialect(UnknownTagPolicy::Passthrough);
            let first = convert(&format!("[b]{source}[/b]"), &config);
            let second = convert(&first.html, &config);
            prop_assert_eq!(&second.html, &first.html);
            prop_assert!(second.warnings.is_empty());
        }
    }
}
