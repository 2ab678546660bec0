//! Forum post extraction from vBulletin thread pages
//!
//! A vBulletin 4 thread page lists posts as `<li id="post_N">` elements.
//! Each post carries:
//!
//! - the author in `<span class="username">`
//! - the post time in a `datetime`/`date` container
//! - the message in `<blockquote class="postcontent restore">` (older
//!   templates use `<div class="content">`)
//! - the in-thread post number in `<a class="postcounter">#N</a>`; the
//!   element id carries the forum-wide post id
//!
//! The message is returned as inner HTML so the BBCode it still contains
//! can be converted with [`ForumPost::convert_body`]. Blocks vBulletin has
//! already rendered are turned back into BBCode first, so the dialect
//! decides their HTML like any other tag:
//!
//! - `div.bbcode_container` with a `Quote:` description becomes
//!   `[quote=Author]message[/quote]` (author from `div.bbcode_postedby
//!   strong`); `Code:`, `PHP Code:` and `HTML Code:` become `[code]`,
//!   `[php]` and `[html]`
//! - `div.spoiler` becomes `[spoiler]...[/spoiler]`, dropping the
//!   show/hide header around it
//!
//! # Examples
//!
//! ```rust
//! use vbulletin_bbcode::parser::parse_page;
//! use vbulletin_bbcode::post::PostExtractor;
//!
//! let html = br#"<ol id="posts">
//!   <li id="post_7">
//!     <span class="username">Ann</span>
//!     <div class="datetime">Today, 10:15 AM</div>
//!     <blockquote class="postcontent restore">[b]hello[/b]</blockquote>
//!   </li>
//! </ol>"#;
//!
//! let dom = parse_page(html).unwrap();
//! let posts = PostExtractor::new().extract(&dom).unwrap();
//! assert_eq!(posts[0].number, 7);
//! assert_eq!(posts[0].author, "Ann");
//! assert_eq!(posts[0].body_html, "[b]hello[/b]");
//! ```

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use serde::Serialize;
use std::cell::Ref;

use crate::config::ConversionConfig;
use crate::converter::{ConversionResult, convert};
use crate::error::ExtractionError;
use crate::security::{escape_attribute, escape_text};
use crate::tag::is_valid_tag_name;

const POST_ID_PREFIX: &str = "post_";

/// Unit of a relative ("3 hours ago") timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    fn from_word(word: &str) -> Option<Self> {
        let word = word.to_lowercase();
        [
            ("second", Self::Second),
            ("minute", Self::Minute),
            ("hour", Self::Hour),
            ("day", Self::Day),
            ("week", Self::Week),
            ("month", Self::Month),
            ("year", Self::Year),
        ]
        .into_iter()
        .find(|(stem, _)| word.starts_with(stem))
        .map(|(_, unit)| unit)
    }
}

/// Post time as displayed by the forum
///
/// vBulletin renders either a "friendly" relative time or a date and a
/// time joined by `", "`. The date format itself is forum-configurable, so
/// absolute dates are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostTimestamp {
    /// `"5 minutes ago"`
    Relative { amount: u32, unit: TimeUnit },
    /// `"Today, 10:15 AM"`
    Today { time: String },
    /// `"Yesterday, 11:02 PM"`
    Yesterday { time: String },
    /// `"Monday, June 4, 2012, 09:42 PM"`: split at the last `", "`
    Absolute { date: String, time: String },
    /// Anything else, whitespace-collapsed
    Unknown { raw: String },
}

impl PostTimestamp {
    /// Classify a displayed post time
    ///
    /// ```rust
    /// use vbulletin_bbcode::post::{PostTimestamp, TimeUnit};
    ///
    /// assert_eq!(
    ///     PostTimestamp::parse("3 hours ago"),
    ///     PostTimestamp::Relative { amount: 3, unit: TimeUnit::Hour }
    /// );
    /// assert_eq!(
    ///     PostTimestamp::parse("Wed, 06-13-2012,\u{a0}09:42 PM"),
    ///     PostTimestamp::Absolute { date: "Wed, 06-13-2012".into(), time: "09:42 PM".into() }
    /// );
    /// ```
    pub fn parse(text: &str) -> Self {
        let raw = text.split_whitespace().collect::<Vec<_>>().join(" ");

        if raw.to_lowercase().ends_with(" ago") {
            let mut words = raw.split(' ');
            let amount = words.next().and_then(|w| w.parse::<u32>().ok());
            let unit = words.next().and_then(TimeUnit::from_word);
            return match (amount, unit) {
                (Some(amount), Some(unit)) => Self::Relative { amount, unit },
                _ => Self::Unknown { raw },
            };
        }

        let Some((date, time)) = raw.rsplit_once(", ") else {
            return Self::Unknown { raw };
        };
        let time = time.to_string();
        match date.to_lowercase().as_str() {
            "today" => Self::Today { time },
            "yesterday" => Self::Yesterday { time },
            _ => Self::Absolute {
                date: date.to_string(),
                time,
            },
        }
    }
}

/// One post of a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForumPost {
    /// Post number within the thread, from the `#N` post counter or, when
    /// the page has none, the `post_N` element id
    pub number: u32,
    /// Author user name
    pub author: String,
    /// Displayed post time
    pub timestamp: PostTimestamp,
    /// Inner HTML of the message container with rendered blocks restored
    /// to BBCode, trimmed
    pub body_html: String,
}

impl ForumPost {
    /// Convert the BBCode left in the message body
    pub fn convert_body(&self, config: &ConversionConfig) -> ConversionResult {
        let result = convert(&self.body_html, config);
        if !result.is_clean() {
            tracing::debug!(
                post = self.number,
                warnings = result.warnings.len(),
                "post body converted with warnings"
            );
        }
        result
    }
}

/// Extracts [`ForumPost`]s from a parsed thread page
#[derive(Debug, Default, Clone, Copy)]
pub struct PostExtractor;

impl PostExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every post in document order
    ///
    /// # Errors
    ///
    /// [`ExtractionError::MissingField`] when a post element has no author
    /// or no message body. Elements whose id is `post_` followed by
    /// something other than a number are skipped.
    pub fn extract(&self, dom: &RcDom) -> Result<Vec<ForumPost>, ExtractionError> {
        let mut posts = Vec::new();
        self.collect_posts(&dom.document, &mut posts)?;
        tracing::debug!(posts = posts.len(), "extracted thread posts");
        Ok(posts)
    }

    fn collect_posts(
        &self,
        node: &Handle,
        posts: &mut Vec<ForumPost>,
    ) -> Result<(), ExtractionError> {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
            && name.local.as_ref() == "li"
            && let Some(id) = get_attr(&attrs.borrow(), "id")
            && let Some(suffix) = id.strip_prefix(POST_ID_PREFIX)
        {
            match suffix.parse::<u32>() {
                Ok(id) => {
                    let number = post_counter(node).unwrap_or(id);
                    posts.push(self.extract_post(node, number)?);
                }
                Err(_) => tracing::warn!(id = %id, "skipping post element with non-numeric id"),
            }
            return Ok(());
        }

        for child in node.children.borrow().iter() {
            self.collect_posts(child, posts)?;
        }
        Ok(())
    }

    fn extract_post(&self, node: &Handle, number: u32) -> Result<ForumPost, ExtractionError> {
        let missing = |field| ExtractionError::MissingField {
            post: number,
            field,
        };

        let author = find_element(node, &|tag, attrs| tag == "span" && has_class(attrs, "username"))
            .map(|username| text_content(&username).trim().to_string())
            .filter(|author| !author.is_empty())
            .ok_or_else(|| missing("author"))?;

        let timestamp = find_element(node, &|tag, attrs| {
            matches!(tag, "div" | "span") && (has_class(attrs, "datetime") || has_class(attrs, "date"))
        })
        .map(|element| PostTimestamp::parse(&text_content(&element)))
        .unwrap_or_else(|| PostTimestamp::Unknown { raw: String::new() });

        let body = find_element(node, &|tag, attrs| tag == "blockquote" && has_class(attrs, "restore"))
            .or_else(|| find_element(node, &|tag, attrs| tag == "div" && has_class(attrs, "content")))
            .ok_or_else(|| missing("body"))?;

        let mut body_html = String::new();
        render_children(&body, &mut body_html)?;

        Ok(ForumPost {
            number,
            author,
            timestamp,
            body_html: body_html.trim().to_string(),
        })
    }
}

/// In-thread number from the `#N` post counter link
fn post_counter(node: &Handle) -> Option<u32> {
    let counter = find_element(node, &|tag, attrs| tag == "a" && has_class(attrs, "postcounter"))?;
    let text = text_content(&counter);
    let number = text.trim().trim_start_matches('#').parse().ok();
    if number.is_none() {
        tracing::debug!(counter = %text.trim(), "post counter is not a number");
    }
    number
}

/// A block vBulletin rendered to HTML that is restored to BBCode
struct RenderedBlock {
    tag: String,
    author: Option<String>,
    body: Handle,
}

impl RenderedBlock {
    fn recognize(node: &Handle) -> Option<Self> {
        if !is_element(node, "div", None) {
            return None;
        }
        if is_element(node, "div", Some("bbcode_container")) {
            return Self::container(node);
        }
        if is_element(node, "div", Some("spoiler")) {
            return Some(Self::spoiler(node.clone()));
        }
        spoiler_in_wrapper(node).map(Self::spoiler)
    }

    fn spoiler(body: Handle) -> Self {
        Self {
            tag: "spoiler".to_string(),
            author: None,
            body,
        }
    }

    /// `div.bbcode_container`: a description such as `Quote:` followed by
    /// the rendered block
    fn container(node: &Handle) -> Option<Self> {
        let children = element_children(node);
        let description = children.first().filter(|child| is_element(child, "div", None))?;

        let label = text_content(description).trim().trim_end_matches(':').trim().to_lowercase();
        let tag = label.strip_suffix(" code").unwrap_or(&label).to_string();
        if !is_valid_tag_name(&tag) {
            tracing::debug!(label = %label, "leaving unrecognized bbcode container as HTML");
            return None;
        }

        // Nested containers come after this block's own byline, so the first
        // match in document order belongs to this block.
        let author = find_element(node, &|element, attrs| {
            element == "div" && (has_class(attrs, "bbcode_postedby") || has_class(attrs, "bbcode_container"))
        })
        .filter(|found| is_element(found, "div", Some("bbcode_postedby")))
        .and_then(|posted_by| find_element(&posted_by, &|element, _| element == "strong"))
        .map(|strong| text_content(&strong).split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|author| !author.is_empty() && !author.contains(']'));

        let message = || find_element(node, &|element, attrs| element == "div" && has_class(attrs, "message"));
        let body = author
            .as_ref()
            .and_then(|_| message())
            .or_else(|| {
                find_element(node, &|element, attrs| {
                    (element == "div" && has_class(attrs, "quote_container"))
                        || (matches!(element, "pre" | "div") && has_class(attrs, "bbcode_code"))
                })
            })
            .or_else(message)
            .or_else(|| children.get(1).cloned())?;

        Some(Self { tag, author, body })
    }

    fn render(&self, out: &mut String) -> Result<(), ExtractionError> {
        let mut body = String::new();
        for child in self.body.children.borrow().iter() {
            if is_element(child, "div", None) && text_content(child).trim().is_empty() {
                continue;
            }
            render_node(child, &mut body)?;
        }

        out.push('[');
        out.push_str(&self.tag);
        if let Some(author) = &self.author {
            out.push('=');
            out.push_str(&escape_text(author));
        }
        out.push(']');
        out.push_str(body.trim());
        out.push_str("[/");
        out.push_str(&self.tag);
        out.push(']');
        Ok(())
    }
}

/// The `div.spoiler` inside a show/hide wrapper: one header div followed
/// by the spoiler, with no other content
fn spoiler_in_wrapper(node: &Handle) -> Option<Handle> {
    let has_loose_text = node.children.borrow().iter().any(|child| match child.data {
        NodeData::Text { ref contents } => !contents.borrow().trim().is_empty(),
        _ => false,
    });
    if has_loose_text {
        return None;
    }

    let children = element_children(node);
    let (spoiler, header) = children.split_last()?;
    (header.len() == 1
        && is_element(&header[0], "div", None)
        && is_element(spoiler, "div", Some("spoiler")))
    .then(|| spoiler.clone())
}

/// Serialize the children of `node`, restoring rendered blocks to BBCode
fn render_children(node: &Handle, out: &mut String) -> Result<(), ExtractionError> {
    for child in node.children.borrow().iter() {
        render_node(child, out)?;
    }
    Ok(())
}

fn render_node(node: &Handle, out: &mut String) -> Result<(), ExtractionError> {
    if let Some(block) = RenderedBlock::recognize(node) {
        return block.render(out);
    }

    let NodeData::Element {
        ref name,
        ref attrs,
        ..
    } = node.data
    else {
        return serialize_node(node, TraversalScope::IncludeNode, out);
    };
    if find_element(node, &|tag, attrs| {
        tag == "div" && (has_class(attrs, "bbcode_container") || has_class(attrs, "spoiler"))
    })
    .is_none()
    {
        return serialize_node(node, TraversalScope::IncludeNode, out);
    }

    // Only elements with a rendered block inside are written by hand; they
    // have children, so none of them is a void element.
    out.push('<');
    out.push_str(&name.local);
    for attr in attrs.borrow().iter() {
        out.push(' ');
        out.push_str(&attr.name.local);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }
    out.push('>');
    render_children(node, out)?;
    out.push_str("</");
    out.push_str(&name.local);
    out.push('>');
    Ok(())
}

type Matcher<'a> = &'a dyn Fn(&str, &Ref<Vec<html5ever::Attribute>>) -> bool;

/// First descendant element (depth-first, document order) matching `matches`
fn find_element(node: &Handle, matches: Matcher<'_>) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = child.data
            && matches(name.local.as_ref(), &attrs.borrow())
        {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, matches) {
            return Some(found);
        }
    }
    None
}

fn get_attr(attrs: &Ref<Vec<html5ever::Attribute>>, name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.to_string())
}

fn has_class(attrs: &Ref<Vec<html5ever::Attribute>>, class: &str) -> bool {
    get_attr(attrs, "class").is_some_and(|value| value.split_ascii_whitespace().any(|c| c == class))
}

fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    out
}

fn push_text(node: &Handle, out: &mut String) {
    match node.data {
        NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                push_text(child, out);
            }
        }
        _ => {}
    }
}

fn is_element(node: &Handle, tag: &str, class: Option<&str>) -> bool {
    match node.data {
        NodeData::Element {
            ref name,
            ref attrs,
            ..
        } => name.local.as_ref() == tag && class.is_none_or(|class| has_class(&attrs.borrow(), class)),
        _ => false,
    }
}

fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

fn serialize_node(
    node: &Handle,
    traversal_scope: TraversalScope,
    out: &mut String,
) -> Result<(), ExtractionError> {
    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    serialize(&mut bytes, &SerializableHandle::from(node.clone()), opts)?;
    let html = String::from_utf8(bytes)
        .map_err(|e| ExtractionError::Encoding(format!("serialized post body: {e}")))?;
    out.push_str(&html);
    Ok(())
}
