//! Forum dialect configuration
//!
//! A [`ConversionConfig`] is the full description of one forum's BBCode
//! dialect: which tags exist, how each renders to HTML, and what happens to
//! tags nobody declared. It is validated once when built and never changes
//! afterwards, so one value can be shared by any number of conversions.
//!
//! Dialects can be built in code, loaded from TOML, or taken from the stock
//! vBulletin preset:
//!
//! ```rust
//! use vbulletin_bbcode::config::{ConversionConfig, TagRule, UnknownTagPolicy};
//!
//! let config = ConversionConfig::new(
//!     vec![
//!         TagRule::paired("b", "<b>{inner}</b>"),
//!         TagRule::paired("spoiler", r#"<div class="spoiler">{inner}</div>"#),
//!     ],
//!     UnknownTagPolicy::Passthrough,
//! )
//! .unwrap();
//! assert!(config.rule("SPOILER").is_some());
//!
//! let toml = r#"
//! unknown_tags = "escape"
//!
//! [[tag]]
//! name = "hr"
//! kind = "self_closing"
//! template = "<hr />"
//! "#;
//! let config = ConversionConfig::from_toml_str(toml).unwrap();
//! assert_eq!(config.unknown_tags(), UnknownTagPolicy::Escape);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::ConfigError;
use crate::security::MAX_NESTING_DEPTH;
use crate::tag::{is_valid_attribute_name, is_valid_tag_name};
use crate::template::Template;

/// Whether a tag encloses content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    /// `[name]...[/name]`
    #[default]
    Paired,
    /// `[name]` with no closing counterpart
    SelfClosing,
}

/// What to do with well-formed tags whose name is not in the dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTagPolicy {
    /// Drop the bracket text
    Strip,
    /// Keep the bracket text unchanged
    ///
    /// No warning is recorded: the text is not altered, prose such as
    /// `[sic]` stays quiet, and converting the output again gives the same
    /// result.
    #[default]
    Passthrough,
    /// Keep the bracket text with the brackets entity-encoded
    Escape,
}

/// Declaration of one tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagRule {
    /// Tag name, matched case-insensitively
    pub name: String,
    /// Paired or self-closing
    #[serde(default)]
    pub kind: TagKind,
    /// Attribute names the tag accepts; `value` is the `[name=value]` form
    #[serde(default, rename = "attributes")]
    pub attributes_allowed: BTreeSet<String>,
    /// HTML template, see [`crate::template`]
    #[serde(rename = "template")]
    pub html_template: String,
}

impl TagRule {
    /// Declare a paired tag
    pub fn paired(name: &str, html_template: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TagKind::Paired,
            attributes_allowed: BTreeSet::new(),
            html_template: html_template.to_string(),
        }
    }

    /// Declare a self-closing tag
    pub fn self_closing(name: &str, html_template: &str) -> Self {
        Self {
            kind: TagKind::SelfClosing,
            ..Self::paired(name, html_template)
        }
    }

    /// Allow the given attributes
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes_allowed
            .extend(attributes.into_iter().map(Into::into));
        self
    }
}

/// A validated rule with its compiled template
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) rule: TagRule,
    pub(crate) template: Template,
}

/// Immutable, validated description of one forum dialect
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    rules: Vec<CompiledRule>,
    index: HashMap<String, usize>,
    unknown_tags: UnknownTagPolicy,
    escape_text: bool,
    max_depth: usize,
}

/// Dialect file layout
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DialectFile {
    #[serde(default)]
    unknown_tags: UnknownTagPolicy,
    #[serde(default)]
    escape_text: bool,
    #[serde(default = "default_max_depth")]
    max_depth: usize,
    #[serde(default, rename = "tag")]
    tags: Vec<TagRule>,
}

fn default_max_depth() -> usize {
    MAX_NESTING_DEPTH
}

impl ConversionConfig {
    /// Validate `rules` and build a dialect
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateTag`] when two rules share a name
    /// - [`ConfigError::InvalidTagName`] / [`ConfigError::InvalidAttributeName`]
    ///   for names the scanner can never produce
    /// - [`ConfigError::MissingPlaceholder`] when a paired template never
    ///   references `{inner}`
    /// - [`ConfigError::InnerInSelfClosing`] when a self-closing template does
    /// - [`ConfigError::UnknownPlaceholder`] for placeholders naming an
    ///   attribute the rule does not allow
    /// - [`ConfigError::Template`] for template syntax errors
    pub fn new(rules: Vec<TagRule>, unknown_tags: UnknownTagPolicy) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut index = HashMap::with_capacity(rules.len());

        for mut rule in rules {
            rule.name = rule.name.to_ascii_lowercase();
            if !is_valid_tag_name(&rule.name) {
                return Err(ConfigError::InvalidTagName(rule.name));
            }
            if index.contains_key(&rule.name) {
                return Err(ConfigError::DuplicateTag(rule.name));
            }

            rule.attributes_allowed = rule
                .attributes_allowed
                .iter()
                .map(|attribute| attribute.to_ascii_lowercase())
                .collect();
            if let Some(attribute) = rule
                .attributes_allowed
                .iter()
                .find(|attribute| !is_valid_attribute_name(attribute))
            {
                return Err(ConfigError::InvalidAttributeName {
                    tag: rule.name.clone(),
                    attribute: attribute.clone(),
                });
            }

            let template = Template::compile(&rule.name, &rule.html_template)?;
            validate_template(&rule, &template)?;

            index.insert(rule.name.clone(), compiled.len());
            compiled.push(CompiledRule { rule, template });
        }

        tracing::debug!(
            tags = compiled.len(),
            unknown_tags = ?unknown_tags,
            "compiled bbcode dialect"
        );

        Ok(Self {
            rules: compiled,
            index,
            unknown_tags,
            escape_text: false,
            max_depth: MAX_NESTING_DEPTH,
        })
    }

    /// HTML-escape text outside tags (for plain-text sources)
    pub fn with_escape_text(mut self, escape_text: bool) -> Self {
        self.escape_text = escape_text;
        self
    }

    /// Limit the number of simultaneously open tags
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidMaxDepth`] when `max_depth` is zero.
    pub fn with_max_depth(mut self, max_depth: usize) -> Result<Self, ConfigError> {
        if max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }
        self.max_depth = max_depth;
        Ok(self)
    }

    /// Parse a TOML dialect description
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: DialectFile = toml::from_str(source)?;
        Self::new(file.tags, file.unknown_tags)?
            .with_escape_text(file.escape_text)
            .with_max_depth(file.max_depth)
    }

    /// Load a TOML dialect file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading bbcode dialect");
        Self::from_toml_str(&source)
    }

    /// The stock vBulletin 3/4 dialect
    ///
    /// Unknown tags pass through untouched, matching how vBulletin itself
    /// renders tags it does not know.
    pub fn vbulletin() -> Result<Self, ConfigError> {
        Self::new(vbulletin_rules(), UnknownTagPolicy::Passthrough)
    }

    /// Rules in declaration order
    pub fn rules(&self) -> impl Iterator<Item = &TagRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    /// Look a rule up by name, case-insensitively
    pub fn rule(&self, name: &str) -> Option<&TagRule> {
        self.compiled(&name.to_ascii_lowercase())
            .map(|compiled| &compiled.rule)
    }

    /// Look a compiled rule up by an already-lowercased name
    pub(crate) fn compiled(&self, name: &str) -> Option<&CompiledRule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    /// Unknown-tag policy
    pub fn unknown_tags(&self) -> UnknownTagPolicy {
        self.unknown_tags
    }

    /// Whether text outside tags is HTML-escaped
    pub fn escape_text(&self) -> bool {
        self.escape_text
    }

    /// Maximum number of simultaneously open tags
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

fn validate_template(rule: &TagRule, template: &Template) -> Result<(), ConfigError> {
    match rule.kind {
        TagKind::Paired if !template.references_inner() => {
            return Err(ConfigError::MissingPlaceholder {
                tag: rule.name.clone(),
                placeholder: "inner",
            });
        }
        TagKind::Paired if template.inner_count() > 1 => {
            return Err(ConfigError::Template {
                tag: rule.name.clone(),
                message: "{inner} may appear at most once".to_string(),
            });
        }
        TagKind::SelfClosing if template.references_inner() => {
            return Err(ConfigError::InnerInSelfClosing {
                tag: rule.name.clone(),
            });
        }
        _ => {}
    }

    if let Some(unknown) = template
        .attribute_names()
        .find(|name| !rule.attributes_allowed.contains(*name))
    {
        return Err(ConfigError::UnknownPlaceholder {
            tag: rule.name.clone(),
            placeholder: unknown.to_string(),
        });
    }

    Ok(())
}

fn vbulletin_rules() -> Vec<TagRule> {
    let value = ["value"];
    vec![
        TagRule::paired("b", "<b>{inner}</b>"),
        TagRule::paired("i", "<i>{inner}</i>"),
        TagRule::paired("u", "<u>{inner}</u>"),
        TagRule::paired("s", "<s>{inner}</s>"),
        TagRule::paired("color", r#"<span style="color: {value}">{inner}</span>"#)
            .with_attributes(value),
        TagRule::paired("size", r#"<font size="{value}">{inner}</font>"#).with_attributes(value),
        TagRule::paired("font", r#"<span style="font-family: {value}">{inner}</span>"#)
            .with_attributes(value),
        TagRule::paired("highlight", r#"<span class="highlight">{inner}</span>"#),
        TagRule::paired("left", r#"<div style="text-align: left;">{inner}</div>"#),
        TagRule::paired("center", r#"<div style="text-align: center;">{inner}</div>"#),
        TagRule::paired("right", r#"<div style="text-align: right;">{inner}</div>"#),
        TagRule::paired("indent", r#"<blockquote class="indent">{inner}</blockquote>"#),
        TagRule::paired(
            "url",
            r#"<a href="{value|inner}" target="_blank" rel="nofollow">{inner}</a>"#,
        )
        .with_attributes(value),
        TagRule::paired("email", r#"<a href="mailto:{value|inner}">{inner}</a>"#)
            .with_attributes(value),
        TagRule::paired("img", r#"<img src="{value|inner}" alt="" />"#).with_attributes(value),
        TagRule::paired(
            "quote",
            r#"<blockquote class="quote"><cite>{value}</cite>{inner}</blockquote>"#,
        )
        .with_attributes(value),
        TagRule::paired("code", r#"<pre class="code">{inner}</pre>"#),
        TagRule::paired("php", r#"<pre class="php">{inner}</pre>"#),
        TagRule::paired("html", r#"<pre class="html">{inner}</pre>"#),
        TagRule::paired("list", r#"<ul class="list" data-style="{value}">{inner}</ul>"#)
            .with_attributes(value),
        TagRule::self_closing("*", "<li>"),
        TagRule::paired("spoiler", r#"<div class="spoiler">{inner}</div>"#),
        TagRule::self_closing("hr", "<hr />"),
    ]
}
