//! Markup content stored in description-like fields and its HTML rendering.

use pulldown_cmark::{html, Event, Options, Parser};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{FieldsError, Result};

/// Markup identifier for plain text content.
pub const MARKUP_PLAIN_TEXT: &str = "PlainText";
/// Markup identifier for Markdown content.
pub const MARKUP_MARKDOWN: &str = "Markdown";
/// Markup assumed when a value does not name one.
pub const MARKUP_DEFAULT: &str = MARKUP_PLAIN_TEXT;

const SUPPORTED_MARKUPS: [&str; 2] = [MARKUP_PLAIN_TEXT, MARKUP_MARKDOWN];

const CONTENT_KEY: &str = "content";
const MARKUP_KEY: &str = "markup";

/// Content paired with the markup language it is written in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkupContent {
    pub content: String,
    pub markup: String,
}

impl MarkupContent {
    pub fn new(content: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            markup: markup.into(),
        }
    }

    /// Wrap a legacy plain value; the markup falls back to the default.
    pub fn from_legacy(content: impl Into<String>) -> Self {
        Self::new(content, MARKUP_DEFAULT)
    }

    /// Build markup content from a wire value.
    ///
    /// Accepts a plain string (legacy form) or an object with `content` and an
    /// optional `markup`. `null` yields `None`.
    pub fn from_json(field: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Self::from_legacy(s.as_str()))),
            Value::Object(map) => {
                let content = match map.get(CONTENT_KEY) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => {
                        return Err(FieldsError::bad_value(
                            field,
                            "markup",
                            format!("content must be a string, got {other}"),
                        ))
                    }
                };
                let markup = match map.get(MARKUP_KEY) {
                    None | Some(Value::Null) => MARKUP_DEFAULT.to_string(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => {
                        return Err(FieldsError::bad_value(
                            field,
                            "markup",
                            format!("markup must be a string, got {other}"),
                        ))
                    }
                };
                Ok(Some(Self { content, markup }))
            }
            other => Err(FieldsError::bad_value(
                field,
                "markup",
                format!("expected a string or an object, got {other}"),
            )),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "content": self.content,
            "markup": self.markup,
        })
    }

    /// Render the content to HTML according to its markup.
    pub fn render_html(&self) -> String {
        render_markup_to_html(&self.content, &self.markup)
    }
}

/// Whether the markup identifier belongs to the supported set.
pub fn is_markup_supported(markup: &str) -> bool {
    SUPPORTED_MARKUPS.contains(&markup)
}

/// Render content to HTML.
///
/// Markdown goes through pulldown-cmark with embedded raw HTML turned into
/// text. Every other markup is HTML-escaped verbatim.
pub fn render_markup_to_html(content: &str, markup: &str) -> String {
    if markup != MARKUP_MARKDOWN {
        return html_escape::encode_safe(content).into_owned();
    }

    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let events = Parser::new_ext(content, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut rendered = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut rendered, events);
    rendered
}
