//! Display rendering for stored chat messages
//!
//! Message content is either a plain string, possibly carrying fenced
//! `search-results` / `sources` blocks, or an array of typed parts (text,
//! tool calls and tool results). Rendering is best effort: anything that
//! doesn't parse is skipped or shown as-is, never an error.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ChatMessage;

static SOURCES_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```sources\n(.*?)\n```").expect("valid sources regex"));
static SOURCES_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<sources>(.*?)</sources>").expect("valid sources tag regex"));
static SEARCH_RESULTS_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```search-results\n(.*?)\n```").expect("valid search results regex")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

/// A message ready for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage {
    pub id: String,
    pub chat_id: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub search_results: Vec<SearchResult>,
    pub sources: Vec<Source>,
    pub show_references: bool,
}

/// Keep the array elements that deserialize as `T`
fn parse_items<T: for<'de> Deserialize<'de>>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

/// Parse a captured block as a JSON array; `None` if it isn't one
fn parse_block<T: for<'de> Deserialize<'de>>(block: &str) -> Option<Vec<T>> {
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Array(items)) => Some(parse_items(&items)),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Unparseable embedded block: {}", e);
            None
        }
    }
}

/// Sources from a ```` ```sources ```` fence, else from `<sources>` tags
pub fn extract_sources(text: &str) -> Vec<Source> {
    [&*SOURCES_FENCE, &*SOURCES_TAG]
        .iter()
        .filter_map(|re| re.captures(text))
        .find_map(|caps| parse_block(&caps[1]))
        .unwrap_or_default()
}

/// Search results from a ```` ```search-results ```` fence. `None` when
/// there is no fence or the fence is empty.
pub fn extract_search_results(text: &str) -> Option<Vec<SearchResult>> {
    let caps = SEARCH_RESULTS_FENCE.captures(text)?;
    if caps[1].is_empty() {
        return None;
    }
    Some(parse_block(&caps[1]).unwrap_or_default())
}

/// Strip every embedded results/sources block and trim
pub fn clean_content(text: &str) -> String {
    let text = SEARCH_RESULTS_FENCE.replace_all(text, "");
    let text = SOURCES_FENCE.replace_all(&text, "");
    let text = SOURCES_TAG.replace_all(&text, "");
    text.trim().to_string()
}

/// Display form of an argument value; strings unquoted, missing as empty
fn arg_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| arg_text(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Display line for a `tool-call` part; empty for anything else
pub fn format_tool_call(part: &Value) -> String {
    if part.get("type").and_then(Value::as_str) != Some("tool-call") {
        return String::new();
    }
    let tool_name = part.get("toolName").and_then(Value::as_str).unwrap_or_default();
    let args = part.get("args");
    let arg = |name: &str| arg_text(args.and_then(|a| a.get(name)));

    match tool_name {
        "search" => format!("🔍 **Searching for:** \"{}\"", arg("query")),
        "extract" => format!(
            "📄 **Extracting data from:** {}\n\n**Extraction prompt:** {}",
            arg("urls"),
            arg("prompt")
        ),
        "scrape" => format!(
            "🌐 **Scraping website:** {}\n\n**Scrape prompt:** {}",
            arg("url"),
            arg("prompt")
        ),
        "deepResearch" => format!("🔬 **Performing deep research on:** \"{}\"", arg("query")),
        _ => format!(
            "🛠️ **Using tool:** {}\n\n**Arguments:** ```json\n{}\n```",
            tool_name,
            pretty(args.unwrap_or(&Value::Null))
        ),
    }
}

#[derive(Debug, Default)]
struct RenderedContent {
    text: String,
    search_results: Vec<SearchResult>,
    sources: Vec<Source>,
    show_references: bool,
}

/// Append a section, separated by a blank line from earlier text
fn push_section(text: &mut String, section: &str) {
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(section);
}

fn render_text(text: &str) -> RenderedContent {
    let search_results = extract_search_results(text);
    let sources = extract_sources(text);
    RenderedContent {
        text: text.to_string(),
        show_references: search_results.is_some() || !sources.is_empty(),
        search_results: search_results.unwrap_or_default(),
        sources,
    }
}

fn render_parts(parts: &[Value]) -> RenderedContent {
    let mut rendered = RenderedContent::default();

    for part in parts {
        let part_type = part.get("type").and_then(Value::as_str).unwrap_or_default();
        let tool_name = part.get("toolName").and_then(Value::as_str).unwrap_or_default();
        let result = part.get("result");
        let succeeded = result
            .and_then(|r| r.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        match part_type {
            "text" => {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    rendered.text.push_str(text);
                }
            }
            "tool-call" => {
                let line = format_tool_call(part);
                if !line.is_empty() {
                    push_section(&mut rendered.text, &line);
                }
            }
            "tool-result" if !succeeded => {
                let error = result
                    .and_then(|r| r.get("error"))
                    .and_then(Value::as_str)
                    .filter(|e| !e.is_empty())
                    .unwrap_or("Unknown error");
                push_section(
                    &mut rendered.text,
                    &format!("❌ **Tool Error ({}):** {}", tool_name, error),
                );
            }
            "tool-result" if tool_name == "search" => {
                let results = result
                    .and_then(|r| r.get("data"))
                    .and_then(Value::as_array)
                    .map(|items| parse_items::<SearchResult>(items))
                    .unwrap_or_default();
                if !results.is_empty() {
                    rendered.show_references = true;
                    rendered
                        .sources
                        .extend(results.iter().enumerate().map(|(index, r)| Source {
                            url: r.url.clone(),
                            title: r.title.clone(),
                            relevance: Some(1.0 - index as f64 * 0.1),
                        }));
                    push_section(
                        &mut rendered.text,
                        &format!("📊 **Found {} search results**", results.len()),
                    );
                }
                rendered.search_results = results;
            }
            "tool-result" if tool_name == "extract" => {
                if let Some(data) = result.and_then(|r| r.get("data")).filter(|d| !d.is_null()) {
                    push_section(
                        &mut rendered.text,
                        &format!("📋 **Extracted Data:**\n```json\n{}\n```\n", pretty(data)),
                    );
                }
            }
            _ => {}
        }
    }

    rendered
}

/// Render one stored message for display
pub fn render_message(message: &ChatMessage) -> RenderedMessage {
    let rendered = match &message.content {
        Value::String(text) => render_text(text),
        Value::Array(parts) => render_parts(parts),
        other => RenderedContent {
            text: pretty(other),
            ..Default::default()
        },
    };

    RenderedMessage {
        id: message.id.clone(),
        chat_id: message.chat_id.clone(),
        role: message.role.clone(),
        created_at: message.created_at,
        content: clean_content(&rendered.text),
        search_results: rendered.search_results,
        sources: rendered.sources,
        show_references: rendered.show_references,
    }
}
