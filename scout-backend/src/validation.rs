//! Request validation helpers
//!
//! Handlers deserialize bodies into permissive structs (every field optional),
//! then check them here. Failures are collected per field and rendered as
//! `{"error": <first message>, "details": {<field>: {"_errors": [..]}}}`.

use actix_web::{error::InternalError, web, HttpResponse};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

pub const WEBSITE_REQUIRED: &str = "Website URL is required";
pub const INVALID_URL: &str = "Invalid URL format";
pub const URL_SCHEME: &str = "URL must start with http:// or https://";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Validation failures keyed by field, in the order they were found
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field.to_string(), vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
            .unwrap_or(&[])
    }

    /// First message of the first field in `priority` that failed, else of
    /// the first failing field
    pub fn headline(&self, priority: &[&str]) -> String {
        priority
            .iter()
            .find_map(|field| self.messages(field).first())
            .or_else(|| self.fields.first().and_then(|(_, m)| m.first()))
            .cloned()
            .unwrap_or_else(|| "Validation failed".to_string())
    }

    pub fn details(&self) -> Value {
        let mut details = Map::new();
        details.insert("_errors".to_string(), json!([]));
        for (field, messages) in &self.fields {
            details.insert(field.clone(), json!({ "_errors": messages }));
        }
        Value::Object(details)
    }

    /// `Ok(())` when nothing failed, else the 400 response
    pub fn into_result(self, priority: &[&str]) -> Result<(), HttpResponse> {
        if self.is_empty() {
            return Ok(());
        }
        Err(HttpResponse::BadRequest().json(json!({
            "error": self.headline(priority),
            "details": self.details(),
        })))
    }
}

/// A present, non-blank string; records `message` otherwise
pub fn required(errors: &mut FieldErrors, field: &str, value: Option<&str>, message: &str) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v.to_string()),
        _ => {
            errors.add(field, message);
            None
        }
    }
}

/// An optional string that must not be blank when present
pub fn non_blank_if_present(errors: &mut FieldErrors, field: &str, value: Option<&str>, message: &str) -> Option<String> {
    match value {
        Some(v) if v.trim().is_empty() => {
            errors.add(field, message);
            None
        }
        other => other.map(str::to_string),
    }
}

/// Every rule a website URL breaks, in check order
pub fn website_errors(value: &str) -> Vec<&'static str> {
    let mut messages = Vec::new();
    if value.is_empty() {
        messages.push(WEBSITE_REQUIRED);
    }
    if url::Url::parse(value).is_err() {
        messages.push(INVALID_URL);
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        messages.push(URL_SCHEME);
    }
    messages
}

/// A website that must be an absolute http(s) URL
pub fn website(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, WEBSITE_REQUIRED);
        return None;
    };
    let failures = website_errors(value);
    if failures.is_empty() {
        return Some(value.to_string());
    }
    for message in failures {
        errors.add(field, message);
    }
    None
}

/// Any absolute URL (scheme not restricted)
pub fn url(errors: &mut FieldErrors, field: &str, value: Option<&str>, message: &str) -> Option<String> {
    match value {
        Some(v) if url::Url::parse(v).is_ok() => Some(v.to_string()),
        _ => {
            errors.add(field, message);
            None
        }
    }
}

pub fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

pub fn uuid(errors: &mut FieldErrors, field: &str, value: Option<&str>, message: &str) -> Option<String> {
    match value {
        Some(v) if is_uuid(v) => Some(v.to_string()),
        _ => {
            errors.add(field, message);
            None
        }
    }
}

pub fn is_email(value: &str) -> bool {
    value.len() <= 64 && EMAIL_RE.is_match(value)
}

/// Parse a string into one of an enum's values
pub fn one_of<T: std::str::FromStr>(errors: &mut FieldErrors, field: &str, value: Option<&str>, allowed: &[&str]) -> Option<T> {
    match value.and_then(|v| v.parse::<T>().ok()) {
        Some(parsed) => Some(parsed),
        None => {
            let quoted: Vec<String> = allowed.iter().map(|a| format!("'{}'", a)).collect();
            errors.add(
                field,
                format!("Invalid enum value. Expected {}", quoted.join(" | ")),
            );
            None
        }
    }
}

/// JSON extractor config: malformed bodies become a 400 JSON error
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(json!({
            "error": "Invalid request body",
            "details": err.to_string(),
        }));
        InternalError::from_response(err, response).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_website_rules() {
        assert!(website_errors("https://acme.test").is_empty());
        assert!(website_errors("http://acme.test/path?q=1").is_empty());
        assert_eq!(website_errors("ftp://acme.test"), vec![URL_SCHEME]);
        assert_eq!(website_errors("acme.test"), vec![INVALID_URL, URL_SCHEME]);
        assert_eq!(website_errors("")[0], WEBSITE_REQUIRED);
    }

    #[test]
    fn test_headline_follows_priority() {
        let mut errors = FieldErrors::new();
        errors.add("name", "Name is required");
        errors.add("website", INVALID_URL);
        errors.add("website", URL_SCHEME);

        assert_eq!(errors.headline(&["website", "name"]), INVALID_URL);
        assert_eq!(errors.headline(&[]), "Name is required");

        let details = errors.details();
        assert_eq!(details["website"]["_errors"][1], URL_SCHEME);
        assert_eq!(details["_errors"], json!([]));
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result(&[]).is_ok());

        let mut errors = FieldErrors::new();
        errors.add("id", "Invalid account ID");
        let resp = errors.into_result(&["id"]).unwrap_err();
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_field_helpers() {
        let mut errors = FieldErrors::new();
        assert_eq!(required(&mut errors, "name", Some("Acme"), "Name is required").as_deref(), Some("Acme"));
        assert!(required(&mut errors, "name", Some("  "), "Name is required").is_none());
        assert!(non_blank_if_present(&mut errors, "title", None, "Title is required").is_none());
        assert!(uuid(&mut errors, "id", Some("not-a-uuid"), "Invalid agent ID").is_none());
        assert!(website(&mut errors, "website", None).is_none());

        assert_eq!(errors.messages("name"), &["Name is required".to_string()]);
        assert!(errors.messages("title").is_empty());
        assert_eq!(errors.messages("website"), &[WEBSITE_REQUIRED.to_string()]);
    }

    #[test]
    fn test_email_and_enum() {
        assert!(is_email("ada@example.com"));
        assert!(!is_email("ada@example"));
        assert!(!is_email("a b@example.com"));

        let mut errors = FieldErrors::new();
        let status: Option<crate::models::AgentRunStatus> =
            one_of(&mut errors, "status", Some("paused"), &["active", "completed", "failed"]);
        assert!(status.is_none());
        assert_eq!(
            errors.messages("status")[0],
            "Invalid enum value. Expected 'active' | 'completed' | 'failed'"
        );
    }
}
