use std::env;
use std::str::FromStr;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
/// Sessions last between one hour and one year
pub const SESSION_TTL_RANGE: std::ops::RangeInclusive<i64> = 1..=24 * 365;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Lifetime of a login session in hours
    pub session_ttl_hours: i64,
    pub openai_api_key: Option<String>,
    pub openai_endpoint: String,
    pub ai_max_tokens: u32,
    /// Directory of a built frontend to serve at `/`, if any
    pub frontend_dist: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "./.db/scout.db".to_string(),
            session_ttl_hours: 24 * 30,
            openai_api_key: None,
            openai_endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            ai_max_tokens: 4096,
            frontend_dist: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parse_var("PORT", defaults.port, |_| true),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", defaults.session_ttl_hours, |hours: &i64| {
                SESSION_TTL_RANGE.contains(hours)
            }),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_endpoint: non_empty_var("OPENAI_ENDPOINT").unwrap_or(defaults.openai_endpoint),
            ai_max_tokens: parse_var("AI_MAX_TOKENS", defaults.ai_max_tokens, |tokens: &u32| *tokens > 0),
            frontend_dist: non_empty_var("FRONTEND_DIST"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T, valid: impl Fn(&T) -> bool) -> T {
    parse_value(name, env::var(name).ok().as_deref(), default, valid)
}

/// Parse a raw setting, falling back to `default` when it is absent,
/// malformed or rejected by `valid`
fn parse_value<T: FromStr + Copy + std::fmt::Display>(
    name: &str,
    raw: Option<&str>,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            log::warn!("{} has invalid value {:?}, using {}", name, raw, default);
            default
        }
    }
}
