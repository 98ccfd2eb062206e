//! System prompts and prompt builders

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CompanyInfoFields, SearchMode};

static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON object regex"));

const WEB_SEARCH_PROMPT: &str = "You are a sales research assistant. Answer questions about \
companies and their markets concisely. When you cite web pages, list them at the end of your \
answer in a ```sources code block containing a JSON array of {\"url\", \"title\"} objects.";

const DEEP_RESEARCH_PROMPT: &str = "You are a sales research analyst performing deep research. \
Break the question into sub-questions, reason through each, and finish with a structured report \
covering the company, its products, its market and notable recent events. List every page you \
relied on at the end in a ```sources code block containing a JSON array of {\"url\", \"title\"} objects.";

/// System prompt for a chat in the given search mode
pub fn system_prompt(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::WebSearch => WEB_SEARCH_PROMPT,
        SearchMode::DeepResearch => DEEP_RESEARCH_PROMPT,
    }
}

/// Ask the model to summarize the company behind a website as JSON
pub fn company_info_prompt(website: &str) -> String {
    format!(
        r#"I need information about a company based on their website URL: {website}

Please analyze this website and provide the following information:
1. Company name (if you can determine it)
2. A brief description of what the company does (2-3 sentences)
3. The industry or sector the company operates in
4. Key products or services they offer
5. Any notable features or unique selling points

If you cannot access the website directly, please make educated guesses based on the URL structure, domain name, and any other information you can infer. Format your response as JSON with the following structure:
{{
  "name": "Company Name",
  "description": "Brief description of the company",
  "industry": "Industry/sector",
  "products": "Key products/services",
  "uniqueFeatures": "Notable features or USPs"
}}"#
    )
}

/// Parse the model's reply, tolerating prose around the JSON object
pub fn parse_company_info(reply: &str) -> Option<CompanyInfoFields> {
    let json = JSON_OBJECT
        .find(reply)
        .map(|m| m.as_str())
        .unwrap_or(reply);
    serde_json::from_str(json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_by_mode() {
        assert!(system_prompt(SearchMode::DeepResearch).contains("deep research"));
        assert_ne!(
            system_prompt(SearchMode::WebSearch),
            system_prompt(SearchMode::DeepResearch)
        );
    }

    #[test]
    fn test_company_info_prompt_mentions_site() {
        let prompt = company_info_prompt("https://acme.test");
        assert!(prompt.contains("https://acme.test"));
        assert!(prompt.contains("\"uniqueFeatures\""));
    }

    #[test]
    fn test_parse_company_info() {
        let reply = "Sure! Here it is:\n{\"name\": \"Acme\", \"description\": \"Rockets\", \"industry\": \"Aerospace\", \"products\": \"\", \"uniqueFeatures\": \"Fast\"}\nHope that helps.";
        let fields = parse_company_info(reply).unwrap();
        assert_eq!(fields.name, "Acme");
        assert_eq!(fields.unique_features, "Fast");
        assert_eq!(fields.products, "");

        // Any missing field rejects the whole reply
        assert!(parse_company_info("{\"name\": \"Acme\", \"industry\": \"Aerospace\"}").is_none());
        assert!(parse_company_info("{\"error\": \"I cannot access that site\"}").is_none());

        assert!(parse_company_info("I could not find anything").is_none());
        assert!(parse_company_info("{not json}").is_none());
    }
}
