//! Catalog of selectable models and the cookie-backed selection

use serde::Serialize;

/// Cookie holding the selected chat model id
pub const MODEL_COOKIE: &str = "model-id";
/// Cookie holding the selected reasoning model id
pub const REASONING_MODEL_COOKIE: &str = "reasoning-model-id";

pub const DEFAULT_MODEL_NAME: &str = "gpt-4o";
pub const DEFAULT_REASONING_MODEL_NAME: &str = "o3-mini";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub api_identifier: &'static str,
    pub description: &'static str,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4o",
        label: "GPT 4o",
        api_identifier: "gpt-4o",
        description: "For complex, multi-step tasks",
    },
    ModelInfo {
        id: "gpt-4o-mini",
        label: "GPT 4o mini",
        api_identifier: "gpt-4o-mini",
        description: "Small model for fast, lightweight tasks",
    },
];

pub const REASONING_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "o1",
        label: "o1",
        api_identifier: "o1",
        description: "Uses advanced reasoning",
    },
    ModelInfo {
        id: "o1-mini",
        label: "o1 mini",
        api_identifier: "o1-mini",
        description: "Faster, cheaper reasoning",
    },
    ModelInfo {
        id: "o3-mini",
        label: "o3 mini",
        api_identifier: "o3-mini",
        description: "Fast reasoning for structured research",
    },
];

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

pub fn find_reasoning_model(id: &str) -> Option<&'static ModelInfo> {
    REASONING_MODELS.iter().find(|m| m.id == id)
}

/// First known chat model among the candidates, else the default
pub fn resolve_model<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> &'static ModelInfo {
    candidates
        .into_iter()
        .flatten()
        .find_map(find_model)
        .or_else(|| find_model(DEFAULT_MODEL_NAME))
        .unwrap_or(&MODELS[0])
}

/// First known reasoning model among the candidates, else the default
pub fn resolve_reasoning_model<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> &'static ModelInfo {
    candidates
        .into_iter()
        .flatten()
        .find_map(find_reasoning_model)
        .or_else(|| find_reasoning_model(DEFAULT_REASONING_MODEL_NAME))
        .unwrap_or(&REASONING_MODELS[0])
}
