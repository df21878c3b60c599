//! Request and response shapes of the supported text-generation APIs.
//!
//! A [`RemoteDescriptor`] is resolved once when a side is configured and
//! carries everything provider-specific as data: the endpoint, how the
//! credential becomes headers, how a prompt becomes a body, and where
//! the generated text sits in the response envelope.

use crate::providers::Credential;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Supported API families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
    /// Google Gemini `generateContent`.
    #[strum(serialize = "gemini")]
    Gemini,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAiChat,
    /// Anthropic messages.
    #[strum(serialize = "anthropic")]
    Anthropic,
}

impl ApiFlavor {
    /// Infers the flavor from a model identifier.
    #[instrument]
    pub fn infer(model: &str) -> Option<Self> {
        let model = model.to_ascii_lowercase();
        if model.starts_with("gemini") {
            Some(Self::Gemini)
        } else if ["gpt", "o1", "o3", "o4", "chatgpt"]
            .iter()
            .any(|prefix| model.starts_with(prefix))
        {
            Some(Self::OpenAiChat)
        } else if model.starts_with("claude") {
            Some(Self::Anthropic)
        } else {
            None
        }
    }

    /// Default endpoint for `model`.
    pub fn default_endpoint(self, model: &str) -> String {
        match self {
            Self::Gemini => format!("{GEMINI_ENDPOINT}/{model}:generateContent"),
            Self::OpenAiChat => OPENAI_ENDPOINT.to_string(),
            Self::Anthropic => ANTHROPIC_ENDPOINT.to_string(),
        }
    }

    /// Request headers carrying `credential`.
    pub fn headers(self, credential: &Credential) -> Vec<(String, String)> {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        match self {
            Self::Gemini => {
                headers.push(("x-goog-api-key".to_string(), credential.expose().to_string()));
            }
            Self::OpenAiChat => headers.push((
                "authorization".to_string(),
                format!("Bearer {}", credential.expose()),
            )),
            Self::Anthropic => {
                headers.push(("x-api-key".to_string(), credential.expose().to_string()));
                headers.push((
                    "anthropic-version".to_string(),
                    ANTHROPIC_VERSION.to_string(),
                ));
            }
        }
        headers
    }

    /// JSON body asking `model` to continue `prompt`.
    pub fn request_body(self, model: &str, prompt: &str, params: &GenerationParams) -> Value {
        match self {
            Self::Gemini => json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": {
                    "maxOutputTokens": params.max_output_tokens,
                    "temperature": params.temperature,
                }
            }),
            Self::OpenAiChat => json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": params.max_output_tokens,
                "temperature": params.temperature,
            }),
            Self::Anthropic => json!({
                "model": model,
                "max_tokens": params.max_output_tokens,
                "temperature": params.temperature,
                "messages": [{ "role": "user", "content": prompt }],
            }),
        }
    }

    /// Generated text from a response envelope, if the shape matches.
    pub fn extract_text(self, envelope: &Value) -> Option<String> {
        let text = match self {
            Self::Gemini => &envelope["candidates"][0]["content"]["parts"][0]["text"],
            Self::OpenAiChat => &envelope["choices"][0]["message"]["content"],
            Self::Anthropic => &envelope["content"][0]["text"],
        };
        text.as_str().map(str::to_string)
    }
}

/// Where and how to reach one remote model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct RemoteDescriptor {
    /// API family.
    flavor: ApiFlavor,
    /// Endpoint URL.
    endpoint: String,
}

impl RemoteDescriptor {
    /// Descriptor with an explicit endpoint.
    pub fn new(flavor: ApiFlavor, endpoint: impl Into<String>) -> Self {
        Self {
            flavor,
            endpoint: endpoint.into(),
        }
    }

    /// Descriptor using the flavor's default endpoint for `model`.
    pub fn for_model(flavor: ApiFlavor, model: &str) -> Self {
        Self::new(flavor, flavor.default_endpoint(model))
    }
}

/// Generation knobs sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct GenerationParams {
    /// Response length cap.
    max_output_tokens: u32,
    /// Sampling temperature; low values make answers more deterministic.
    temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_output_tokens: 100,
            temperature: 0.2,
        }
    }
}

impl GenerationParams {
    /// Response length cap.
    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    /// Sampling temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Settings for the short credential probe.
    pub fn probe() -> Self {
        Self {
            max_output_tokens: 10,
            temperature: 0.0,
        }
    }
}
