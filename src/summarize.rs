#![cfg(feature = "web")]
//! AI summary proxy
//!
//! Forwards a bounded sample of rows, embedded in a fixed prompt, to the
//! generative language API and relays the generated text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

/// Callers send at most this many rows
pub const SAMPLE_LIMIT: usize = 50;

/// Model used for every summary
pub const MODEL: &str = "gemini-2.5-flash";

const TEMPERATURE: f32 = 0.6;
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 64;

const PROMPT_HEADER: &str = r#"
You are a friendly and insightful data analyst co-pilot. Your task is to analyze a dataset from an Excel file and provide a concise, insightful summary as if you are talking to a colleague.

- Start with a friendly greeting, like "Hello! I've taken a look at your data, and here's what I've found:".
- Analyze the following JSON data sample.
- The keys of the JSON objects are the column headers.
- Format your response in clear, easy-to-read markdown. Use headings, bullet points, and bold text to structure your insights.
- Do not just describe the data; interpret it. What could this data imply? What are the key takeaways?
- Keep the summary friendly, concise, and focused on actionable insights.
- End with an encouraging closing, like "I hope this helps your analysis! Let me know if you need to dig deeper into anything else."

Here is the data sample:
```json
"#;

const PROMPT_FOOTER: &str = "\n```\n";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("AI service is not available. API key is missing.")]
    Unavailable,

    #[error("Data sample is required for analysis.")]
    MissingSample,

    #[error("failed to encode data sample: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request to AI service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI service responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI service returned no text")]
    EmptyResponse,
}

/// Pull the row sample out of a `{ "data": [...] }` request body
///
/// The sample is not truncated here; bounding it is the caller's job.
pub fn sample_from_body(body: &[u8]) -> Result<Vec<Value>, SummarizeError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|_| SummarizeError::MissingSample)?;

    match payload {
        Value::Object(mut fields) => match fields.remove("data") {
            Some(Value::Array(rows)) if !rows.is_empty() => Ok(rows),
            _ => Err(SummarizeError::MissingSample),
        },
        _ => Err(SummarizeError::MissingSample),
    }
}

/// Embed the sample in the fixed analyst prompt
pub fn build_prompt(sample: &[Value]) -> Result<String, SummarizeError> {
    let json = serde_json::to_string_pretty(sample)?;
    Ok(format!("{}{}{}", PROMPT_HEADER, json, PROMPT_FOOTER))
}

/// The AI service as seen by request handlers
///
/// Built once at start-up. A missing credential is its own variant so every
/// request can be refused before any network traffic.
pub enum Summarizer {
    Unavailable,
    Available(GeminiClient),
}

impl Summarizer {
    pub fn from_config(config: &Config) -> Self {
        match &config.api_key {
            Some(key) => Summarizer::Available(GeminiClient::new(key, &config.ai_base_url)),
            None => {
                log::warn!("API_KEY environment variable not set. AI features will be disabled.");
                Summarizer::Unavailable
            }
        }
    }

    pub fn client(&self) -> Result<&GeminiClient, SummarizeError> {
        match self {
            Summarizer::Available(client) => Ok(client),
            Summarizer::Unavailable => Err(SummarizeError::Unavailable),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Client for the `generateContent` endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                MODEL
            ),
        }
    }

    /// Ask the model for a summary of `sample`
    ///
    /// Makes exactly one request. Any failure is returned as is; there is no retry.
    pub async fn summarize(&self, sample: &[Value]) -> Result<String, SummarizeError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(sample)?),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.into_text().ok_or(SummarizeError::EmptyResponse)
    }
}
