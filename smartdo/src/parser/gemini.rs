//! [`TaskParser`] backed by the Gemini `generateContent` API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use smartdo_proto::incoming::{ParseOutcome, TaskContext};

use super::{ParseError, TaskParser, build_prompt, response_schema};
use crate::config::ParserConfig;

/// Calls Gemini with a JSON response schema and validates the answer.
#[derive(Debug, Clone)]
pub struct GeminiParser {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    subtask_depth: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl GeminiParser {
    /// Creates a parser from resolved settings.
    ///
    /// A missing API key is not an error here; [`TaskParser::parse`] reports
    /// it on use so the rest of the app keeps working.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ParserConfig) -> Result<Self, ParseError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            subtask_depth: config.subtask_depth,
        })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl TaskParser for GeminiParser {
    async fn parse(
        &self,
        instructions: &str,
        current: &[TaskContext],
        now: DateTime<Utc>,
    ) -> Result<ParseOutcome, ParseError> {
        let api_key = self.api_key.as_deref().ok_or(ParseError::MissingApiKey)?;
        let prompt = build_prompt(instructions, current, now)?;
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(self.subtask_depth),
            }
        });

        tracing::debug!(model = %self.model, context = current.len(), "sending parse request");
        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "parse request rejected");
            return Err(ParseError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp
            .json::<GenerateResponse>()
            .await?
            .into_text()
            .ok_or(ParseError::EmptyResponse)?;
        let outcome = ParseOutcome::from_model_text(&text)?;
        tracing::info!(
            tasks = outcome.tasks.len(),
            rejected = outcome.rejected.len(),
            "parsed instructions"
        );
        Ok(outcome)
    }
}
