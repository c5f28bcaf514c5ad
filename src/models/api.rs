use serde::{ Serialize, Deserialize };

use super::chat::Message;

/// Body of `POST /chat`.
#[derive(Serialize, Debug)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    pub temperature: f64,
    pub max_tokens: u32,
}

/// One `data:` record of the `/chat` event stream.
#[derive(Deserialize, Debug, Default)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
}

#[derive(Deserialize, Debug, Default)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamChunk {
    /// `choices[0].delta.content`, if present.
    pub fn content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
    }
}

#[derive(Serialize, Debug)]
pub struct FeedbackRequest<'a> {
    pub feedback: &'a str,
    pub user_agent: &'a str,
    pub timestamp: String,
}

#[derive(Serialize, Debug)]
pub struct BugReportRequest<'a> {
    pub bug_report: &'a str,
    pub user_agent: &'a str,
    pub timestamp: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub primary_model: Option<String>,
    #[serde(default)]
    pub fallback_model: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub backend: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ModelInfo {
    #[serde(default)]
    pub primary_model: Option<String>,
    #[serde(default)]
    pub fallback_model: Option<String>,
    #[serde(default)]
    pub context_window: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub fallback_enabled: Option<bool>,
}
