mod http;
pub mod sse;

pub use http::HttpTransport;
pub use sse::{ SseDecoder, SseEvent };

use async_trait::async_trait;
use futures::{ Stream, StreamExt };
use std::pin::Pin;
use thiserror::Error;

use crate::config::GenerationParams;
use crate::models::api::{ HealthResponse, ModelInfo, SubmissionResponse };
use crate::models::chat::Message;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Response has no body")]
    MissingBody,

    #[error("Response stream ended without content")]
    EmptyResponse,

    #[error("Stream error: {0}")]
    Stream(String),
}

impl TransportError {
    pub fn is_empty_response(&self) -> bool {
        matches!(self, TransportError::EmptyResponse)
    }
}

/// Content fragments in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends one chat request and yields content fragments as they arrive.
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParams
    ) -> Result<FragmentStream, TransportError>;

    async fn health(&self) -> Result<HealthResponse, TransportError>;

    async fn model_info(&self) -> Result<ModelInfo, TransportError>;

    async fn submit_feedback(&self, feedback: &str) -> Result<SubmissionResponse, TransportError>;

    async fn submit_bug_report(&self, report: &str) -> Result<SubmissionResponse, TransportError>;
}

/// Drains a fragment stream into the full response text, calling
/// `on_update` with the accumulated text after every fragment.
pub async fn assemble<F>(mut fragments: FragmentStream, mut on_update: F) -> Result<String, TransportError>
    where F: FnMut(&str) + Send
{
    let mut text = String::new();
    while let Some(fragment) = fragments.next().await {
        text.push_str(&fragment?);
        on_update(&text);
    }
    if text.is_empty() {
        return Err(TransportError::EmptyResponse);
    }
    Ok(text)
}
