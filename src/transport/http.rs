use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use log::{ debug, error, info };
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::sse::{ SseDecoder, SseEvent };
use super::{ ChatTransport, FragmentStream, TransportError };
use crate::config::GenerationParams;
use crate::models::api::{
    BugReportRequest,
    ChatRequest,
    FeedbackRequest,
    HealthResponse,
    ModelInfo,
    SubmissionResponse,
};
use crate::models::chat::Message;

pub const USER_AGENT: &str = concat!("edubot/", env!("CARGO_PKG_VERSION"));

/// Talks to the tutoring backend over plain HTTP. No retries and no
/// request timeout: a stalled stream stays pending until the server
/// closes it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let http = HttpClient::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, TransportError> {
        let resp = self.http.get(self.url(route)).send().await?;
        check_status(&resp)?;
        Ok(resp.json::<T>().await?)
    }

    async fn post_json<B, T>(&self, route: &str, body: &B) -> Result<T, TransportError>
        where B: Serialize + Sync + ?Sized, T: DeserializeOwned
    {
        let resp = self.http.post(self.url(route)).json(body).send().await?;
        check_status(&resp)?;
        Ok(resp.json::<T>().await?)
    }
}

fn check_status(resp: &reqwest::Response) -> Result<(), TransportError> {
    let status = resp.status();
    if !status.is_success() {
        error!("HTTP error from {}: {}", resp.url(), status);
        return Err(TransportError::Status(status.as_u16()));
    }
    Ok(())
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParams
    ) -> Result<FragmentStream, TransportError> {
        let req = ChatRequest {
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        info!("Sending chat request with {} message(s)", messages.len());

        let resp = self.http.post(self.url("/chat")).json(&req).send().await?;
        check_status(&resp)?;

        let (tx, rx) = mpsc::channel(32);
        let mut body = resp.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut received = 0usize;

            while let Some(frame) = body.next().await {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        let _ = tx.send(Err(TransportError::Stream(e.to_string()))).await;
                        return;
                    }
                };
                received += frame.len();
                debug!("Received frame of {} bytes", frame.len());

                for event in decoder.feed(&frame) {
                    match event {
                        SseEvent::Content(content) => {
                            if tx.send(Ok(content)).await.is_err() {
                                return;
                            }
                        }
                        SseEvent::Done => {
                            return;
                        }
                    }
                }
            }

            if received == 0 {
                let _ = tx.send(Err(TransportError::MissingBody)).await;
                return;
            }
            for event in decoder.finish() {
                if let SseEvent::Content(content) = event {
                    let _ = tx.send(Ok(content)).await;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn health(&self) -> Result<HealthResponse, TransportError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        check_status(&resp)?;
        // Only the status matters; tolerate odd bodies.
        Ok(resp.json::<HealthResponse>().await.unwrap_or_default())
    }

    async fn model_info(&self) -> Result<ModelInfo, TransportError> {
        self.get_json("/model-info").await
    }

    async fn submit_feedback(&self, feedback: &str) -> Result<SubmissionResponse, TransportError> {
        let req = FeedbackRequest {
            feedback,
            user_agent: USER_AGENT,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.post_json("/submit-feedback", &req).await
    }

    async fn submit_bug_report(&self, report: &str) -> Result<SubmissionResponse, TransportError> {
        let req = BugReportRequest {
            bug_report: report,
            user_agent: USER_AGENT,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.post_json("/submit-bug-report", &req).await
    }
}
