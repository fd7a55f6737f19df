use crate::auth::{ServiceAccountAuth, TokenSource};
use crate::backend::{FragmentStream, GenerationBackend};
use crate::config::AdvisorConfig;
use crate::error::AnalysisError;
use crate::models::*;
use crate::sse::SseDecoder;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Response};
use std::collections::VecDeque;
use std::time::Duration;

/// Finish reasons that mean the model stopped because content was refused.
const BLOCKING_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

pub struct VertexService {
    client: Client,
    auth: TokenSource,
    endpoint: String,
    timeout: Duration,
}

impl VertexService {
    pub fn new(config: &AdvisorConfig) -> Result<Self, AnalysisError> {
        let client = http_client(config.timeout)?;

        log::info!(
            "Vertex AI backend: project {}, location {}, model {}",
            config.project_id,
            config.location,
            config.model
        );

        Ok(Self {
            auth: TokenSource::ServiceAccount(ServiceAccountAuth::new(
                client.clone(),
                config.credential.clone(),
            )),
            client,
            endpoint: config.stream_endpoint(),
            timeout: config.timeout,
        })
    }

    /// Talks to an explicit `streamGenerateContent` URL with a ready-made token.
    pub fn with_token(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            client: http_client(timeout)?,
            auth: TokenSource::Static(token.into()),
            endpoint: endpoint.into(),
            timeout,
        })
    }
}

fn http_client(timeout: Duration) -> Result<Client, AnalysisError> {
    Client::builder()
        .connect_timeout(timeout)
        .build()
        .map_err(|e| AnalysisError::Configuration(format!("cannot build HTTP client: {}", e)))
}

#[async_trait]
impl GenerationBackend for VertexService {
    async fn stream_generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Box<dyn FragmentStream>, AnalysisError> {
        let token = self.auth.access_token(self.timeout).await?;
        let body = build_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::from_transport(e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Backend(format!(
                "Vertex AI error ({}): {}",
                status, error_text
            )));
        }

        Ok(Box::new(VertexFragmentStream {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
            timeout: self.timeout,
        }))
    }
}

/// Builds the wire request: the document as inline data, then the prompt.
pub fn build_request(request: &GenerationRequest<'_>) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![
                GeminiPart {
                    inline_data: Some(GeminiInlineData {
                        mime_type: request.document.mime_type.clone(),
                        data: STANDARD.encode(&request.document.bytes),
                    }),
                    ..Default::default()
                },
                GeminiPart {
                    text: Some(request.prompt.clone()),
                    ..Default::default()
                },
            ],
        }],
        generation_config: Some(request.config.into()),
    }
}

/// Interprets one SSE payload. `Ok(None)` means the payload carried no text.
pub fn fragment_from_payload(payload: &str) -> Result<Option<String>, AnalysisError> {
    let response: GeminiResponse = serde_json::from_str(payload)
        .map_err(|e| AnalysisError::Backend(format!("malformed response chunk: {}", e)))?;

    if let Some(error) = response.error {
        return Err(AnalysisError::Backend(format!(
            "{} ({})",
            error.message,
            error
                .status
                .or_else(|| error.code.map(|c| c.to_string()))
                .unwrap_or_else(|| "unknown".to_string())
        )));
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AnalysisError::Backend(format!("request was blocked: {}", reason)));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(None);
    };

    let text: String = candidate
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason {
            if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) {
                return Err(AnalysisError::Backend(format!("generation stopped: {}", reason)));
            }
        }
        return Ok(None);
    }

    Ok(Some(text))
}

struct VertexFragmentStream {
    response: Response,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
    timeout: Duration,
}

#[async_trait]
impl FragmentStream for VertexFragmentStream {
    async fn next_fragment(&mut self) -> Result<Option<String>, AnalysisError> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                match fragment_from_payload(&payload)? {
                    Some(text) => return Ok(Some(text)),
                    None => continue,
                }
            }

            if self.finished {
                return Ok(None);
            }

            let chunk = self
                .response
                .chunk()
                .await
                .map_err(|e| AnalysisError::from_transport(e, self.timeout))?;

            match chunk {
                Some(bytes) => self.pending.extend(self.decoder.push(&bytes)),
                None => {
                    self.finished = true;
                    self.pending.extend(self.decoder.finish());
                }
            }
        }
    }
}
