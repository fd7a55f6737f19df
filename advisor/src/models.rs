use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// The full text of one successful analysis, fragments joined in arrival order.
pub type FinalText = String;

#[derive(Debug, Clone)]
pub struct Document {
    pub filename: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self {
            filename: None,
            mime_type: PDF_MIME_TYPE.to_string(),
            bytes,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let bytes = std::fs::read(path).map_err(|e| {
            AnalysisError::Validation(format!("cannot read {}: {}", path.display(), e))
        })?;
        let document = Self::pdf(bytes);

        Ok(match path.file_name() {
            Some(name) => document.with_filename(name.to_string_lossy()),
            None => document,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The user's intended major or career, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal(String);

impl Goal {
    pub fn new(raw: &str) -> Result<Self, AnalysisError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::Validation("goal must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 4096,
            temperature: 0.4,
            top_p: 0.9,
        }
    }
}

/// One multimodal call: the document, the rendered prompt and the sampling parameters.
#[derive(Debug)]
pub struct GenerationRequest<'a> {
    pub document: &'a Document,
    pub prompt: String,
    pub config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

impl From<GenerationConfig> for GeminiGenerationConfig {
    fn from(config: GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            top_p: config.top_p,
        }
    }
}

/// One `data:` payload of a `streamGenerateContent` SSE response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub prompt_feedback: Option<GeminiPromptFeedback>,
    pub error: Option<GeminiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: GeminiContent,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiError {
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_is_trimmed_and_must_not_be_blank() {
        assert_eq!(Goal::new("  의예과 ").unwrap().as_str(), "의예과");
        assert!(matches!(Goal::new(""), Err(AnalysisError::Validation(_))));
        assert!(matches!(Goal::new(" \n\t"), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn default_generation_parameters() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_output_tokens, 4096);
        assert_eq!(config.temperature, 0.4);
        assert_eq!(config.top_p, 0.9);
    }

    #[test]
    fn request_serializes_in_vertex_wire_format() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![
                    GeminiPart {
                        inline_data: Some(GeminiInlineData {
                            mime_type: PDF_MIME_TYPE.to_string(),
                            data: "JVBERg==".to_string(),
                        }),
                        ..Default::default()
                    },
                    GeminiPart {
                        text: Some("prompt".to_string()),
                        ..Default::default()
                    },
                ],
            }],
            generation_config: Some(GenerationConfig::default().into()),
        };

        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert!(parts[0].get("text").is_none());
        assert_eq!(parts[1]["text"], "prompt");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 4096);
        assert!(json["generationConfig"]["topP"].is_number());
    }
}
