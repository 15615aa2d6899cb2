//! Collaborator seams for the hosted intelligence services.
//!
//! The controller only knows these traits; [`gemini::GeminiClient`]
//! implements all four against one hosted API. Tests substitute canned
//! collaborators.

pub mod gemini;

pub use gemini::GeminiClient;

use crate::chat::streaming::FragmentStream;
use crate::chat::{ChatConfig, Message};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Request(e.to_string())
    }
}

/// Chat completion: history + outgoing message in, fragment stream out.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn stream_chat(
        &self,
        config: &ChatConfig,
        history: &[Message],
        outgoing: &Message,
    ) -> Result<FragmentStream, ApiError>;
}

/// OCR: encoded image in, extracted text out.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, png: &[u8]) -> Result<String, ApiError>;
}

/// Speech-to-text: encoded audio in, transcript out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String, ApiError>;
}

/// Text-to-speech: text in, encoded audio bytes out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ApiError>;
}
