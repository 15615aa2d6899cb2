//! Conversation model — messages, roles, chat configuration.
//!
//! All types here serialize with `#[serde(default)]` on optional fields so
//! documents written by older builds load cleanly (schema evolution by
//! defaulting, no migrations).

pub mod streaming;

use crate::capture::CroppedImage;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// An image carried inline with a message, base64-encoded as it travels on
/// the wire and into storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime: String,
    /// Base64 of the encoded image bytes.
    pub data: String,
}

impl InlineImage {
    pub fn from_png(bytes: &[u8]) -> Self {
        Self {
            mime: "image/png".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

impl From<&CroppedImage> for InlineImage {
    fn from(crop: &CroppedImage) -> Self {
        Self::from_png(&crop.png)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: Option<InlineImage>,
}

impl Message {
    pub fn user(id: u64, text: impl Into<String>, image: Option<InlineImage>) -> Self {
        Self { id, role: Role::User, text: text.into(), image }
    }

    pub fn assistant(id: u64) -> Self {
        Self { id, role: Role::Assistant, text: String::new(), image: None }
    }
}

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// What gets sent alongside every chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub system_instruction: String,
    /// Enabled tool names, passed through to the provider (e.g. "google_search").
    #[serde(default)]
    pub tools: Vec<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            system_instruction: String::new(),
            tools: Vec::new(),
        }
    }
}
