//! Hosted generative-AI client (Gemini REST API) — streaming SSE.
//!
//! One client covers all four collaborator seams: chat streams through
//! `streamGenerateContent?alt=sse`; OCR, transcription, and speech
//! synthesis are single `generateContent` calls with the appropriate
//! inline parts and response modalities.

use super::{ApiError, ChatService, SpeechSynthesizer, TextRecognizer, Transcriber};
use crate::chat::streaming::{fragment_channel, FragmentStream, SseParser, StreamEvent};
use crate::chat::{ChatConfig, Message, Role, DEFAULT_MODEL};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for the utility calls (OCR, transcription) that don't go
/// through the user-selected chat model.
const UTILITY_MODEL: &str = DEFAULT_MODEL;

const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

const RECOGNIZE_PROMPT: &str = "Extract all text visible in this image. \
Return only the extracted text, preserving line breaks. \
If the image contains no text, return nothing.";

const TRANSCRIBE_PROMPT: &str = "Transcribe this audio clip verbatim. \
Return only the transcript, nothing else.";

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }

    /// Single non-streaming generateContent call; returns the parsed body.
    async fn generate(&self, model: &str, body: Value) -> Result<Value, ApiError> {
        let start = std::time::Instant::now();
        let resp = self
            .http
            .post(self.url(model, "generateContent"))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::error!("[API] {} returned {}: {}", model, status, body);
            return Err(ApiError::Status { status: status.as_u16(), body });
        }

        let parsed = resp.json::<Value>().await?;
        log::info!("[API] {} latency: {}ms", model, start.elapsed().as_millis());
        Ok(parsed)
    }
}

/// Build the `contents` array from history plus the outgoing message.
fn build_contents(history: &[Message], outgoing: &Message) -> Vec<Value> {
    history
        .iter()
        .chain(std::iter::once(outgoing))
        .map(message_content)
        .collect()
}

fn message_content(msg: &Message) -> Value {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "model",
    };

    let mut parts = Vec::new();
    if !msg.text.is_empty() {
        parts.push(json!({ "text": msg.text }));
    }
    if let Some(image) = &msg.image {
        parts.push(json!({
            "inlineData": { "mimeType": image.mime, "data": image.data }
        }));
    }

    json!({ "role": role, "parts": parts })
}

fn build_chat_body(config: &ChatConfig, history: &[Message], outgoing: &Message) -> Value {
    let mut body = json!({
        "contents": build_contents(history, outgoing),
        "generationConfig": { "temperature": config.temperature },
    });

    if !config.system_instruction.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": config.system_instruction }] });
    }
    if !config.tools.is_empty() {
        // Each enabled tool becomes `{"<name>": {}}`, the provider's shape.
        let tools: Vec<Value> = config
            .tools
            .iter()
            .map(|name| {
                let mut tool = serde_json::Map::new();
                tool.insert(name.clone(), json!({}));
                Value::Object(tool)
            })
            .collect();
        body["tools"] = Value::Array(tools);
    }

    body
}

/// Join the text parts of the first candidate, if any text arrived.
fn first_text(body: &Value) -> Option<String> {
    let parts = body["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract the text delta from one streamed SSE data payload.
fn extract_fragment(data: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(data).ok()?;
    first_text(&parsed)
}

#[async_trait]
impl ChatService for GeminiClient {
    async fn stream_chat(
        &self,
        config: &ChatConfig,
        history: &[Message],
        outgoing: &Message,
    ) -> Result<FragmentStream, ApiError> {
        let body = build_chat_body(config, history, outgoing);
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, config.model, self.api_key
        );

        log::info!("[API] Streaming chat, model={}", config.model);
        let start = std::time::Instant::now();

        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::error!("[API] Chat returned {}: {}", status, body);
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        log::info!("[API] TTFB: {}ms", start.elapsed().as_millis());

        let (tx, rx) = fragment_channel();
        tokio::spawn(async move {
            let mut resp = resp;
            let mut parser = SseParser::new();
            let mut ttft_logged = false;

            loop {
                match resp.chunk().await {
                    Ok(Some(chunk)) => {
                        for event in parser.push(&chunk) {
                            let Some(fragment) = extract_fragment(&event.data) else {
                                continue;
                            };
                            if !ttft_logged {
                                log::info!("[API] TTFT: {}ms", start.elapsed().as_millis());
                                ttft_logged = true;
                            }
                            // Receiver gone means the subscriber left the
                            // conversation; stop consuming.
                            if tx.send(StreamEvent::Fragment(fragment)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(None) => {
                        log::info!("[API] Stream complete: {}ms", start.elapsed().as_millis());
                        let _ = tx.send(StreamEvent::Done).await;
                        return;
                    }
                    Err(e) => {
                        log::error!("[API] Stream error: {}", e);
                        let _ = tx.send(StreamEvent::Failed(e.to_string())).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[async_trait]
impl TextRecognizer for GeminiClient {
    async fn recognize(&self, png: &[u8]) -> Result<String, ApiError> {
        let data = base64::engine::general_purpose::STANDARD.encode(png);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": RECOGNIZE_PROMPT },
                    { "inlineData": { "mimeType": "image/png", "data": data } },
                ],
            }],
            "generationConfig": { "temperature": 0.0 },
        });

        let resp = self.generate(UTILITY_MODEL, body).await?;
        let text = first_text(&resp).unwrap_or_default();
        log::info!("[OCR] Recognized {} chars", text.len());
        Ok(text.trim_end().to_string())
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String, ApiError> {
        let data = base64::engine::general_purpose::STANDARD.encode(audio);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": TRANSCRIBE_PROMPT },
                    { "inlineData": { "mimeType": mime, "data": data } },
                ],
            }],
            "generationConfig": { "temperature": 0.0 },
        });

        let resp = self.generate(UTILITY_MODEL, body).await?;
        let text = first_text(&resp).unwrap_or_default();
        log::info!("[API] Transcribed {} chars", text.len());
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ApiError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": text }] }],
            "generationConfig": { "responseModalities": ["AUDIO"] },
        });

        let resp = self.generate(TTS_MODEL, body).await?;
        let data = resp["candidates"][0]["content"]["parts"][0]["inlineData"]["data"]
            .as_str()
            .ok_or_else(|| ApiError::Malformed("no audio part in TTS response".into()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| ApiError::Malformed(format!("bad audio base64: {}", e)))?;
        log::info!("[API] Synthesized {} audio bytes", bytes.len());
        Ok(bytes)
    }
}
