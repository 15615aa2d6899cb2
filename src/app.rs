//! Controller — wires state transitions to the collaborators.
//!
//! [`GlassApp`] is what the shell drives: one method per user-visible
//! operation. All failure handling follows the taxonomy in the error
//! design: permission denial reads as cancellation, service failures
//! become transient status lines, degenerate input is ignored.

use crate::api::{ApiError, ChatService, SpeechSynthesizer, TextRecognizer, Transcriber};
use crate::capture::{CaptureError, CaptureSource, ContainerGeometry, CropMode, SelectionRect};
use crate::chat::streaming::StreamEvent;
use crate::chat::Message;
use crate::state::{AppState, CropAction};
use crate::storage::{SavedSession, StateStore};
use std::time::Instant;

/// The external services the app talks to, behind their seams.
pub struct Collaborators {
    pub chat: Box<dyn ChatService>,
    pub recognizer: Box<dyn TextRecognizer>,
    pub transcriber: Box<dyn Transcriber>,
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    pub capture: Box<dyn CaptureSource>,
}

pub struct GlassApp {
    pub state: AppState,
    services: Collaborators,
    store: Box<dyn StateStore>,
}

impl GlassApp {
    /// Restore the persisted conversation and wire up the collaborators.
    pub fn new(services: Collaborators, store: Box<dyn StateStore>) -> Self {
        let state = AppState::from_persisted(store.load_state());
        Self { state, services, store }
    }

    // ── Region capture ──────────────────────────────────────────────

    /// Grab a frame and enter crop mode.
    ///
    /// No-op while a session is already active or when the user refuses
    /// screen access (treated as cancellation, not an error).
    pub fn start_capture(&mut self) {
        if self.state.crop_active() {
            return;
        }
        match self.services.capture.grab_frame() {
            Ok(frame) => {
                self.state.begin_crop(frame);
            }
            Err(CaptureError::PermissionDenied(msg)) => {
                log::info!("[APP] Screen access refused — treating as cancel: {}", msg);
            }
            Err(e) => {
                self.state
                    .set_transient_error(format!("Screen capture failed: {}", e), Instant::now());
            }
        }
    }

    /// Finalize the drag rectangle: attach the crop, or recognize it and
    /// append the extracted text to the pending input.
    pub async fn finalize_crop(
        &mut self,
        container: ContainerGeometry,
        selection: SelectionRect,
        mode: CropMode,
    ) {
        self.state.update_selection(selection);
        match self.state.finalize_crop(container, mode) {
            Ok(CropAction::Ignored) | Ok(CropAction::Attached) => {}
            Ok(CropAction::Recognize(crop)) => {
                match self.services.recognizer.recognize(&crop.png).await {
                    Ok(text) if !text.is_empty() => self.state.append_recognized(&text),
                    Ok(_) => log::info!("[APP] Recognition returned no text"),
                    Err(e) => self.state.set_transient_error(
                        format!("Text recognition failed: {}", e),
                        Instant::now(),
                    ),
                }
            }
            Err(e) => {
                self.state
                    .set_transient_error(format!("Crop failed: {}", e), Instant::now());
            }
        }
    }

    pub fn cancel_capture(&mut self) {
        self.state.cancel_crop();
    }

    // ── Chat ────────────────────────────────────────────────────────

    /// Send the drafted message and stream the reply into a new assistant
    /// message, fragment by fragment.
    ///
    /// Refused while offline (nothing is queued). A stream that dies
    /// mid-reply keeps whatever text already arrived.
    pub async fn send_message(&mut self) {
        if !self.state.can_send() {
            log::info!("[APP] Offline — send disabled");
            return;
        }
        let (text, image) = self.state.take_draft();
        if text.trim().is_empty() && image.is_none() {
            return;
        }
        self.state.push_user_message(text, image);

        let (history, outgoing) = {
            let msgs = self.state.messages();
            let split = msgs.len() - 1;
            (msgs[..split].to_vec(), msgs[split].clone())
        };

        match self
            .services
            .chat
            .stream_chat(&self.state.config, &history, &outgoing)
            .await
        {
            Ok(mut stream) => {
                let id = self.state.begin_assistant_message();
                while let Some(event) = stream.recv().await {
                    match event {
                        StreamEvent::Fragment(fragment) => {
                            self.state.append_fragment(id, &fragment);
                        }
                        StreamEvent::Done => break,
                        StreamEvent::Failed(e) => {
                            self.state.set_transient_error(
                                format!("Response interrupted: {}", e),
                                Instant::now(),
                            );
                            self.state.discard_if_empty(id);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                self.state
                    .set_transient_error(format!("Chat request failed: {}", e), Instant::now());
            }
        }

        self.persist();
    }

    // ── Voice ───────────────────────────────────────────────────────

    /// Transcribe recorded audio into the pending input buffer.
    pub async fn transcribe_audio(&mut self, audio: &[u8], mime: &str) {
        match self.services.transcriber.transcribe(audio, mime).await {
            Ok(text) if !text.is_empty() => self.state.append_transcript(&text),
            Ok(_) => {}
            Err(e) => {
                self.state
                    .set_transient_error(format!("Transcription failed: {}", e), Instant::now());
            }
        }
    }

    /// Synthesize speech for a message; the shell owns playback.
    pub async fn speak(&self, text: &str) -> Result<Vec<u8>, ApiError> {
        self.services.synthesizer.synthesize(text).await
    }

    // ── Persistence & sessions ──────────────────────────────────────

    fn persist(&self) {
        if let Err(e) = self.store.save_state(&self.state.to_persisted()) {
            log::error!("[APP] Failed to persist state: {}", e);
        }
    }

    /// Snapshot the current conversation into the saved-session list.
    pub fn save_session(&mut self, title: impl Into<String>) {
        let mut sessions = self.store.load_sessions();
        let id = sessions.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        sessions.push(SavedSession::new(id, title, self.state.messages().to_vec()));
        if let Err(e) = self.store.save_sessions(&sessions) {
            log::error!("[APP] Failed to save session: {}", e);
        }
    }

    pub fn sessions(&self) -> Vec<SavedSession> {
        self.store.load_sessions()
    }

    /// Replace the live conversation with a saved session's messages.
    pub fn load_session(&mut self, id: u64) -> bool {
        let Some(session) = self.sessions().into_iter().find(|s| s.id == id) else {
            return false;
        };
        let messages: Vec<Message> = session.messages;
        self.state.replace_messages(messages);
        self.persist();
        true
    }

    pub fn set_online(&mut self, online: bool) {
        self.state.set_online(online);
    }
}
