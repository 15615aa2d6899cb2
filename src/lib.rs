//! Glass-Chat — headless core for a glass-overlay AI chat client.
//!
//! The GUI shell (frameless window, input widgets, audio playback) sits on
//! top of this crate and drives [`GlassApp`]. The crate owns:
//! - Region capture: frame grabbing, aspect-fit selection mapping, crop
//!   pipeline (capture/)
//! - Conversation state and transitions (state.rs)
//! - The hosted-AI client: streaming chat, OCR, transcription, speech
//!   synthesis (api/)
//! - Versioned JSON persistence (storage.rs)

pub mod api;
pub mod app;
pub mod capture;
pub mod chat;
pub mod config;
pub mod state;
pub mod storage;

pub use app::{Collaborators, GlassApp};
pub use state::AppState;

/// Initialize env_logger with an `info` default. Safe to call more than
/// once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}

/// Wire a [`GlassApp`] against the hosted API and the real screen,
/// restoring any persisted conversation.
pub fn bootstrap(settings: config::Settings) -> GlassApp {
    let client = match &settings.base_url {
        Some(base) => api::GeminiClient::with_base_url(&settings.api_key, base),
        None => api::GeminiClient::new(&settings.api_key),
    };
    // GeminiClient clones share the underlying reqwest connection pool.
    let services = Collaborators {
        chat: Box::new(client.clone()),
        recognizer: Box::new(client.clone()),
        transcriber: Box::new(client.clone()),
        synthesizer: Box::new(client),
        capture: Box::new(capture::ScreenSource),
    };

    let mut app = GlassApp::new(services, Box::new(storage::FileStore::default_location()));
    app.state.config = settings.chat;
    app
}
