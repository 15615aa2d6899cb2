//! Application state and its transition functions.
//!
//! One [`AppState`] owns everything the overlay displays: the message list,
//! the pending input buffer, the staged image attachment, the crop session,
//! the online flag, and the transient status line. Nothing mutates it
//! except the transitions defined here, so every UI-visible change has one
//! code path.

use crate::capture::{
    crop_selection, CapturedFrame, ContainerGeometry, CropError, CropMode, CroppedImage,
    SelectionRect,
};
use crate::chat::{ChatConfig, InlineImage, Message, Role};
use crate::storage::PersistedState;
use std::time::{Duration, Instant};

/// How long a transient status message stays visible.
pub const STATUS_TTL: Duration = Duration::from_secs(5);

/// A dismissible, auto-expiring status line (service failures land here).
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    expires_at: Instant,
}

/// One in-progress region capture. At most one exists at a time.
#[derive(Debug)]
pub struct CropSession {
    pub frame: CapturedFrame,
    pub selection: Option<SelectionRect>,
}

/// Outcome of finalizing a crop.
#[derive(Debug)]
pub enum CropAction {
    /// Degenerate selection or no active session; nothing happened and the
    /// session (if any) is still live.
    Ignored,
    /// The crop is now staged as the next outgoing attachment.
    Attached,
    /// The crop should be dispatched to text recognition.
    Recognize(CroppedImage),
}

pub struct AppState {
    pub config: ChatConfig,
    messages: Vec<Message>,
    input: String,
    pending_attachment: Option<CroppedImage>,
    crop: Option<CropSession>,
    status: Option<StatusMessage>,
    online: bool,
    next_id: u64,
}

impl AppState {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            messages: Vec::new(),
            input: String::new(),
            pending_attachment: None,
            crop: None,
            status: None,
            online: true,
            next_id: 1,
        }
    }

    /// Rebuild state from a persisted document, continuing the id sequence
    /// past the highest stored message id.
    pub fn from_persisted(doc: PersistedState) -> Self {
        let next_id = doc.messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        Self {
            config: doc.config,
            messages: doc.messages,
            next_id,
            ..Self::new(ChatConfig::default())
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            messages: self.messages.clone(),
            config: self.config.clone(),
        }
    }

    // ── Messages & streaming ────────────────────────────────────────

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.next_id = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        self.messages = messages;
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_user_message(
        &mut self,
        text: impl Into<String>,
        image: Option<InlineImage>,
    ) -> u64 {
        let id = self.allocate_id();
        self.messages.push(Message::user(id, text, image));
        id
    }

    /// Open an empty assistant message that the stream will fill.
    pub fn begin_assistant_message(&mut self) -> u64 {
        let id = self.allocate_id();
        self.messages.push(Message::assistant(id));
        id
    }

    /// Append one streamed fragment, in arrival order. The message text is
    /// observable immediately after each call; there is no buffering window.
    pub fn append_fragment(&mut self, id: u64, fragment: &str) {
        if let Some(msg) = self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.id == id && m.role == Role::Assistant)
        {
            msg.text.push_str(fragment);
        }
    }

    /// Drop an assistant message that never received any text (the stream
    /// failed before the first fragment).
    pub fn discard_if_empty(&mut self, id: u64) {
        if let Some(pos) = self.messages.iter().position(|m| m.id == id) {
            if self.messages[pos].text.is_empty() {
                self.messages.remove(pos);
            }
        }
    }

    // ── Input buffer & attachment ───────────────────────────────────

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Append recognized (OCR) text to the pending input on a new line.
    pub fn append_recognized(&mut self, text: &str) {
        if !self.input.is_empty() {
            self.input.push('\n');
        }
        self.input.push_str(text);
    }

    /// Append a voice transcript to the pending input, space-separated.
    pub fn append_transcript(&mut self, text: &str) {
        if !self.input.is_empty() && !self.input.ends_with(' ') {
            self.input.push(' ');
        }
        self.input.push_str(text);
    }

    /// Take the drafted message out of the state: input text plus any
    /// staged attachment.
    pub fn take_draft(&mut self) -> (String, Option<InlineImage>) {
        let text = std::mem::take(&mut self.input);
        let image = self.pending_attachment.take().map(|c| InlineImage::from(&c));
        (text, image)
    }

    pub fn pending_attachment(&self) -> Option<&CroppedImage> {
        self.pending_attachment.as_ref()
    }

    // ── Connectivity ────────────────────────────────────────────────

    pub fn set_online(&mut self, online: bool) {
        if self.online != online {
            log::info!("[STATE] Connectivity: {}", if online { "online" } else { "offline" });
        }
        self.online = online;
    }

    /// Sending is disabled while offline; nothing is queued.
    pub fn can_send(&self) -> bool {
        self.online
    }

    // ── Crop session ────────────────────────────────────────────────

    pub fn crop_active(&self) -> bool {
        self.crop.is_some()
    }

    /// Start a crop session. Refused (returns false) while one is active.
    pub fn begin_crop(&mut self, frame: CapturedFrame) -> bool {
        if self.crop.is_some() {
            log::info!("[STATE] Crop session already active — ignoring new capture");
            return false;
        }
        self.crop = Some(CropSession { frame, selection: None });
        true
    }

    /// Update the in-progress drag rectangle.
    pub fn update_selection(&mut self, selection: SelectionRect) {
        if let Some(session) = &mut self.crop {
            session.selection = Some(selection);
        }
    }

    /// Leave crop mode, dropping the frame. Any in-flight recognition keeps
    /// running but its result will land in the input buffer as usual.
    pub fn cancel_crop(&mut self) {
        self.crop = None;
    }

    /// Finalize the drag: map, crop, and route per `mode`.
    ///
    /// Degenerate selections leave the session live so the user can redraw.
    /// A successful crop ends the session and discards the frame.
    pub fn finalize_crop(
        &mut self,
        container: ContainerGeometry,
        mode: CropMode,
    ) -> Result<CropAction, CropError> {
        let Some(session) = &self.crop else {
            return Ok(CropAction::Ignored);
        };
        let Some(selection) = session.selection else {
            return Ok(CropAction::Ignored);
        };

        let Some(cropped) = crop_selection(&session.frame, container, selection)? else {
            return Ok(CropAction::Ignored);
        };

        self.crop = None;
        match mode {
            CropMode::Attach => {
                self.pending_attachment = Some(cropped);
                Ok(CropAction::Attached)
            }
            CropMode::Recognize => Ok(CropAction::Recognize(cropped)),
        }
    }

    // ── Transient status ────────────────────────────────────────────

    /// Surface a transient failure; it auto-expires after [`STATUS_TTL`].
    pub fn set_transient_error(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        log::warn!("[STATE] {}", text);
        self.status = Some(StatusMessage { text, expires_at: now + STATUS_TTL });
    }

    /// The current status line, if it hasn't expired.
    pub fn status(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|s| s.expires_at > now)
            .map(|s| s.text.as_str())
    }

    pub fn dismiss_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn frame(w: u32, h: u32) -> CapturedFrame {
        CapturedFrame::new(DynamicImage::ImageRgba8(RgbaImage::new(w, h)))
    }

    fn state() -> AppState {
        AppState::new(ChatConfig::default())
    }

    #[test]
    fn fragments_accumulate_in_arrival_order() {
        let mut s = state();
        let id = s.begin_assistant_message();

        let mut seen = Vec::new();
        for fragment in ["Hel", "lo,", " world"] {
            s.append_fragment(id, fragment);
            seen.push(s.messages().last().unwrap().text.clone());
        }
        assert_eq!(seen, vec!["Hel", "Hello,", "Hello, world"]);
    }

    #[test]
    fn recognized_text_appends_on_new_line() {
        let mut s = state();
        s.set_input("Check: ");
        s.append_recognized("Total: 42");
        assert_eq!(s.input(), "Check: \nTotal: 42");
    }

    #[test]
    fn recognized_text_into_empty_input_has_no_leading_newline() {
        let mut s = state();
        s.append_recognized("Total: 42");
        assert_eq!(s.input(), "Total: 42");
    }

    #[test]
    fn second_crop_session_is_refused() {
        let mut s = state();
        assert!(s.begin_crop(frame(100, 100)));
        assert!(!s.begin_crop(frame(100, 100)));
        s.cancel_crop();
        assert!(s.begin_crop(frame(100, 100)));
    }

    #[test]
    fn undersized_selection_keeps_session_alive() {
        let mut s = state();
        s.begin_crop(frame(4000, 1000));
        s.update_selection(SelectionRect { x: 100.0, y: 200.0, w: 9.0, h: 50.0 });

        let container = ContainerGeometry { width: 1000.0, height: 500.0 };
        let action = s.finalize_crop(container, CropMode::Attach).unwrap();
        assert!(matches!(action, CropAction::Ignored));
        assert!(s.crop_active());
        assert!(s.pending_attachment().is_none());
    }

    #[test]
    fn attach_mode_stages_the_crop_and_ends_the_session() {
        let mut s = state();
        s.begin_crop(frame(4000, 1000));
        s.update_selection(SelectionRect { x: 100.0, y: 125.0, w: 200.0, h: 50.0 });

        let container = ContainerGeometry { width: 1000.0, height: 500.0 };
        let action = s.finalize_crop(container, CropMode::Attach).unwrap();
        assert!(matches!(action, CropAction::Attached));
        assert!(!s.crop_active());

        let staged = s.pending_attachment().unwrap();
        assert_eq!((staged.width, staged.height), (800, 200));
    }

    #[test]
    fn draft_carries_attachment_once() {
        let mut s = state();
        s.begin_crop(frame(400, 400));
        s.update_selection(SelectionRect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 });
        s.finalize_crop(ContainerGeometry { width: 400.0, height: 400.0 }, CropMode::Attach)
            .unwrap();
        s.set_input("what is this?");

        let (text, image) = s.take_draft();
        assert_eq!(text, "what is this?");
        assert!(image.is_some());

        let (text, image) = s.take_draft();
        assert!(text.is_empty());
        assert!(image.is_none());
    }

    #[test]
    fn status_expires_after_ttl() {
        let mut s = state();
        let t0 = Instant::now();
        s.set_transient_error("recognition failed", t0);
        assert_eq!(s.status(t0), Some("recognition failed"));
        assert_eq!(s.status(t0 + STATUS_TTL + Duration::from_millis(1)), None);
    }

    #[test]
    fn empty_assistant_message_is_discarded_on_failure() {
        let mut s = state();
        let id = s.begin_assistant_message();
        s.discard_if_empty(id);
        assert!(s.messages().is_empty());

        let id = s.begin_assistant_message();
        s.append_fragment(id, "partial");
        s.discard_if_empty(id);
        assert_eq!(s.messages().len(), 1);
    }

    #[test]
    fn persisted_round_trip_continues_id_sequence() {
        let mut s = state();
        s.push_user_message("hello", None);
        let id = s.begin_assistant_message();
        s.append_fragment(id, "hi");

        let restored = AppState::from_persisted(s.to_persisted());
        assert_eq!(restored.messages().len(), 2);
        let new_id = {
            let mut r = restored;
            r.push_user_message("again", None)
        };
        assert!(new_id > id);
    }
}
