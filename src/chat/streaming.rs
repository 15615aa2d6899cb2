//! SSE stream plumbing shared by the hosted-API client.
//!
//! The provider streams responses as server-sent events. Network chunks
//! arrive at arbitrary byte boundaries, so [`SseParser`] buffers until a
//! complete event (`\n\n`-terminated) is available. Fragments are then
//! forwarded to the single subscriber over an mpsc channel: a finite,
//! non-restartable sequence, consumed in arrival order.

use tokio::sync::mpsc;

/// One event off the fragment stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental response text, to be appended to the display buffer.
    Fragment(String),
    /// The stream completed normally.
    Done,
    /// The stream died mid-flight. Accumulated text is kept as-is.
    Failed(String),
}

/// Receiving half of a response stream. Dropping it cancels consumption;
/// the in-flight request is not torn down (cancellation is cooperative).
pub type FragmentStream = mpsc::Receiver<StreamEvent>;

pub type FragmentSender = mpsc::Sender<StreamEvent>;

/// Channel capacity for one response stream. Fragments are small; the
/// subscriber appends and repaints, so a short buffer is plenty.
pub const STREAM_BUFFER: usize = 32;

pub fn fragment_channel() -> (FragmentSender, FragmentStream) {
    mpsc::channel(STREAM_BUFFER)
}

/// A parsed server-sent event. `event` is empty for data-only events
/// (the Gemini format).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE parser, indifferent to how the transport chunks bytes.
///
/// The buffer holds raw bytes and only complete event blocks are decoded,
/// so a multi-byte UTF-8 character split across two transport chunks comes
/// out intact.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw transport bytes; returns every event completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block = String::from_utf8_lossy(&self.buffer[..pos]).into_owned();
            self.buffer.drain(..pos + 2);

            let mut event = String::new();
            let mut data_lines: Vec<&str> = Vec::new();
            for line in block.lines() {
                if let Some(val) = line.strip_prefix("event:") {
                    event = val.trim().to_string();
                } else if let Some(val) = line.strip_prefix("data:") {
                    data_lines.push(val.strip_prefix(' ').unwrap_or(val));
                }
            }

            let data = data_lines.join("\n");
            if !event.is_empty() || !data.is_empty() {
                events.push(SseEvent { event, data });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_events() {
        let mut p = SseParser::new();
        let events = p.push(b"event: delta\ndata: {\"x\":1}\n\n");
        assert_eq!(
            events,
            vec![SseEvent { event: "delta".into(), data: "{\"x\":1}".into() }]
        );
    }

    #[test]
    fn parses_data_only_events() {
        let mut p = SseParser::new();
        let events = p.push(b"data: one\n\ndata: two\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
        assert!(events[0].event.is_empty());
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn event_split_across_chunks_is_reassembled() {
        let mut p = SseParser::new();
        assert!(p.push(b"data: hel").is_empty());
        assert!(p.push(b"lo wor").is_empty());
        let events = p.push(b"ld\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello world");
    }

    #[test]
    fn multibyte_char_split_across_chunks_survives() {
        let payload = "data: café\n\n".as_bytes();
        // Split inside the two-byte 'é' sequence.
        let split = 10;
        assert!(payload[..split].len() > 9 && std::str::from_utf8(&payload[..split]).is_err());

        let mut p = SseParser::new();
        assert!(p.push(&payload[..split]).is_empty());
        let events = p.push(&payload[split..]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "café");
    }

    #[test]
    fn multi_line_data_joins_with_newline() {
        let mut p = SseParser::new();
        let events = p.push(b"data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn incomplete_tail_stays_buffered() {
        let mut p = SseParser::new();
        let events = p.push(b"data: full\n\ndata: partial");
        assert_eq!(events.len(), 1);
        let more = p.push(b"\n\n");
        assert_eq!(more.len(), 1);
        assert_eq!(more[0].data, "partial");
    }

    #[test]
    fn blank_events_are_skipped() {
        let mut p = SseParser::new();
        assert!(p.push(b"\n\n\n\n").is_empty());
    }
}
