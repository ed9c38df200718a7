//! Incremental frame decoding for the search result stream.
//!
//! The wire format is SSE-shaped: each frame is an optional `event: <type>`
//! line followed by a `data: <json>` line, frames separated by a blank line.
//! The reader is fed raw byte chunks as they arrive and yields decoded
//! events; payload bytes split across reads, and several frames delivered in
//! one read, are both handled.
//!
//! A malformed `data:` line is skipped, never fatal: one bad line must not
//! abort the stream.

use crate::event::StreamEvent;

/// Stateful, non-restartable reader turning raw bytes into [`StreamEvent`]s.
///
/// Once the underlying stream is exhausted the sequence cannot be replayed;
/// callers needing the data again must re-run the search.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
    event_type: Option<String>,
}

impl FrameReader {
    /// Create an empty reader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every event completed by it.
    ///
    /// Incomplete trailing lines stay buffered until a later chunk finishes
    /// them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some(event) = self.handle_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Number of buffered bytes awaiting a line terminator.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    fn handle_line(&mut self, line: &str) -> Option<StreamEvent> {
        if line.is_empty() {
            // Blank line ends the frame and its event-type association.
            self.event_type = None;
            return None;
        }

        if let Some(name) = line.strip_prefix("event:") {
            self.event_type = Some(name.trim().to_string());
            return None;
        }

        if let Some(data) = line.strip_prefix("data:") {
            return self.handle_data(data.trim());
        }

        // Comment lines and unknown fields (id:, retry:, ...) are ignored.
        None
    }

    fn handle_data(&mut self, data: &str) -> Option<StreamEvent> {
        let payload = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("skipping malformed data line: {e}");
                return None;
            }
        };

        match StreamEvent::decode(self.event_type.as_deref(), payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("skipping undecodable frame: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(reader: &mut FrameReader, text: &str) -> Vec<StreamEvent> {
        reader.feed(text.as_bytes())
    }

    #[test]
    fn test_single_frame() {
        let mut reader = FrameReader::new();
        let events = feed_all(
            &mut reader,
            "event: status\ndata: {\"progress\": 10.0, \"message\": \"starting\"}\n\n",
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Status(_)));
    }

    #[test]
    fn test_payload_split_across_reads() {
        let mut reader = FrameReader::new();
        let frame = "event: results\ndata: {\"leads\": [{\"id\": \"lead-1\"}], \"progress\": 5.0}\n\n";
        let (a, b) = frame.split_at(31); // mid-JSON
        assert!(reader.feed(a.as_bytes()).is_empty());
        assert!(reader.pending_bytes() > 0);
        let events = reader.feed(b.as_bytes());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Results(_)));
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let mut reader = FrameReader::new();
        let events = feed_all(
            &mut reader,
            concat!(
                "event: status\ndata: {\"progress\": 10.0}\n\n",
                "event: results\ndata: {\"leads\": [], \"progress\": 20.0}\n\n",
                "event: complete\ndata: {\"message\": \"done\"}\n\n",
            ),
        );
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], StreamEvent::Complete(_)));
    }

    #[test]
    fn test_missing_event_line_infers_type() {
        let mut reader = FrameReader::new();
        let events = feed_all(&mut reader, "data: {\"leads\": [], \"progress\": 1.0}\n\n");
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Results(_)));
    }

    #[test]
    fn test_malformed_data_line_is_skipped() {
        let mut reader = FrameReader::new();
        let events = feed_all(
            &mut reader,
            concat!(
                "event: results\ndata: {\"leads\": [{\"id\": \"lead-1\"}]}\n\n",
                "event: results\ndata: {not valid json\n\n",
                "event: results\ndata: {\"leads\": [{\"id\": \"lead-2\"}]}\n\n",
            ),
        );
        // One bad line between two valid frames still yields both.
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_blank_line_clears_event_type() {
        let mut reader = FrameReader::new();
        // After the blank line the error shape must be inferred, not carried
        // over from the previous frame's event line.
        let events = feed_all(
            &mut reader,
            concat!(
                "event: status\ndata: {\"progress\": 1.0}\n\n",
                "data: {\"error\": \"boom\"}\n\n",
            ),
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], StreamEvent::Error(_)));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut reader = FrameReader::new();
        let events = feed_all(
            &mut reader,
            ": keep-alive\nid: 7\nevent: status\ndata: {\"progress\": 3.0}\n\n",
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_multibyte_characters_split_across_reads() {
        let mut reader = FrameReader::new();
        let frame = "event: status\ndata: {\"message\": \"café résumé\"}\n\n".as_bytes();
        // Split inside the two-byte 'é' sequence.
        let split = frame.iter().position(|&b| b == 0xC3).expect("multibyte char") + 1;
        let mut events = reader.feed(&frame[..split]);
        events.extend(reader.feed(&frame[split..]));
        assert_eq!(events.len(), 1);
        let StreamEvent::Status(status) = &events[0] else {
            panic!("expected status event");
        };
        assert_eq!(status.message.as_deref(), Some("café résumé"));
    }
}
