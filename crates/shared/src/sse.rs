//! Incremental `text/event-stream` decoder.
//!
//! Bytes may be fed in arbitrary chunks; complete events come out as soon as
//! their terminating blank line has been seen. An event still being assembled
//! when the stream ends is dropped, matching browser `EventSource` behavior.
//! `id` and `retry` fields are skipped since the client never reconnects.

use thiserror::Error;

pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Longest line accepted before the stream is rejected.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SseError {
    #[error("event-stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseEvent {
    /// Whether an `onmessage`-style listener would receive this event.
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT_TYPE
    }
}

#[derive(Debug)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: String,
    event_type: String,
    skip_next_lf: bool,
    seen_first_line: bool,
    max_line_bytes: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            line: Vec::new(),
            data: String::new(),
            event_type: String::new(),
            skip_next_lf: false,
            seen_first_line: false,
            max_line_bytes,
        }
    }

    /// Decodes a chunk. After an error the decoder must not be fed again.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, SseError> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.skip_next_lf {
                self.skip_next_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\r' => {
                    self.skip_next_lf = true;
                    self.finish_line(&mut events);
                }
                b'\n' => self.finish_line(&mut events),
                _ => {
                    if self.line.len() >= self.max_line_bytes {
                        self.line.clear();
                        return Err(SseError::LineTooLong {
                            limit: self.max_line_bytes,
                        });
                    }
                    self.line.push(byte);
                }
            }
        }
        Ok(events)
    }

    fn finish_line(&mut self, events: &mut Vec<SseEvent>) {
        let raw = std::mem::take(&mut self.line);
        let decoded = String::from_utf8_lossy(&raw);
        let mut line: &str = &decoded;
        if !self.seen_first_line {
            self.seen_first_line = true;
            line = line.strip_prefix('\u{feff}').unwrap_or(line);
        }

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event_type = value.to_string(),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        if self.data.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        Some(SseEvent {
            event: if event_type.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event_type
            },
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut SseDecoder, chunk: &[u8]) -> Vec<SseEvent> {
        decoder.feed(chunk).expect("decode")
    }

    fn data_of(events: &[SseEvent]) -> Vec<&str> {
        events.iter().map(|event| event.data.as_str()).collect()
    }

    #[test]
    fn decodes_simple_data_events() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, b"data: 10.0\n\ndata: DONE\n\n");
        assert_eq!(data_of(&events), vec!["10.0", "DONE"]);
        assert!(events.iter().all(SseEvent::is_message));
    }

    #[test]
    fn strips_only_one_leading_space() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, b"data:  ERROR: oops\n\n");
        assert_eq!(data_of(&events), vec![" ERROR: oops"]);
    }

    #[test]
    fn joins_multiline_data_with_newlines() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, b"data: first\ndata: second\n\n");
        assert_eq!(data_of(&events), vec!["first\nsecond"]);
    }

    #[test]
    fn handles_events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(feed(&mut decoder, b"da").is_empty());
        assert!(feed(&mut decoder, b"ta: 5").is_empty());
        assert!(feed(&mut decoder, b"0\n").is_empty());
        let events = feed(&mut decoder, b"\n");
        assert_eq!(data_of(&events), vec!["50"]);
    }

    #[test]
    fn crlf_split_across_chunks_is_one_line_break() {
        let mut decoder = SseDecoder::new();
        assert!(feed(&mut decoder, b"data: 1\r").is_empty());
        assert!(feed(&mut decoder, b"\n").is_empty());
        let events = feed(&mut decoder, b"\r\n");
        assert_eq!(data_of(&events), vec!["1"]);
    }

    #[test]
    fn bare_cr_terminates_lines() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, b"data: 7\r\rdata: 8\r\r");
        assert_eq!(data_of(&events), vec!["7", "8"]);
    }

    #[test]
    fn ignores_comments_and_unknown_fields() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, b": keep-alive\nfoo: bar\ndata: 3\n\n");
        assert_eq!(data_of(&events), vec!["3"]);
    }

    #[test]
    fn named_events_are_not_messages() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, b"event: ping\ndata: x\n\ndata: y\n\n");
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_message());
        assert_eq!(events[0].event, "ping");
        assert!(events[1].is_message());
    }

    #[test]
    fn blank_line_without_data_dispatches_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(feed(&mut decoder, b"event: ping\n\n\n").is_empty());
        let events = feed(&mut decoder, b"data: z\n\n");
        assert_eq!(events[0].event, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn strips_leading_bom_and_skips_id_and_retry() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, "\u{feff}id: 9\nretry: 1500\ndata: 1\n\n".as_bytes());
        assert_eq!(data_of(&events), vec!["1"]);
    }

    #[test]
    fn field_without_colon_has_empty_value() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, b"data\n\n");
        assert_eq!(data_of(&events), vec![""]);
        let events = feed(&mut decoder, b"data\ndata: a\n\n");
        assert_eq!(data_of(&events), vec!["\na"]);
    }

    #[test]
    fn overlong_line_is_rejected() {
        let mut decoder = SseDecoder::with_max_line_bytes(8);
        assert!(feed(&mut decoder, b"data: 1\n").is_empty());

        let err = decoder.feed(b"data: 123456789").expect_err("line too long");

        assert_eq!(err, SseError::LineTooLong { limit: 8 });
    }

    #[test]
    fn line_at_the_limit_split_across_chunks_is_accepted() {
        let mut decoder = SseDecoder::with_max_line_bytes(8);
        assert!(feed(&mut decoder, b"data").is_empty());
        let events = feed(&mut decoder, b":100\n\n");
        assert_eq!(data_of(&events), vec!["100"]);
    }
}
