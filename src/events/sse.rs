// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Incremental server-sent-events frame parser.
//!
//! Feeds on raw response chunks and yields complete frames. A frame is a
//! block of `event:`/`data:` lines terminated by a blank line; a frame
//! without an explicit `event:` line dispatches as `message`, and frames
//! without any `data:` line are dropped, both per the SSE processing
//! model. Comment lines (leading `:`) are keep-alives and ignored.

/// Default event name when a frame has no `event:` line.
pub const MESSAGE_EVENT: &str = "message";

/// A complete parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Chunk-tolerant SSE parser. Lines may arrive split across chunks or
/// several frames per chunk; state carries over between `push` calls.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else if let Some(value) = line.strip_prefix("event:") {
                self.event = Some(trim_field(value).to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(trim_field(value).to_string());
            } else if line.starts_with(':') {
                // comment / keep-alive
            }
            // other fields (id:, retry:) are not used by this client
        }

        frames
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            // nothing to dispatch; a stray event name is discarded
            self.event = None;
            return None;
        }

        Some(SseFrame {
            event: self
                .event
                .take()
                .unwrap_or_else(|| MESSAGE_EVENT.to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// A single leading space after the colon is part of the field syntax.
fn trim_field(value: &str) -> &str {
    value.strip_prefix(' ').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_named_event() {
        let mut parser = SseParser::new();
        let frames = parser.push(b"event: ping\ndata: pong 2026\n\n");

        assert_eq!(
            frames,
            vec![SseFrame {
                event: "ping".into(),
                data: "pong 2026".into(),
            }]
        );
    }

    #[test]
    fn frame_without_event_name_is_a_message() {
        let mut parser = SseParser::new();
        let frames = parser.push(b"data: hello\n\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, MESSAGE_EVENT);
        assert_eq!(frames[0].data, "hello");
    }

    #[test]
    fn handles_chunks_split_mid_line() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: new-su").is_empty());
        assert!(parser.push(b"rvey\ndata: {\"_id\"").is_empty());
        let frames = parser.push(b": \"s1\"}\n\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "new-survey");
        assert_eq!(frames[0].data, "{\"_id\": \"s1\"}");
    }

    #[test]
    fn yields_multiple_frames_from_one_chunk() {
        let mut parser = SseParser::new();
        let frames = parser.push(b"event: ping\ndata: a\n\nevent: ping\ndata: b\n\n");

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "a");
        assert_eq!(frames[1].data, "b");
    }

    #[test]
    fn multi_line_data_joins_with_newlines() {
        let mut parser = SseParser::new();
        let frames = parser.push(b"data: line one\ndata: line two\n\n");

        assert_eq!(frames[0].data, "line one\nline two");
    }

    #[test]
    fn comments_and_dataless_frames_are_dropped() {
        let mut parser = SseParser::new();
        let frames = parser.push(b": keep-alive\n\nevent: ping\n\ndata: real\n\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "real");
        assert_eq!(frames[0].event, MESSAGE_EVENT);
    }

    #[test]
    fn crlf_lines_are_accepted() {
        let mut parser = SseParser::new();
        let frames = parser.push(b"event: ping\r\ndata: pong\r\n\r\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "ping");
        assert_eq!(frames[0].data, "pong");
    }
}
