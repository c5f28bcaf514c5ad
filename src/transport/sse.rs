use log::{ debug, warn };

use crate::models::api::StreamChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Content(String),
    Done,
}

/// Splits raw body frames into `data:` records.
///
/// Bytes after the last newline of a frame are held back and prefixed to
/// the next frame, so records (and multi-byte characters) may straddle
/// frame boundaries.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, frame: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(frame);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(event) = decode_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a final record that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line).into_iter().collect()
    }
}

fn decode_line(raw: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(raw);
    let data = line.strip_prefix(DATA_PREFIX)?.trim();
    if data == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }
    let chunk = match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("Skipping unparseable record: {} for data: {}", e, data);
            return None;
        }
    };
    if let Some(message) = &chunk.error {
        warn!("Server reported a stream error: {}", message);
    }
    match chunk.content() {
        Some(content) if !content.is_empty() => Some(SseEvent::Content(content)),
        _ => None,
    }
}
