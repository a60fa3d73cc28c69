//! Incremental decoder for OpenAI-style `text/event-stream` bodies.
//!
//! Chunks may split lines (and UTF-8 sequences) anywhere; complete lines are
//! decoded as they become available.

use tracing::warn;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct DeltaDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once the `[DONE]` marker has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one body chunk; returns the text deltas completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut deltas = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(delta) = self.decode_line(&line) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Decode whatever is left after the body ended without a final newline.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest).into_iter().collect()
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<String> {
        if self.done {
            return None;
        }
        let line = String::from_utf8_lossy(line);
        let payload = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim_start();

        if payload == DONE_MARKER {
            self.done = true;
            return None;
        }

        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(event) => event
                .pointer("/choices/0/delta/content")
                .and_then(|c| c.as_str())
                .filter(|c| !c.is_empty())
                .map(str::to_owned),
            Err(e) => {
                warn!(error = %e, payload = %payload, "skipping undecodable stream event");
                None
            }
        }
    }
}
