//! Decoder for the newline-delimited JSON response stream.

use shopchat_types::StreamFragment;

/// Splits raw response bytes into decoded [`StreamFragment`]s.
///
/// A single read may end mid-line, so the decoder keeps the trailing
/// incomplete segment across calls and only emits complete lines. The buffer
/// holds bytes rather than text because a chunk boundary can fall inside a
/// multi-byte UTF-8 sequence.
#[derive(Debug, Default)]
pub struct FragmentDecoder {
    /// Carry-over bytes of the last, possibly incomplete line.
    buffer: Vec<u8>,
}

impl FragmentDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of response bytes, returning the fragments it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<StreamFragment> {
        self.buffer.extend_from_slice(chunk);
        let mut fragments = Vec::new();

        // Process complete lines; the segment after the last newline stays
        // buffered for the next read.
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(fragment) = decode_line(&line[..line.len() - 1]) {
                fragments.push(fragment);
            }
        }

        fragments
    }

    /// Drain the carry-over at end of stream.
    ///
    /// A stream that closes without a trailing newline still gets its final
    /// line decoded.
    pub fn finish(&mut self) -> Option<StreamFragment> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line)
    }

    /// Reset the decoder state.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Decode one line into a fragment.
///
/// Blank lines yield `None`. Lines that are not valid JSON also yield `None`:
/// the stream carries on, the line is only logged. The assembler never sees
/// undecodable input.
fn decode_line(line: &[u8]) -> Option<StreamFragment> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamFragment>(trimmed) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            tracing::debug!(
                target: "shopchat::decoder",
                "Skipping undecodable line: {}: {}",
                e,
                trimmed
            );
            None
        }
    }
}
