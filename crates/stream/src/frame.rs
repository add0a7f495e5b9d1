//! Incremental SSE frame decoding
//!
//! Frames are line-delimited: `event: <name>`, one or more `data: <payload>`
//! lines, and a blank line as terminator. Input arrives as raw byte chunks
//! that may split lines (and UTF-8 sequences) at any boundary; partial
//! lines stay buffered until a terminator is seen.

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Push-based frame decoder.
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let line = String::from_utf8_lossy(line).into_owned();
            if let Some(frame) = self.handle_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing frame left unterminated when the stream ends.
    pub fn finish(&mut self) -> Option<Frame> {
        if !self.buf.is_empty() {
            let bytes = std::mem::take(&mut self.buf);
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(&bytes);
            let line = String::from_utf8_lossy(bytes).into_owned();
            // a trailing non-blank line still contributes to the last frame
            if let Some(frame) = self.handle_line(&line) {
                return Some(frame);
            }
        }
        self.flush()
    }

    fn handle_line(&mut self, line: &str) -> Option<Frame> {
        if line.is_empty() {
            return self.flush();
        }
        // comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            // exactly one separator space is stripped; payload may
            // legitimately begin with whitespace
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // unknown fields are ignored per the wire format
            _ => {}
        }
        None
    }

    fn flush(&mut self) -> Option<Frame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = std::mem::take(&mut self.data).join("\n");
        Some(Frame { event, data })
    }
}
