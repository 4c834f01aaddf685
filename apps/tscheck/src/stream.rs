//! Reassembly of compiler stdout into whole lines.
//!
//! Pipe reads can split a diagnostic line anywhere. `LineBuffer` holds the
//! trailing partial line of each chunk until its newline arrives, so the
//! grammar only ever sees complete lines.

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every complete line accumulated so far
    /// (newlines included), or `None` when no line is complete yet.
    pub fn push(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.pending.extend_from_slice(chunk);
        let cut = self.pending.iter().rposition(|b| *b == b'\n')? + 1;
        let rest = self.pending.split_off(cut);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Drain whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
