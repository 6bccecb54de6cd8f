//! Receive-side line accumulation
//!
//! Bytes drained from the module outside of command exchanges land here and
//! are consumed line by line. Bytes are stored raw; conversion to text only
//! happens at extraction, so multi-byte sequences split across drain ticks
//! reassemble intact.

/// Growable accumulation buffer with line-delimited extraction
#[derive(Debug, Default)]
pub struct LineBuffer {
    data: Vec<u8>,
}

impl LineBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append a complete line followed by a terminator
    pub fn push_line(&mut self, line: &str) {
        self.data.extend_from_slice(line.as_bytes());
        self.data.push(b'\n');
    }

    /// Number of buffered bytes
    pub fn available(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Extract the next line
    ///
    /// Leading CR/LF bytes are dropped, then everything up to the first CR
    /// or LF is returned and removed along with that delimiter. Unterminated
    /// trailing content is returned whole and the buffer cleared. Returns
    /// `None` once nothing but delimiters remains.
    pub fn read_line(&mut self) -> Option<String> {
        let start = match self.data.iter().position(|&b| b != b'\r' && b != b'\n') {
            Some(start) => start,
            None => {
                self.data.clear();
                return None;
            }
        };
        if start > 0 {
            self.data.drain(..start);
        }

        match self.data.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(end) => {
                let line = String::from_utf8_lossy(&self.data[..end]).into_owned();
                self.data.drain(..=end);
                Some(line)
            }
            None => {
                let rest = std::mem::take(&mut self.data);
                Some(String::from_utf8_lossy(&rest).into_owned())
            }
        }
    }
}
