//! Capacity-checked outbound message buffer

use crate::error::FrameError;

/// A bounded byte buffer for one outbound message
///
/// Appends never grow past the capacity fixed at creation; an append that
/// would overflow fails and leaves the frame unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<u8>,
    capacity: usize,
}

impl Frame {
    /// Create an empty frame holding at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append raw bytes
    pub fn push(&mut self, bytes: &[u8]) -> Result<&mut Self, FrameError> {
        let needed = self.buf.len() + bytes.len();
        if needed > self.capacity {
            return Err(FrameError::Overflow {
                capacity: self.capacity,
                needed,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(self)
    }

    /// Append a string
    pub fn push_str(&mut self, s: &str) -> Result<&mut Self, FrameError> {
        self.push(s.as_bytes())
    }

    /// Append a line terminator unless the frame already ends with one
    pub fn terminate_line(&mut self) -> Result<&mut Self, FrameError> {
        if self.buf.last() != Some(&b'\n') {
            self.push(b"\n")?;
        }
        Ok(self)
    }

    /// The assembled message
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
