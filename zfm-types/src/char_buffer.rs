//! On-device character buffers

use std::fmt;

use crate::error::{Error, Result};

/// One of the two scratch registers holding extracted fingerprint features
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CharBuffer {
    Buffer1 = 1,
    Buffer2 = 2,
}

impl CharBuffer {
    /// Buffer id sent on the wire
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl From<CharBuffer> for u8 {
    fn from(buffer: CharBuffer) -> u8 {
        buffer.id()
    }
}

impl TryFrom<u8> for CharBuffer {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Buffer1),
            2 => Ok(Self::Buffer2),
            other => Err(Error::Validation(format!("no CharBuffer with id {}", other))),
        }
    }
}

impl fmt::Display for CharBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharBuffer{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_buffer_ids() {
        assert_eq!(CharBuffer::Buffer1.id(), 1);
        assert_eq!(CharBuffer::try_from(2).unwrap(), CharBuffer::Buffer2);
        assert!(CharBuffer::try_from(3).is_err());
        assert_eq!(CharBuffer::Buffer2.to_string(), "CharBuffer2");
    }
}
