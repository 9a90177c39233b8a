//! Bounded command and result buffers behind the data register.

use arrayvec::ArrayVec;

use crate::error::BufferError;

/// Longest command (the 9-byte transfer family).
pub const COMMAND_CAPACITY: usize = 9;
/// Longest result block (ST0-ST2 plus C/H/R/N).
pub const RESULT_CAPACITY: usize = 7;

/// Command bytes received so far.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    bytes: ArrayVec<u8, COMMAND_CAPACITY>,
}

impl CommandBuffer {
    pub fn push(&mut self, value: u8) -> Result<(), BufferError> {
        self.bytes
            .try_push(value)
            .map_err(|_| BufferError::CommandOverflow)
    }

    /// Hand the complete command to the executor, leaving the buffer empty.
    pub fn take(&mut self) -> ArrayVec<u8, COMMAND_CAPACITY> {
        std::mem::take(&mut self.bytes)
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Result bytes staged for the host, consumed one per data register read.
#[derive(Debug, Clone, Default)]
pub struct ResultBuffer {
    bytes: ArrayVec<u8, RESULT_CAPACITY>,
    cursor: usize,
}

impl ResultBuffer {
    /// Replace the staged result. On overflow the buffer is left empty.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.clear();
        self.bytes
            .try_extend_from_slice(bytes)
            .map_err(|_| BufferError::ResultOverflow)
    }

    /// Next unread byte, advancing the cursor.
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(byte)
    }

    pub fn is_drained(&self) -> bool {
        self.cursor >= self.bytes.len()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.cursor = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
