//! Per-connection result buffer with typed accessors.
//!
//! Every read lands in the connection's [`ResultBuffer`]; the typed
//! accessors then decode values at byte offsets without further PLC
//! traffic. S7 CPUs store multi-byte values big-endian, so all accessors
//! decode big-endian.
//!
//! The buffer only ever holds the result of the most recent successful
//! read. Connection loss and failed reads invalidate it, after which
//! every accessor reports [`S7Error::BufferOutOfRange`] until the next
//! read succeeds.
//!
//! # Example
//!
//! ```
//! use s7comm::buffer::ResultBuffer;
//!
//! let mut buffer = ResultBuffer::new();
//! buffer.fill(&[0x00, 0x05, 0x41, 0x20, 0x00, 0x00]);
//! assert_eq!(buffer.get_u16(0).unwrap(), 5);
//! assert_eq!(buffer.get_f32(2).unwrap(), 10.0);
//! ```

use std::fmt;

use crate::error::{Result, S7Error};

/// Maximum number of bytes a single read may populate.
pub const RESULT_BUFFER_CAPACITY: usize = 1024;

/// Holds the payload of the most recent read.
///
/// See the [module documentation](self) for the invalidation rules.
#[derive(Clone, PartialEq, Eq)]
pub struct ResultBuffer {
    data: Vec<u8>,
}

impl ResultBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(RESULT_BUFFER_CAPACITY),
        }
    }

    /// Replaces the buffer contents.
    ///
    /// Successful reads call this with the received payload.
    pub fn fill(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
    }

    /// Discards the buffer contents.
    pub(crate) fn invalidate(&mut self) {
        self.data.clear();
    }

    /// Returns the number of populated bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the buffer holds no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `length` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::BufferOutOfRange` if the range reaches past the
    /// populated bytes.
    pub fn get_bytes(&self, offset: usize, length: usize) -> Result<&[u8]> {
        offset
            .checked_add(length)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(S7Error::BufferOutOfRange {
                offset,
                length,
                populated: self.data.len(),
            })
    }

    /// Returns the byte at `offset`.
    pub fn get_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.get_bytes(offset, 1)?[0])
    }

    /// Returns the byte at `offset` as a signed value.
    pub fn get_i8(&self, offset: usize) -> Result<i8> {
        Ok(self.get_u8(offset)? as i8)
    }

    /// Decodes a big-endian `u16` at `offset`.
    ///
    /// ```
    /// # use s7comm::buffer::ResultBuffer;
    /// # let mut buffer = ResultBuffer::new();
    /// # buffer.fill(&[0x00, 0x05]);
    /// assert_eq!(buffer.get_u16(0).unwrap(), 5);
    /// ```
    pub fn get_u16(&self, offset: usize) -> Result<u16> {
        let b = self.get_bytes(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Decodes a big-endian `i16` at `offset`.
    pub fn get_i16(&self, offset: usize) -> Result<i16> {
        let b = self.get_bytes(offset, 2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    /// Decodes a big-endian `u32` at `offset`.
    pub fn get_u32(&self, offset: usize) -> Result<u32> {
        let b = self.get_bytes(offset, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Decodes a big-endian `i32` at `offset`.
    pub fn get_i32(&self, offset: usize) -> Result<i32> {
        let b = self.get_bytes(offset, 4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Decodes a big-endian IEEE 754 `f32` at `offset`.
    ///
    /// S7 CPUs store REAL values in this format.
    ///
    /// ```
    /// # use s7comm::buffer::ResultBuffer;
    /// # let mut buffer = ResultBuffer::new();
    /// # buffer.fill(&[0x41, 0x20, 0x00, 0x00]);
    /// assert_eq!(buffer.get_f32(0).unwrap(), 10.0);
    /// ```
    pub fn get_f32(&self, offset: usize) -> Result<f32> {
        let b = self.get_bytes(offset, 4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Returns bit `bit` (0 = least significant) of the byte at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if `bit` is greater than 7 and
    /// `S7Error::BufferOutOfRange` if `offset` is not populated.
    pub fn get_bit(&self, offset: usize, bit: u8) -> Result<bool> {
        if bit > 7 {
            return Err(S7Error::invalid_parameter(
                "bit",
                format!("bit {} is out of range 0-7", bit),
            ));
        }
        Ok(self.get_u8(offset)? & (1 << bit) != 0)
    }
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResultBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}
