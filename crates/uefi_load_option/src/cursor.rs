//! Sequential little-endian reads over an immutable byte buffer.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use scroll::{Pread, LE};

use crate::error::{Error, Result};

/// A read position within a borrowed byte buffer.
///
/// Every `take_*` call consumes bytes from the front of what remains. The underlying buffer is never modified, so
/// the number of bytes consumed so far is always available through [`ByteCursor::consumed`].
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor positioned at the start of `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Number of bytes that have not been consumed yet.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Number of bytes consumed so far.
    pub const fn consumed(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(Error::BufferTooSmall { needed, remaining: self.remaining() });
        }
        Ok(())
    }

    pub fn take_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.bytes.gread_with::<u8>(&mut self.offset, LE)?)
    }

    pub fn take_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.bytes.gread_with::<u16>(&mut self.offset, LE)?)
    }

    pub fn take_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.bytes.gread_with::<u32>(&mut self.offset, LE)?)
    }

    pub fn take_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.bytes.gread_with::<u64>(&mut self.offset, LE)?)
    }

    /// Consumes exactly `count` bytes and returns them as a sub-slice of the original buffer.
    pub fn take_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.ensure(count)?;
        let bytes: &'a [u8] = self.bytes;
        Ok(bytes.gread_with::<&'a [u8]>(&mut self.offset, count)?)
    }

    /// Consumes exactly `N` bytes into a fixed-size array.
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take_bytes(N)?);
        Ok(array)
    }

    /// Consumes everything that is left, which may be nothing.
    pub fn take_remaining(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        rest
    }
}
