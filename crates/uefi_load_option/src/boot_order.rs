//! The `BootOrder` variable: a packed array of little-endian boot option numbers.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::vec::Vec;

use crate::services::BootOrderSource;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BootOrder {
    entries: Vec<u16>,
}

impl BootOrder {
    pub fn new(entries: Vec<u16>) -> Self {
        Self { entries }
    }

    /// Decodes the variable contents. An odd trailing byte is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() % 2 != 0 {
            log::warn!("BootOrder has an odd length of {} bytes", bytes.len());
        }
        Self { entries: bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|entry| entry.to_le_bytes()).collect()
    }

    pub fn entries(&self) -> &[u16] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, boot_number: u16) -> bool {
        self.entries.contains(&boot_number)
    }

    pub fn push(&mut self, boot_number: u16) {
        self.entries.push(boot_number);
    }

    /// Removes every occurrence of `boot_number`. Returns true if anything was removed.
    pub fn remove(&mut self, boot_number: u16) -> bool {
        let before = self.entries.len();
        self.entries.retain(|&entry| entry != boot_number);
        self.entries.len() != before
    }

    /// Moves the entry at position `from` to position `to`, shifting the entries in between.
    ///
    /// Returns the moved boot number, or `None` if either position is out of range.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Option<u16> {
        if from >= self.entries.len() || to >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Some(entry)
    }
}

impl BootOrderSource for BootOrder {
    fn position_of(&self, boot_number: u16) -> Option<usize> {
        self.entries.iter().position(|&entry| entry == boot_number)
    }
}
