//! Load Option Errors
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use core::fmt;

use r_efi::efi;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced while decoding or building a load option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A fixed-width read asked for more bytes than were left in the buffer.
    BufferTooSmall { needed: usize, remaining: usize },
    /// A hard drive media node whose payload is not exactly one partition record.
    MalformedHardDrive { length: usize },
    /// A hard drive media node that does not describe a GPT partition by GUID.
    UnsupportedPartition { partition_format: u8, signature_type: u8 },
    /// The description contains a character outside the allowed set.
    InvalidDescription { character: char },
    /// An encoded node does not fit its 16-bit length field.
    NodeTooLong(usize),
    /// The encoded device path list does not fit its 16-bit length field.
    DevicePathTooLong(usize),
    /// A variable store or partition lookup reported a failure.
    Efi(efi::Status),
}

impl From<efi::Status> for Error {
    fn from(status: efi::Status) -> Self {
        Error::Efi(status)
    }
}

impl From<scroll::Error> for Error {
    fn from(e: scroll::Error) -> Self {
        match e {
            scroll::Error::TooBig { size, len } => Error::BufferTooSmall { needed: size, remaining: len },
            scroll::Error::BadOffset(offset) => Error::BufferTooSmall { needed: offset, remaining: 0 },
            scroll::Error::BadInput { size, .. } => Error::BufferTooSmall { needed: size, remaining: 0 },
            #[allow(unreachable_patterns)]
            _ => Error::BufferTooSmall { needed: 0, remaining: 0 },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooSmall { needed, remaining } => {
                write!(f, "Buffer too small: needed {needed} bytes, {remaining} remaining")
            }
            Error::MalformedHardDrive { length } => {
                write!(f, "Malformed hard drive device path: payload is {length} bytes, expected 38")
            }
            Error::UnsupportedPartition { partition_format, signature_type } => write!(
                f,
                "Unsupported partition addressing (format {partition_format}, signature type {signature_type}), only GPT is supported"
            ),
            Error::InvalidDescription { character } => {
                write!(f, "Forbidden character {character:?} found in description")
            }
            Error::NodeTooLong(len) => write!(f, "Device path node of {len} bytes exceeds the 16-bit length field"),
            Error::DevicePathTooLong(len) => {
                write!(f, "Device path list of {len} bytes exceeds the 16-bit length field")
            }
            Error::Efi(status) => write!(f, "{status:?}"),
        }
    }
}

impl core::error::Error for Error {}
