//! UCS-2 text conversions and a hex/ASCII dump for firmware buffers.
//!
//! Firmware strings are sequences of 16-bit little-endian code units terminated by a zero unit.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::{string::String, vec::Vec};
use core::fmt::Write;

/// Number of code units shown on one line of [`hex_ascii_view`].
pub const HEX_VIEW_UNITS_PER_LINE: usize = 8;

/// Width of one hex field, including its trailing separator.
const HEX_FIELD_WIDTH: usize = 5;

/// Encodes `text` as UCS-2 little-endian bytes, optionally followed by a zero terminator unit.
///
/// Characters outside the Basic Multilingual Plane are written as surrogate pairs.
pub fn to_efi_text(text: &str, null_terminated: bool) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    if null_terminated {
        bytes.extend_from_slice(&[0, 0]);
    }
    bytes
}

/// Decodes UCS-2 little-endian bytes up to the first zero unit or the end of the buffer.
///
/// Bytes after the terminator, and an unpaired trailing byte, are ignored.
pub fn from_efi_bytes(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Renders `bytes` as a fixed-width dump of 16-bit little-endian units with an ASCII column.
///
/// Each line holds eight fields of the form `xxxx ` followed by the ASCII rendering of those units. A unit is shown
/// as a character only when it is printable ASCII, otherwise as a space. An odd trailing byte is shown as `xx` and
/// has no ASCII character. The final line is padded with blank fields so its ASCII column lines up with the others.
pub fn hex_ascii_view(bytes: &[u8]) -> String {
    let mut view = String::new();
    let mut ascii = String::new();

    for (n, unit) in bytes.chunks(2).enumerate() {
        if n != 0 && n % HEX_VIEW_UNITS_PER_LINE == 0 {
            view.push_str(&ascii);
            view.push('\n');
            ascii.clear();
        }

        match *unit {
            [byte] => {
                let _ = write!(view, "{byte:02x}{:width$}", "", width = HEX_FIELD_WIDTH - 2);
            }
            [lo, hi, ..] => {
                let value = u16::from_le_bytes([lo, hi]);
                let _ = write!(view, "{value:04x} ");
                ascii.push(printable(value));
            }
            [] => {}
        }
    }

    let used = bytes.len().div_ceil(2) % HEX_VIEW_UNITS_PER_LINE;
    if used != 0 {
        for _ in used..HEX_VIEW_UNITS_PER_LINE {
            view.push_str("     ");
        }
    }
    view.push_str(&ascii);
    view
}

fn printable(unit: u16) -> char {
    match u8::try_from(unit) {
        Ok(byte) if byte.is_ascii_graphic() => char::from(byte),
        _ => ' ',
    }
}
