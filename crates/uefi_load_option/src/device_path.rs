//! Device Path Node Encoding and Decoding
//!
//! A device path list is a sequence of self-describing nodes. Each node starts with a four byte header (type,
//! subtype and a 16-bit little-endian total length that includes the header) followed by its payload. The list is
//! closed by an end node.
//!
//! Only the nodes a boot entry for a file on a GPT partition needs are decoded: the hard drive media node, the file
//! path media node and the end node. Every other node is skipped and reported as
//! [`DevicePathNode::Unrecognized`] with a short tag for display.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
mod names;

pub use names::{node_tag, TYPE_ACPI, TYPE_BBS, TYPE_MESSAGING};

use alloc::{string::String, vec, vec::Vec};

use r_efi::{
    efi,
    protocols::device_path::{End, Media, TYPE_END, TYPE_MEDIA},
};
use scroll::{Pwrite, LE};
use uuid::Uuid;

use crate::{
    cursor::ByteCursor,
    error::{Error, Result},
    services::PartitionInfo,
    text,
};

/// Size of a device path node header.
pub const NODE_HEADER_SIZE: usize = 4;

/// Size of the payload of a hard drive media node.
pub const HARD_DRIVE_PAYLOAD_SIZE: usize = 38;

pub const PARTITION_FORMAT_MBR: u8 = 0x01;
pub const PARTITION_FORMAT_GPT: u8 = 0x02;

pub const SIGNATURE_TYPE_NONE: u8 = 0x00;
pub const SIGNATURE_TYPE_MBR: u8 = 0x01;
pub const SIGNATURE_TYPE_GUID: u8 = 0x02;

/// The header shared by every device path node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub node_type: u8,
    pub sub_type: u8,
    /// Total node length, header included.
    pub length: u16,
}

impl NodeHeader {
    fn read(cursor: &mut ByteCursor) -> Result<Self> {
        Ok(Self { node_type: cursor.take_u8()?, sub_type: cursor.take_u8()?, length: cursor.take_u16()? })
    }

    fn for_payload(node_type: u8, sub_type: u8, payload_length: usize) -> Result<Self> {
        let total = payload_length + NODE_HEADER_SIZE;
        let length = u16::try_from(total).map_err(|_| Error::NodeTooLong(total))?;
        Ok(Self { node_type, sub_type, length })
    }

    /// Length of the payload the header claims, zero for a header that claims less than itself.
    pub fn payload_length(&self) -> usize {
        usize::from(self.length).saturating_sub(NODE_HEADER_SIZE)
    }

    fn write_into(&self, buffer: &mut [u8], offset: &mut usize) -> core::result::Result<(), scroll::Error> {
        buffer.gwrite_with(self.node_type, offset, LE)?;
        buffer.gwrite_with(self.sub_type, offset, LE)?;
        buffer.gwrite_with(self.length, offset, LE)?;
        Ok(())
    }
}

/// A hard drive media device path node (type 4, subtype 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardDriveDevicePath {
    /// 1-based partition index.
    pub partition_number: u32,
    /// Starting LBA.
    pub partition_start: u64,
    /// Size in logical blocks.
    pub partition_size: u64,
    /// Partition signature. A GUID when `signature_type` is [`SIGNATURE_TYPE_GUID`].
    pub partition_signature: [u8; 16],
    pub partition_format: u8,
    pub signature_type: u8,
}

impl HardDriveDevicePath {
    /// Builds the node for a GPT partition identified by its unique partition GUID.
    pub fn gpt(partition: &PartitionInfo) -> Self {
        Self {
            partition_number: partition.partition_number,
            partition_start: partition.partition_start,
            partition_size: partition.partition_size,
            partition_signature: *partition.partition_guid.as_bytes(),
            partition_format: PARTITION_FORMAT_GPT,
            signature_type: SIGNATURE_TYPE_GUID,
        }
    }

    /// Decodes the payload of a hard drive media node.
    ///
    /// The payload must be exactly [`HARD_DRIVE_PAYLOAD_SIZE`] bytes and must describe a GPT partition by GUID.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() != HARD_DRIVE_PAYLOAD_SIZE {
            log::error!("Hard drive device path payload is {} bytes", payload.len());
            return Err(Error::MalformedHardDrive { length: payload.len() });
        }

        let mut cursor = ByteCursor::new(payload);
        let hard_drive = Self {
            partition_number: cursor.take_u32()?,
            partition_start: cursor.take_u64()?,
            partition_size: cursor.take_u64()?,
            partition_signature: cursor.take_array()?,
            partition_format: cursor.take_u8()?,
            signature_type: cursor.take_u8()?,
        };
        debug_assert!(cursor.is_empty());

        if hard_drive.signature_type != SIGNATURE_TYPE_GUID || hard_drive.partition_format != PARTITION_FORMAT_GPT {
            log::error!(
                "Only GPT is supported: partition format {}, signature type {}",
                hard_drive.partition_format,
                hard_drive.signature_type
            );
            return Err(Error::UnsupportedPartition {
                partition_format: hard_drive.partition_format,
                signature_type: hard_drive.signature_type,
            });
        }

        Ok(hard_drive)
    }

    /// The partition signature as a GUID, if the node says it is one.
    pub fn partition_guid(&self) -> Option<efi::Guid> {
        (self.signature_type == SIGNATURE_TYPE_GUID).then(|| efi::Guid::from_bytes(&self.partition_signature))
    }

    /// The partition signature as a UUID in its usual textual byte order.
    pub fn partition_uuid(&self) -> Option<Uuid> {
        (self.signature_type == SIGNATURE_TYPE_GUID).then(|| Uuid::from_bytes_le(self.partition_signature))
    }

    /// Encodes the complete node, header included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = NodeHeader::for_payload(TYPE_MEDIA, Media::SUBTYPE_HARDDRIVE, HARD_DRIVE_PAYLOAD_SIZE)?;
        let mut buffer = vec![0u8; usize::from(header.length)];
        let mut offset = 0;
        header.write_into(&mut buffer, &mut offset)?;
        buffer.gwrite_with(self.partition_number, &mut offset, LE)?;
        buffer.gwrite_with(self.partition_start, &mut offset, LE)?;
        buffer.gwrite_with(self.partition_size, &mut offset, LE)?;
        buffer.gwrite(&self.partition_signature[..], &mut offset)?;
        buffer.gwrite_with(self.partition_format, &mut offset, LE)?;
        buffer.gwrite_with(self.signature_type, &mut offset, LE)?;
        Ok(buffer)
    }
}

/// A file path media device path node (type 4, subtype 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePathDevicePath {
    /// The path as null-terminated UCS-2, relative to the device.
    pub device_path: Vec<u8>,
}

impl FilePathDevicePath {
    /// Builds the node for a device-relative path such as `\EFI\BOOT\BOOTX64.EFI`.
    pub fn new(path: &str) -> Self {
        Self { device_path: text::to_efi_text(path, true) }
    }

    /// The path as text.
    pub fn path(&self) -> String {
        text::from_efi_bytes(&self.device_path)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = NodeHeader::for_payload(TYPE_MEDIA, Media::SUBTYPE_FILE_PATH, self.device_path.len())?;
        let mut buffer = vec![0u8; usize::from(header.length)];
        let mut offset = 0;
        header.write_into(&mut buffer, &mut offset)?;
        buffer.gwrite(&self.device_path[..], &mut offset)?;
        Ok(buffer)
    }
}

/// The node that terminates an entire device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndDevicePath;

impl EndDevicePath {
    pub const BYTES: [u8; NODE_HEADER_SIZE] = [TYPE_END, End::SUBTYPE_ENTIRE, NODE_HEADER_SIZE as u8, 0x00];

    pub const fn to_bytes(&self) -> [u8; NODE_HEADER_SIZE] {
        Self::BYTES
    }
}

/// One decoded device path node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePathNode {
    HardDrive(HardDriveDevicePath),
    FilePath(FilePathDevicePath),
    /// Any end node, whether it closes an instance or the entire path.
    End,
    /// A node this crate does not interpret. Its payload has been skipped.
    Unrecognized {
        node_type: u8,
        sub_type: u8,
        tag: Option<&'static str>,
    },
    /// A node cut off by the end of the list. Its partial payload has been discarded.
    Truncated {
        node_type: u8,
        sub_type: u8,
    },
}

impl DevicePathNode {
    /// Interprets a node payload according to its header.
    pub fn decode(header: NodeHeader, payload: &[u8]) -> Result<Self> {
        match (header.node_type, header.sub_type) {
            (TYPE_MEDIA, Media::SUBTYPE_HARDDRIVE) => Ok(Self::HardDrive(HardDriveDevicePath::from_payload(payload)?)),
            (TYPE_MEDIA, Media::SUBTYPE_FILE_PATH) => {
                Ok(Self::FilePath(FilePathDevicePath { device_path: payload.to_vec() }))
            }
            (TYPE_END, _) => Ok(Self::End),
            (node_type, sub_type) => {
                Ok(Self::Unrecognized { node_type, sub_type, tag: node_tag(node_type, sub_type) })
            }
        }
    }

    /// Short tag describing this node in a device path description, `None` for end nodes.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::HardDrive(_) => node_tag(TYPE_MEDIA, Media::SUBTYPE_HARDDRIVE),
            Self::FilePath(_) => node_tag(TYPE_MEDIA, Media::SUBTYPE_FILE_PATH),
            Self::End => None,
            Self::Unrecognized { tag, .. } => *tag,
            Self::Truncated { node_type, sub_type } => node_tag(*node_type, *sub_type),
        }
    }
}

/// Iterates the nodes of an encoded device path list.
///
/// A node whose length runs past the end of the buffer is clamped to what is left: its remaining bytes are consumed
/// and discarded, it is reported as [`DevicePathNode::Truncated`], and iteration stops after it. Trailing bytes too short to hold a node header are discarded. After
/// a node fails to decode the parser yields nothing further.
pub struct DevicePathParser<'a> {
    cursor: ByteCursor<'a>,
}

impl<'a> DevicePathParser<'a> {
    pub const fn new(device_path_list: &'a [u8]) -> Self {
        Self { cursor: ByteCursor::new(device_path_list) }
    }

    /// Bytes of the list consumed so far.
    pub const fn consumed(&self) -> usize {
        self.cursor.consumed()
    }
}

impl Iterator for DevicePathParser<'_> {
    type Item = Result<DevicePathNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_empty() {
            return None;
        }

        if self.cursor.remaining() < NODE_HEADER_SIZE {
            let discarded = self.cursor.take_remaining();
            log::warn!("Discarding {} trailing bytes of device path list", discarded.len());
            return None;
        }

        let header = match NodeHeader::read(&mut self.cursor) {
            Ok(header) => header,
            Err(err) => return Some(Err(err)),
        };

        let wanted = header.payload_length();
        if wanted > self.cursor.remaining() {
            log::warn!(
                "Device path node {:#04x}/{:#04x} claims {} payload bytes, only {} remain",
                header.node_type,
                header.sub_type,
                wanted,
                self.cursor.remaining()
            );
            self.cursor.take_remaining();
            return Some(Ok(DevicePathNode::Truncated { node_type: header.node_type, sub_type: header.sub_type }));
        }

        let payload = match self.cursor.take_bytes(wanted) {
            Ok(payload) => payload,
            Err(err) => return Some(Err(err)),
        };

        let node = DevicePathNode::decode(header, payload);
        match &node {
            Ok(node) => log::debug!(
                "Device path node {:#04x}/{:#04x} ({} bytes): {}",
                header.node_type,
                header.sub_type,
                header.length,
                node.tag().unwrap_or("End")
            ),
            Err(_) => {
                self.cursor.take_remaining();
            }
        }
        Some(node)
    }
}

/// Encodes the device path list of a boot entry: a hard drive node, a file path node and an end node.
pub fn encode_device_path_list(hard_drive: &HardDriveDevicePath, file_path: &FilePathDevicePath) -> Result<Vec<u8>> {
    let mut list = hard_drive.to_bytes()?;
    list.extend_from_slice(&file_path.to_bytes()?);
    list.extend_from_slice(&EndDevicePath.to_bytes());
    if list.len() > usize::from(u16::MAX) {
        return Err(Error::DevicePathTooLong(list.len()));
    }
    Ok(list)
}
