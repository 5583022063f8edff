//! EFI_LOAD_OPTION
//!
//! The contents of a `Boot####` variable:
//!
//! ```text
//! offset  size  field
//! 0       4     attributes (LE)
//! 4       2     device path list length (LE)
//! 6       var   description (UCS-2, null-terminated)
//! ...     var   device path list, closed by an end node
//! ...     var   optional data (whatever is left, may be absent)
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::{string::String, vec::Vec};

use crate::{
    cursor::ByteCursor,
    device_path::{self, DevicePathNode, DevicePathParser, FilePathDevicePath, HardDriveDevicePath},
    error::{Error, Result},
    services::PartitionInfo,
    text,
};

/// The option is active and will be tried when booting.
pub const LOAD_OPTION_ACTIVE: u32 = 0x0000_0001;
/// The option is not shown in the firmware boot menu.
pub const LOAD_OPTION_HIDDEN: u32 = 0x0000_0008;

/// Attributes given to newly created options.
pub const DEFAULT_ATTRIBUTES: u32 = LOAD_OPTION_ACTIVE;

/// Punctuation allowed in a description in addition to ASCII letters, digits and space.
const DESCRIPTION_PUNCTUATION: &str = "+-=(),.!_\\";

/// Returns the first character of `description` that is not allowed in a load option description.
pub fn invalid_description_character(description: &str) -> Option<char> {
    description
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || c == ' ' || DESCRIPTION_PUNCTUATION.contains(c)))
}

/// True if every character of `description` is allowed in a load option description.
pub fn is_valid_description(description: &str) -> bool {
    invalid_description_character(description).is_none()
}

/// Converts a host path to a loader into a path relative to the root of its partition.
///
/// The mount point, if any, is removed, `/` becomes `\`, and the result starts with exactly one `\`.
pub fn device_relative_path(loader_path: &str, mount_point: Option<&str>) -> String {
    let mut relative = loader_path;
    if let Some(mount_point) = mount_point.map(|m| m.trim_end_matches('/')).filter(|m| !m.is_empty()) {
        if let Some(rest) = relative.strip_prefix(mount_point) {
            if rest.is_empty() || rest.starts_with('/') {
                relative = rest;
            }
        }
    }

    let relative = relative.replace('/', "\\");
    let mut path = String::with_capacity(relative.len() + 1);
    path.push('\\');
    path.push_str(relative.trim_start_matches('\\'));
    path
}

/// A firmware boot entry.
///
/// The raw `description`, `device_path_list` and `optional_data` fields are the single source of truth; the text
/// and flag accessors are derived from them on every call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOption {
    boot_number: Option<u16>,
    order: Option<usize>,
    attributes: u32,
    device_path_list_length: u16,
    description: Vec<u8>,
    device_path_list: Vec<u8>,
    optional_data: Option<Vec<u8>>,
    hard_drive: Option<HardDriveDevicePath>,
    loader_path: Option<FilePathDevicePath>,
    device_path_description: String,
}

impl LoadOption {
    /// Decodes the contents of a load option variable.
    ///
    /// With `details` false the device path list is kept as raw bytes and its nodes are not parsed, which is enough
    /// to list many entries. The option still re-encodes to the bytes it was decoded from.
    pub fn decode(bytes: &[u8], boot_number: Option<u16>, details: bool) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let mut option = Self {
            boot_number,
            attributes: cursor.take_u32()?,
            device_path_list_length: cursor.take_u16()?,
            ..Default::default()
        };

        option.description = read_description(&mut cursor);

        let wanted = usize::from(option.device_path_list_length);
        let device_path_list = if wanted > cursor.remaining() {
            log::warn!("Device path list length is {} but only {} bytes remain", wanted, cursor.remaining());
            cursor.take_remaining()
        } else {
            cursor.take_bytes(wanted)?
        };
        option.device_path_list = device_path_list.to_vec();
        if details {
            option.parse_device_path_list()?;
        }

        let rest = cursor.take_remaining();
        if !rest.is_empty() {
            option.optional_data = Some(rest.to_vec());
        }

        Ok(option)
    }

    /// Builds a new active option that boots `loader_path` from `partition`.
    ///
    /// `loader_path` may be a host path under the partition's mount point or already relative to the partition.
    /// `optional_data`, if given, is stored as UCS-2 without a terminator.
    pub fn new(
        loader_path: &str,
        description: &str,
        optional_data: Option<&str>,
        partition: &PartitionInfo,
    ) -> Result<Self> {
        log::info!("Using default attributes");
        let attributes = DEFAULT_ATTRIBUTES;

        log::info!("Generating description");
        if let Some(character) = invalid_description_character(description) {
            log::error!("Forbidden character {:?} found in description", character);
            return Err(Error::InvalidDescription { character });
        }
        let description = text::to_efi_text(description, true);

        log::info!("Generating device path list");
        let hard_drive = HardDriveDevicePath::gpt(partition);
        let relative_path = device_relative_path(loader_path, partition.mount_point.as_deref());
        log::debug!("Loader path on partition {}: {}", partition.partition_number, relative_path);
        let file_path = FilePathDevicePath::new(&relative_path);
        let device_path_list = device_path::encode_device_path_list(&hard_drive, &file_path)?;
        let device_path_list_length =
            u16::try_from(device_path_list.len()).map_err(|_| Error::DevicePathTooLong(device_path_list.len()))?;

        let optional_data = match optional_data {
            Some(data) => {
                log::info!("Generating optional data");
                Some(text::to_efi_text(data, false))
            }
            None => {
                log::info!("Not generating optional data, none specified");
                None
            }
        };

        let mut option = Self {
            attributes,
            device_path_list_length,
            description,
            device_path_list,
            optional_data,
            ..Default::default()
        };
        option.record_node(DevicePathNode::HardDrive(hard_drive));
        option.record_node(DevicePathNode::FilePath(file_path));
        option.record_node(DevicePathNode::End);
        Ok(option)
    }

    /// Replaces the attribute bits.
    pub fn with_attributes(mut self, attributes: u32) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_boot_number(mut self, boot_number: u16) -> Self {
        self.boot_number = Some(boot_number);
        self
    }

    /// Records the option's position in the boot order.
    pub fn with_order(mut self, order: Option<usize>) -> Self {
        self.order = order;
        self
    }

    fn parse_device_path_list(&mut self) -> Result<()> {
        let list = core::mem::take(&mut self.device_path_list);
        for node in DevicePathParser::new(&list) {
            self.record_node(node?);
        }
        self.device_path_list = list;
        Ok(())
    }

    fn record_node(&mut self, node: DevicePathNode) {
        if let Some(tag) = node.tag() {
            self.device_path_description.push('/');
            self.device_path_description.push_str(tag);
        }
        match node {
            DevicePathNode::HardDrive(hard_drive) => self.hard_drive = Some(hard_drive),
            DevicePathNode::FilePath(file_path) => self.loader_path = Some(file_path),
            DevicePathNode::End | DevicePathNode::Unrecognized { .. } | DevicePathNode::Truncated { .. } => {}
        }
    }

    /// Encodes the option as variable contents.
    pub fn to_bytes(&self) -> Vec<u8> {
        let optional_length = self.optional_data.as_ref().map_or(0, Vec::len);
        let mut data =
            Vec::with_capacity(6 + self.description.len() + self.device_path_list.len() + optional_length);
        data.extend_from_slice(&self.attributes.to_le_bytes());
        data.extend_from_slice(&self.device_path_list_length.to_le_bytes());
        data.extend_from_slice(&self.description);
        data.extend_from_slice(&self.device_path_list);
        if let Some(optional_data) = &self.optional_data {
            data.extend_from_slice(optional_data);
        }
        data
    }

    pub fn boot_number(&self) -> Option<u16> {
        self.boot_number
    }

    /// Zero-based position in the boot order, if the option is listed there.
    pub fn order(&self) -> Option<usize> {
        self.order
    }

    pub fn attributes(&self) -> u32 {
        self.attributes
    }

    pub fn device_path_list_length(&self) -> u16 {
        self.device_path_list_length
    }

    /// The raw description, UCS-2 with its terminator.
    pub fn description(&self) -> &[u8] {
        &self.description
    }

    pub fn device_path_list(&self) -> &[u8] {
        &self.device_path_list
    }

    pub fn optional_data(&self) -> Option<&[u8]> {
        self.optional_data.as_deref()
    }

    pub fn hard_drive(&self) -> Option<&HardDriveDevicePath> {
        self.hard_drive.as_ref()
    }

    pub fn loader_path(&self) -> Option<&FilePathDevicePath> {
        self.loader_path.as_ref()
    }

    /// One tag per decoded node, e.g. `/HD/File`.
    pub fn device_path_description(&self) -> &str {
        &self.device_path_description
    }

    pub fn enabled(&self) -> bool {
        self.attributes & LOAD_OPTION_ACTIVE != 0
    }

    pub fn hidden(&self) -> bool {
        self.attributes & LOAD_OPTION_HIDDEN != 0
    }

    pub fn description_string(&self) -> String {
        text::from_efi_bytes(&self.description)
    }

    pub fn loader_path_string(&self) -> Option<String> {
        self.loader_path.as_ref().map(FilePathDevicePath::path)
    }

    /// Optional data read as UCS-2 text. Meaningful only when the data is text, such as kernel arguments.
    pub fn optional_data_string(&self) -> Option<String> {
        self.optional_data.as_deref().map(text::from_efi_bytes)
    }

    pub fn optional_data_hex_view(&self) -> Option<String> {
        self.optional_data.as_deref().map(text::hex_ascii_view)
    }
}

/// Reads 16-bit units up to and including the first zero unit.
fn read_description(cursor: &mut ByteCursor) -> Vec<u8> {
    let mut description = Vec::new();
    while let Ok(unit) = cursor.take_u16() {
        description.extend_from_slice(&unit.to_le_bytes());
        if unit == 0 {
            break;
        }
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;

    use r_efi::efi;

    use crate::device_path::{EndDevicePath, NODE_HEADER_SIZE};

    const LOADER: &str = "\\EFI\\BOOT\\BOOTX64.EFI";

    fn esp() -> PartitionInfo {
        PartitionInfo {
            partition_number: 1,
            partition_start: 2048,
            partition_size: 1_048_576,
            partition_guid: efi::Guid::from_bytes(&[
                0x3D, 0x5E, 0x8A, 0x61, 0x2C, 0x4B, 0x4F, 0x47, 0x9A, 0x12, 0x6E, 0x1B, 0x0F, 0x2D, 0x7C, 0x90,
            ]),
            mount_point: Some(String::from("/boot/efi")),
        }
    }

    #[test]
    fn encoding_matches_the_firmware_layout() {
        let option = LoadOption::new(LOADER, "Test OS", None, &esp()).unwrap();
        let bytes = option.to_bytes();

        assert_eq!(&bytes[0..4], &[0x01, 0x00, 0x00, 0x00]);
        let list_length = u16::from_le_bytes([bytes[4], bytes[5]]);
        assert_eq!(
            &bytes[6..22],
            &[0x54, 0x00, 0x65, 0x00, 0x73, 0x00, 0x74, 0x00, 0x20, 0x00, 0x4F, 0x00, 0x53, 0x00, 0x00, 0x00]
        );

        let list = &bytes[22..];
        assert_eq!(usize::from(list_length), list.len());
        assert_eq!(list.len(), 42 + 48 + 4);
        assert_eq!(&list[..4], &[0x04, 0x01, 0x2A, 0x00]);
        assert_eq!(&list[42..46], &[0x04, 0x04, 0x30, 0x00]);
        assert_eq!(&list[list.len() - NODE_HEADER_SIZE..], &EndDevicePath::BYTES);
        assert_eq!(option.device_path_description(), "/HD/File");
    }

    #[test]
    fn decode_reverses_encode() {
        let option = LoadOption::new("/boot/efi/EFI/debian/grubx64.efi", "Debian", Some("quiet splash"), &esp())
            .unwrap()
            .with_attributes(LOAD_OPTION_ACTIVE | LOAD_OPTION_HIDDEN);
        let bytes = option.to_bytes();

        let decoded = LoadOption::decode(&bytes, Some(3), true).unwrap();
        assert_eq!(decoded.boot_number(), Some(3));
        assert_eq!(decoded.clone().with_order(None), option.clone().with_boot_number(3));
        assert_eq!(decoded.to_bytes(), bytes);
        assert_eq!(decoded.loader_path_string().as_deref(), Some("\\EFI\\debian\\grubx64.efi"));
        assert_eq!(decoded.optional_data_string().as_deref(), Some("quiet splash"));
        assert_eq!(decoded.hard_drive().unwrap().partition_guid(), Some(esp().partition_guid));
        assert!(decoded.enabled());
        assert!(decoded.hidden());
    }

    #[test]
    fn invalid_description_is_rejected_before_encoding() {
        assert_eq!(
            LoadOption::new(LOADER, "Bad/Name", None, &esp()),
            Err(Error::InvalidDescription { character: '/' })
        );
        assert!(!is_valid_description("Linux: 6.1"));
        assert!(is_valid_description("Windows Boot Manager (2), v1.0_a+b=c!\\"));
    }

    #[test]
    fn summary_decode_skips_the_device_path_nodes() {
        let bytes = LoadOption::new(LOADER, "Test OS", Some("x"), &esp()).unwrap().to_bytes();
        let summary = LoadOption::decode(&bytes, Some(1), false).unwrap();

        assert_eq!(summary.description_string(), "Test OS");
        assert_eq!(summary.device_path_list_length(), 94);
        assert_eq!(summary.device_path_list().len(), 94);
        assert_eq!(summary.optional_data_string().as_deref(), Some("x"));
        assert_eq!(summary.hard_drive(), None);
        assert_eq!(summary.loader_path(), None);
        assert_eq!(summary.device_path_description(), "");
    }

    #[test]
    fn summary_decode_re_encodes_to_the_same_bytes() {
        let bytes = LoadOption::new(LOADER, "Test OS", None, &esp()).unwrap().to_bytes();
        let summary = LoadOption::decode(&bytes, None, false).unwrap();

        assert_eq!(summary.to_bytes(), bytes);
        assert_eq!(
            usize::from(u16::from_le_bytes([bytes[4], bytes[5]])),
            summary.to_bytes().len() - 6 - summary.description().len()
        );
    }

    #[test]
    fn attribute_bits_drive_enabled_and_hidden() {
        for attributes in [0x0, 0x1, 0x8, 0x9, 0xFFFF_FFFF, 0xFFFF_FFF6, 0x0000_0100] {
            let option = LoadOption::default().with_attributes(attributes);
            assert_eq!(option.enabled(), attributes & 0x1 != 0);
            assert_eq!(option.hidden(), attributes & 0x8 != 0);
        }
    }

    #[test]
    fn mbr_partition_fails_the_whole_decode() {
        let mut bytes = LoadOption::new(LOADER, "Test OS", None, &esp()).unwrap().to_bytes();
        // partition format and signature type are the last two bytes of the hard drive node
        let hard_drive_end = 22 + 42;
        bytes[hard_drive_end - 2] = 0x01;
        bytes[hard_drive_end - 1] = 0x01;

        assert_eq!(
            LoadOption::decode(&bytes, None, true),
            Err(Error::UnsupportedPartition { partition_format: 1, signature_type: 1 })
        );
        assert!(LoadOption::decode(&bytes, None, false).is_ok());
    }

    #[test]
    fn unrecognized_nodes_are_tagged_and_skipped() {
        let mut list = vec![
            0x02, //ACPI
            0x01, //ACPI_DP
            0x0C, //length[0]
            0x00, //length[1]
            0xD0, 0x41, 0x03, 0x0A, //HID
            0x00, 0x00, 0x00, 0x00, //UID
        ];
        list.extend_from_slice(&FilePathDevicePath::new("\\shell.efi").to_bytes().unwrap());
        list.extend_from_slice(&EndDevicePath::BYTES);

        let mut bytes = vec![0x01, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&(list.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&text::to_efi_text("Shell", true));
        bytes.extend_from_slice(&list);

        let option = LoadOption::decode(&bytes, None, true).unwrap();
        assert_eq!(option.device_path_description(), "/Acpi/File");
        assert_eq!(option.loader_path_string().as_deref(), Some("\\shell.efi"));
        assert_eq!(option.hard_drive(), None);
        assert_eq!(option.optional_data(), None);
        assert_eq!(option.to_bytes(), bytes);
    }

    #[test]
    fn truncated_device_path_list_is_clamped() {
        let mut bytes = vec![0x01, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&0x40u16.to_le_bytes());
        bytes.extend_from_slice(&text::to_efi_text("PXE", true));
        bytes.extend_from_slice(&[
            0x03, //MESSAGING
            0x0B, //MAC
            0x25, //length[0]
            0x00, //length[1]
            0x52, 0x54, 0x00, 0x12, 0x34, 0x56,
        ]);

        let option = LoadOption::decode(&bytes, None, true).unwrap();
        assert_eq!(option.device_path_description(), "/MAC");
        assert_eq!(option.device_path_list().len(), 10);
        assert_eq!(option.optional_data(), None);
    }

    #[test]
    fn list_cut_inside_the_hard_drive_node_is_tagged() {
        let bytes = LoadOption::new(LOADER, "Test OS", None, &esp()).unwrap().to_bytes();
        // attributes, list length, description, then the first 20 bytes of the hard drive node
        let truncated = &bytes[..22 + 20];

        let option = LoadOption::decode(truncated, None, true).unwrap();
        assert_eq!(option.device_path_description(), "/HD");
        assert_eq!(option.hard_drive(), None);
        assert_eq!(option.loader_path(), None);
        assert_eq!(option.device_path_list().len(), 20);
        assert_eq!(option.optional_data(), None);
    }

    #[test]
    fn trailing_binary_data_is_kept_as_optional_data() {
        let mut bytes = LoadOption::new(LOADER, "Test OS", None, &esp()).unwrap().to_bytes();
        bytes.extend_from_slice(&[0x41, 0x00, 0x0A, 0x00, 0xFF]);

        let option = LoadOption::decode(&bytes, None, true).unwrap();
        assert_eq!(option.optional_data(), Some(&[0x41, 0x00, 0x0A, 0x00, 0xFF][..]));
        assert_eq!(option.optional_data_string().as_deref(), Some("A\n"));
        assert_eq!(option.optional_data_hex_view().unwrap(), format!("0041 000a ff   {}A ", " ".repeat(25)));
    }

    #[test]
    fn short_buffers_are_reported() {
        assert_eq!(
            LoadOption::decode(&[0x01, 0x00, 0x00], None, false),
            Err(Error::BufferTooSmall { needed: 4, remaining: 3 })
        );

        let option = LoadOption::decode(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00], None, true).unwrap();
        assert!(option.description().is_empty());
        assert_eq!(option.device_path_description(), "");
    }

    #[test]
    fn device_relative_paths_are_normalized() {
        let expected = "\\EFI\\arch\\grubx64.efi";
        assert_eq!(device_relative_path("/boot/efi/EFI/arch/grubx64.efi", Some("/boot/efi")), expected);
        assert_eq!(device_relative_path("/boot/efi/EFI/arch/grubx64.efi", Some("/boot/efi/")), expected);
        assert_eq!(device_relative_path("/boot/efiextra/x.efi", Some("/boot/efi")), "\\boot\\efiextra\\x.efi");
        assert_eq!(device_relative_path("EFI/BOOT/BOOTX64.EFI", None), "\\EFI\\BOOT\\BOOTX64.EFI");
        assert_eq!(device_relative_path(LOADER, Some("/")), LOADER);
    }
}
