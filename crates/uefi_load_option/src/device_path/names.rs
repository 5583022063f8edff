//! Short tags for device path nodes this crate does not decode.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use r_efi::protocols::device_path::{TYPE_END, TYPE_HARDWARE, TYPE_MEDIA};

pub const TYPE_ACPI: u8 = 0x02;
pub const TYPE_MESSAGING: u8 = 0x03;
pub const TYPE_BBS: u8 = 0x05;

/// Returns the tag appended to a device path description for a node of the given type and subtype.
///
/// End nodes have no tag. Unknown subtypes of a known type get a per-type `*_UNKNOWN` tag.
pub fn node_tag(node_type: u8, sub_type: u8) -> Option<&'static str> {
    let tag = match node_type {
        TYPE_HARDWARE => hardware_tag(sub_type).unwrap_or("HW_UNKNOWN"),
        TYPE_ACPI => acpi_tag(sub_type).unwrap_or("ACPI_UNKNOWN"),
        TYPE_MESSAGING => messaging_tag(sub_type).unwrap_or("MSG_UNKNOWN"),
        TYPE_MEDIA => media_tag(sub_type).unwrap_or("MEDIA_UNKNOWN"),
        TYPE_BBS => "BIOS",
        TYPE_END => return None,
        _ => "UNKNOWN_DP_TYPE",
    };
    Some(tag)
}

fn hardware_tag(sub_type: u8) -> Option<&'static str> {
    Some(match sub_type {
        0x01 => "Pci",
        0x02 => "PcCard",
        0x03 => "MemoryMapped",
        0x04 => "VenHw",
        0x05 => "Ctrl",
        0x06 => "BMC",
        _ => return None,
    })
}

fn acpi_tag(sub_type: u8) -> Option<&'static str> {
    Some(match sub_type {
        0x01 => "Acpi",
        0x02 => "AcpiEx",
        0x03 => "AcpiAdr",
        0x04 => "NVDIMM",
        _ => return None,
    })
}

fn messaging_tag(sub_type: u8) -> Option<&'static str> {
    Some(match sub_type {
        0x01 => "Ata",
        0x02 => "Scsi",
        0x03 => "Fibre",
        0x04 => "I1394",
        0x05 => "USB",
        0x06 => "I2O",
        0x09 => "Infiniband",
        0x0A => "VenMsg",
        0x0B => "MAC",
        0x0C => "IPv4",
        0x0D => "IPv6",
        0x0E => "Uart",
        0x0F => "UsbClass",
        0x10 => "UsbWwid",
        0x11 => "Unit",
        0x12 => "Sata",
        0x13 => "iSCSI",
        0x14 => "Vlan",
        0x15 => "FibreEx",
        0x16 => "SasEx",
        0x17 => "NVMe",
        0x18 => "Uri",
        0x19 => "UFS",
        0x1A => "SD",
        0x1B => "Bluetooth",
        0x1C => "Wi-Fi",
        0x1D => "eMMC",
        0x1E => "BluetoothLE",
        0x1F => "Dns",
        0x20 => "NVDIMMNamespace",
        0x21 => "RestService",
        0x22 => "NVMEoF",
        _ => return None,
    })
}

fn media_tag(sub_type: u8) -> Option<&'static str> {
    Some(match sub_type {
        0x01 => "HD",
        0x02 => "CDROM",
        0x03 => "VenMedia",
        0x04 => "File",
        0x05 => "Media",
        0x06 => "FvFile",
        0x07 => "Fv",
        0x08 => "Offset",
        0x09 => "RamDisk",
        _ => return None,
    })
}
