//! UEFI Load Option Utilities
//!
//! This library encodes and decodes `EFI_LOAD_OPTION` structures, the contents of the `Boot####` firmware
//! variables that make up the firmware boot menu, together with the device path nodes embedded in them.
//!
//! ## Examples
//!
//! ```
//! use r_efi::efi;
//! use uefi_load_option::{load_option::LoadOption, services::PartitionInfo};
//!
//! let esp = PartitionInfo {
//!     partition_number: 1,
//!     partition_start: 2048,
//!     partition_size: 1_048_576,
//!     partition_guid: efi::Guid::from_bytes(&[0x5A; 16]),
//!     mount_point: None,
//! };
//!
//! let option = LoadOption::new("\\EFI\\BOOT\\BOOTX64.EFI", "Test OS", None, &esp).unwrap();
//! let bytes = option.to_bytes();
//!
//! let decoded = LoadOption::decode(&bytes, Some(1), true).unwrap();
//! assert_eq!(decoded.description_string(), "Test OS");
//! assert_eq!(decoded.device_path_description(), "/HD/File");
//! assert!(decoded.enabled());
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![cfg_attr(all(not(test), not(feature = "std"), not(feature = "mockall")), no_std)]

extern crate alloc;

pub mod boot_manager;
pub mod boot_order;
pub mod cursor;
pub mod device_path;
pub mod error;
pub mod load_option;
pub mod services;
pub mod text;

pub use error::{Error, Result};
pub use load_option::LoadOption;
