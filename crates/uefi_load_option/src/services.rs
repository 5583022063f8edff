//! Interfaces to the collaborators a load option depends on.
//!
//! Reading and writing firmware variables, finding the partition that backs a loader file, and looking up the boot
//! order are all provided from outside this crate. The traits here are the seams; [`crate::boot_manager`] drives
//! them.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;

use alloc::{string::String, vec::Vec};

use r_efi::efi;

/// Location of a GPT partition as recorded in a hard drive media device path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    /// 1-based index of the partition in the partition table.
    pub partition_number: u32,
    /// Starting LBA of the partition.
    pub partition_start: u64,
    /// Size of the partition in logical blocks.
    pub partition_size: u64,
    /// Unique partition GUID from the GPT entry.
    pub partition_guid: efi::Guid,
    /// Where the partition is mounted on the host, if anywhere. Stripped from loader paths.
    pub mount_point: Option<String>,
}

#[cfg_attr(any(test, feature = "mockall"), automock)]
/// Key/value access to firmware variables in the global variable namespace.
pub trait VariableStore {
    /// Returns the contents of the variable `name`.
    ///
    /// A variable that does not exist is reported as [`efi::Status::NOT_FOUND`].
    fn get_variable(&self, name: &str) -> Result<Vec<u8>, efi::Status>;

    /// Replaces the contents of the variable `name`. Empty `data` deletes the variable.
    fn set_variable(&self, name: &str, data: &[u8]) -> Result<(), efi::Status>;
}

#[cfg_attr(any(test, feature = "mockall"), automock)]
/// Finds the partition that holds a loader file.
pub trait PartitionResolver {
    fn resolve_partition(&self, loader_path: &str) -> Result<PartitionInfo, efi::Status>;
}

#[cfg_attr(any(test, feature = "mockall"), automock)]
/// Position lookups in the firmware boot order.
pub trait BootOrderSource {
    /// Zero-based position of `boot_number` in the boot order, if it is listed.
    fn position_of(&self, boot_number: u16) -> Option<usize>;
}

/// A resolver that answers every lookup with the same partition.
///
/// Used when the partition has already been identified, for example from the command line.
#[derive(Debug, Clone)]
pub struct FixedPartition(pub PartitionInfo);

impl PartitionResolver for FixedPartition {
    fn resolve_partition(&self, loader_path: &str) -> Result<PartitionInfo, efi::Status> {
        log::debug!("Using partition {} for {}", self.0.partition_number, loader_path);
        Ok(self.0.clone())
    }
}
