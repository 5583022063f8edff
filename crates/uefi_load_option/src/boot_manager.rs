//! Boot entry management on top of a [`VariableStore`].
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::{format, string::String, vec::Vec};

use r_efi::efi;

use crate::{
    boot_order::BootOrder,
    error::Result,
    load_option::LoadOption,
    services::{BootOrderSource, PartitionResolver, VariableStore},
};

pub const BOOT_ORDER_VARIABLE: &str = "BootOrder";

/// Name of the variable that holds load option `boot_number`, e.g. `Boot000A`.
pub fn boot_variable_name(boot_number: u16) -> String {
    format!("Boot{boot_number:04X}")
}

pub struct BootManager<'a, V: VariableStore> {
    store: &'a V,
}

impl<'a, V: VariableStore> BootManager<'a, V> {
    pub const fn new(store: &'a V) -> Self {
        Self { store }
    }

    /// Reads the boot order. A missing `BootOrder` variable is an empty order.
    pub fn boot_order(&self) -> Result<BootOrder> {
        match self.store.get_variable(BOOT_ORDER_VARIABLE) {
            Ok(bytes) => Ok(BootOrder::from_bytes(&bytes)),
            Err(efi::Status::NOT_FOUND) => Ok(BootOrder::default()),
            Err(status) => Err(status.into()),
        }
    }

    fn set_boot_order(&self, order: &BootOrder) -> Result<()> {
        self.store.set_variable(BOOT_ORDER_VARIABLE, &order.to_bytes())?;
        Ok(())
    }

    /// Reads and decodes one load option, filling in its position in `order`.
    pub fn load_option(&self, boot_number: u16, details: bool, order: &impl BootOrderSource) -> Result<LoadOption> {
        let name = boot_variable_name(boot_number);
        let bytes = self.store.get_variable(&name).inspect_err(|status| {
            log::error!("Failed to read {}: {:?}", name, status);
        })?;
        Ok(LoadOption::decode(&bytes, Some(boot_number), details)?.with_order(order.position_of(boot_number)))
    }

    /// Decodes every option listed in the boot order, in boot order.
    pub fn list(&self, details: bool) -> Result<Vec<LoadOption>> {
        let order = self.boot_order()?;
        order.iter().map(|boot_number| self.load_option(boot_number, details, &order)).collect()
    }

    /// Creates a load option for `loader_path`, stores it under an unused boot number and appends that number to
    /// the boot order.
    pub fn create(
        &self,
        loader_path: &str,
        description: &str,
        optional_data: Option<&str>,
        resolver: &impl PartitionResolver,
    ) -> Result<u16> {
        let partition = resolver.resolve_partition(loader_path)?;
        let option = LoadOption::new(loader_path, description, optional_data, &partition)?;
        self.add(&option)
    }

    /// Stores an already built option under an unused boot number and appends that number to the boot order.
    pub fn add(&self, option: &LoadOption) -> Result<u16> {
        let mut order = self.boot_order()?;
        let boot_number = self.unused_boot_number(&order)?;
        log::info!("Creating {}", boot_variable_name(boot_number));

        self.store.set_variable(&boot_variable_name(boot_number), &option.to_bytes())?;
        order.push(boot_number);
        self.set_boot_order(&order)?;
        Ok(boot_number)
    }

    /// Removes `boot_number` from the boot order and deletes its variable.
    pub fn delete(&self, boot_number: u16) -> Result<()> {
        let mut order = self.boot_order()?;
        if order.remove(boot_number) {
            self.set_boot_order(&order)?;
        }
        log::info!("Deleting {}", boot_variable_name(boot_number));
        self.store.set_variable(&boot_variable_name(boot_number), &[])?;
        Ok(())
    }

    /// Moves the entry at zero-based position `from` to position `to` in the boot order.
    pub fn reorder(&self, from: usize, to: usize) -> Result<BootOrder> {
        let mut order = self.boot_order()?;
        if order.move_entry(from, to).is_none() {
            log::error!("Cannot move boot order entry {} to {}, order has {} entries", from, to, order.len());
            return Err(efi::Status::INVALID_PARAMETER.into());
        }
        self.set_boot_order(&order)?;
        Ok(order)
    }

    fn unused_boot_number(&self, order: &BootOrder) -> Result<u16> {
        for boot_number in 0..=u16::MAX {
            if order.contains(boot_number) {
                continue;
            }
            match self.store.get_variable(&boot_variable_name(boot_number)) {
                Err(efi::Status::NOT_FOUND) => return Ok(boot_number),
                Err(status) => return Err(status.into()),
                Ok(_) => continue,
            }
        }
        Err(efi::Status::OUT_OF_RESOURCES.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockall::predicate::eq;

    use crate::{
        error::Error,
        load_option::LOAD_OPTION_HIDDEN,
        services::{MockPartitionResolver, MockVariableStore, PartitionInfo},
    };

    fn partition() -> PartitionInfo {
        PartitionInfo {
            partition_number: 2,
            partition_start: 4096,
            partition_size: 204800,
            partition_guid: efi::Guid::from_bytes(&[0x11; 16]),
            mount_point: Some(String::from("/efi")),
        }
    }

    fn stored_option(description: &str) -> Vec<u8> {
        LoadOption::new("/efi/EFI/BOOT/BOOTX64.EFI", description, None, &partition()).unwrap().to_bytes()
    }

    #[test]
    fn variable_names_are_four_uppercase_hex_digits() {
        assert_eq!(boot_variable_name(0), "Boot0000");
        assert_eq!(boot_variable_name(0x1A), "Boot001A");
        assert_eq!(boot_variable_name(0xFFFF), "BootFFFF");
    }

    #[test]
    fn list_follows_the_boot_order() {
        let mut store = MockVariableStore::new();
        store.expect_get_variable().with(eq(BOOT_ORDER_VARIABLE)).returning(|_| Ok(vec![0x02, 0x00, 0x00, 0x00]));
        store.expect_get_variable().with(eq("Boot0002")).returning(|_| Ok(stored_option("Second")));
        store.expect_get_variable().with(eq("Boot0000")).returning(|_| Ok(stored_option("First")));

        let options = BootManager::new(&store).list(false).unwrap();

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].description_string(), "Second");
        assert_eq!(options[0].boot_number(), Some(2));
        assert_eq!(options[0].order(), Some(0));
        assert_eq!(options[1].description_string(), "First");
        assert_eq!(options[1].order(), Some(1));
        assert!(options[1].hard_drive().is_none());
    }

    #[test]
    fn load_option_decodes_details_on_request() {
        let mut store = MockVariableStore::new();
        store.expect_get_variable().with(eq("Boot0005")).returning(|_| Ok(stored_option("Linux")));

        let option = BootManager::new(&store).load_option(5, true, &BootOrder::default()).unwrap();
        assert_eq!(option.order(), None);
        assert_eq!(option.device_path_description(), "/HD/File");
        assert_eq!(option.loader_path_string().as_deref(), Some("\\EFI\\BOOT\\BOOTX64.EFI"));
        assert_eq!(option.hard_drive().unwrap().partition_number, 2);
    }

    #[test]
    fn missing_variable_is_an_error() {
        let mut store = MockVariableStore::new();
        store.expect_get_variable().returning(|_| Err(efi::Status::NOT_FOUND));

        let manager = BootManager::new(&store);
        assert_eq!(manager.boot_order(), Ok(BootOrder::default()));
        assert_eq!(
            manager.load_option(1, false, &BootOrder::default()),
            Err(Error::Efi(efi::Status::NOT_FOUND))
        );
    }

    #[test]
    fn create_uses_the_lowest_free_number() {
        let mut store = MockVariableStore::new();
        store.expect_get_variable().with(eq(BOOT_ORDER_VARIABLE)).returning(|_| Ok(vec![0x00, 0x00]));
        store.expect_get_variable().with(eq("Boot0001")).returning(|_| Ok(stored_option("Orphan")));
        store.expect_get_variable().with(eq("Boot0002")).returning(|_| Err(efi::Status::NOT_FOUND));
        store
            .expect_set_variable()
            .withf(|name, data| {
                name == "Boot0002" && LoadOption::decode(data, None, true).unwrap().description_string() == "Ubuntu"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_variable()
            .withf(|name, data| name == BOOT_ORDER_VARIABLE && data == [0x00, 0x00, 0x02, 0x00])
            .times(1)
            .returning(|_, _| Ok(()));

        let mut resolver = MockPartitionResolver::new();
        resolver
            .expect_resolve_partition()
            .with(eq("/efi/EFI/ubuntu/shimx64.efi"))
            .returning(|_| Ok(partition()));

        let boot_number =
            BootManager::new(&store).create("/efi/EFI/ubuntu/shimx64.efi", "Ubuntu", None, &resolver).unwrap();
        assert_eq!(boot_number, 2);
    }

    #[test]
    fn add_keeps_the_attributes_of_the_option() {
        let mut store = MockVariableStore::new();
        store.expect_get_variable().with(eq(BOOT_ORDER_VARIABLE)).returning(|_| Err(efi::Status::NOT_FOUND));
        store.expect_get_variable().with(eq("Boot0000")).returning(|_| Err(efi::Status::NOT_FOUND));
        store
            .expect_set_variable()
            .withf(|name, data| name == "Boot0000" && LoadOption::decode(data, None, false).unwrap().hidden())
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_variable()
            .withf(|name, data| name == BOOT_ORDER_VARIABLE && data == [0x00, 0x00])
            .times(1)
            .returning(|_, _| Ok(()));

        let option = LoadOption::new("/efi/EFI/BOOT/BOOTX64.EFI", "Recovery", None, &partition())
            .unwrap()
            .with_attributes(LOAD_OPTION_HIDDEN);
        assert_eq!(BootManager::new(&store).add(&option), Ok(0));
    }

    #[test]
    fn create_rejects_a_bad_description_without_writing() {
        let mut store = MockVariableStore::new();
        store.expect_set_variable().never();

        let mut resolver = MockPartitionResolver::new();
        resolver.expect_resolve_partition().returning(|_| Ok(partition()));

        assert_eq!(
            BootManager::new(&store).create("/efi/EFI/x.efi", "Bad/Name", None, &resolver),
            Err(Error::InvalidDescription { character: '/' })
        );
    }

    #[test]
    fn delete_removes_from_order_and_store() {
        let mut store = MockVariableStore::new();
        store.expect_get_variable().with(eq(BOOT_ORDER_VARIABLE)).returning(|_| Ok(vec![0x01, 0x00, 0x03, 0x00]));
        store
            .expect_set_variable()
            .withf(|name, data| name == BOOT_ORDER_VARIABLE && data == [0x03, 0x00])
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_variable()
            .withf(|name, data| name == "Boot0001" && data.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        assert_eq!(BootManager::new(&store).delete(1), Ok(()));
    }

    #[test]
    fn reorder_rewrites_the_boot_order() {
        let mut store = MockVariableStore::new();
        store
            .expect_get_variable()
            .with(eq(BOOT_ORDER_VARIABLE))
            .returning(|_| Ok(vec![0x01, 0x00, 0x02, 0x00, 0x03, 0x00]));
        store
            .expect_set_variable()
            .withf(|name, data| name == BOOT_ORDER_VARIABLE && data == [0x03, 0x00, 0x01, 0x00, 0x02, 0x00])
            .times(1)
            .returning(|_, _| Ok(()));

        let manager = BootManager::new(&store);
        assert_eq!(manager.reorder(2, 0).unwrap().entries(), &[3, 1, 2]);
        assert_eq!(manager.reorder(3, 0), Err(Error::Efi(efi::Status::INVALID_PARAMETER)));
    }
}
