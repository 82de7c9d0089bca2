//! Provisioning of ESP32 devices through ESP-IDF compatible NVS partition
//! images.
//!
//! A [`DeviceConfig`] (device name, Wi-Fi networks, MQTT broker and topics,
//! API endpoints) is mapped onto the `device_cfg` namespace and encoded into a
//! byte-exact NVS partition that can be flashed without first-run setup.

pub mod config;
pub mod error;
pub mod flash;
pub mod partition;

mod csv;

use std::fs;
use std::io::Write;
use std::path::Path;

pub use config::DeviceConfig;
pub use error::Error;
pub use partition::{
    DataValue,
    ItemType,
    Namespace,
    NvsEntry,
    PageState,
    DEFAULT_NAMESPACE,
    FLASH_SECTOR_SIZE,
    MAX_KEY_LENGTH,
    MAX_STRING_SIZE,
};

/// Default partition size, matching the `nvs` entry of the 16MB partition table.
pub const DEFAULT_PARTITION_SIZE: usize = 0x5000;

/// An ordered set of key-value entries living in a single namespace.
///
/// Keys are validated and checked for uniqueness on insertion, so a partition
/// that was built successfully only fails to generate when it does not fit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NvsPartition {
    /// The namespace all entries belong to.
    pub namespace: Namespace,
    /// The ordered list of entries in this partition.
    pub entries: Vec<NvsEntry>,
}

impl NvsPartition {
    /// Create an empty partition using the [`DEFAULT_NAMESPACE`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: Namespace) -> Self {
        Self {
            namespace,
            entries: Vec::new(),
        }
    }

    /// Map a device configuration onto its entries.
    pub fn from_config(config: &DeviceConfig) -> Result<Self, Error> {
        config.to_partition()
    }

    /// Append an entry.
    ///
    /// Fails with [`Error::KeyTooLong`], [`Error::ValueTooLong`] or
    /// [`Error::DuplicateKey`].
    pub fn push(&mut self, key: impl Into<String>, value: DataValue) -> Result<(), Error> {
        let entry = NvsEntry::new(key, value)?;
        if self.entries.iter().any(|e| e.key == entry.key) {
            return Err(Error::DuplicateKey(entry.key));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Generate an NVS partition binary in memory.
    ///
    /// `size` must be a multiple of 4096 (the ESP-IDF flash sector size).
    pub fn generate_partition(&self, size: usize) -> Result<Vec<u8>, Error> {
        partition::generator::generate_partition_data(self, size)
    }

    /// Generate an NVS partition binary and write it to `path`.
    ///
    /// Nothing is written when generation fails.
    pub fn generate_partition_file<P: AsRef<Path>>(
        &self,
        path: P,
        size: usize,
    ) -> Result<(), Error> {
        let data = self.generate_partition(size)?;
        fs::File::create(path)?.write_all(&data)?;
        Ok(())
    }

    /// Serialize this partition as `nvs_partition_gen` CSV and return the
    /// content as a `String`.
    pub fn to_csv(&self) -> Result<String, Error> {
        csv::writer::write_csv_content(self)
    }

    /// Serialize this partition as `nvs_partition_gen` CSV to `path`.
    ///
    /// The namespace row comes first, entries follow in insertion order.
    /// `Binary` values are serialized as base64.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        csv::writer::write_csv(self, path)
    }
}
