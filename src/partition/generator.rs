use tracing::info;

use super::consts::FLASH_SECTOR_SIZE;
use super::item::{
    encode_entry,
    encode_namespace,
};
use super::writer::PartitionWriter;
use crate::error::Error;
use crate::NvsPartition;

/// Generate an NVS partition binary in memory and return it as a `Vec<u8>`.
///
/// `size` must be a non-zero multiple of 4096 (the ESP-IDF flash sector size).
/// The namespace record always occupies the first slot of the first page;
/// entries follow in insertion order and every untouched byte stays `0xFF`.
pub(crate) fn generate_partition_data(
    partition: &NvsPartition,
    size: usize,
) -> Result<Vec<u8>, Error> {
    if size == 0 || !size.is_multiple_of(FLASH_SECTOR_SIZE) {
        return Err(Error::MisalignedPartitionSize(size));
    }

    let mut writer = PartitionWriter::new(size)?;
    let namespace = &partition.namespace;

    writer.write_item(&encode_namespace(namespace)?)?;

    for entry in &partition.entries {
        for item in encode_entry(namespace.index(), &entry.key, &entry.value)? {
            writer.write_item(&item)?;
        }
    }

    info!(
        namespace = namespace.name(),
        entries = partition.entries.len(),
        pages_used = writer.pages_used(),
        pages = size / FLASH_SECTOR_SIZE,
        "generated partition image"
    );

    writer.finish()
}
