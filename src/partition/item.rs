use tracing::debug;

use super::consts::*;
use super::crc::{
    crc32,
    crc32_entry,
};
use super::{
    validate_key,
    validate_value,
    DataValue,
    Namespace,
};
use crate::error::Error;

/// One item as it lands on flash: a 32-byte descriptor followed by the raw
/// payload of its data entries. Everything in an item shares a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Item {
    pub(crate) header: [u8; ENTRY_SIZE],
    pub(crate) payload: Vec<u8>,
}

impl Item {
    /// Number of entry slots this item occupies, descriptor included.
    pub(crate) fn span(&self) -> usize {
        1 + self.payload.len().div_ceil(ENTRY_SIZE)
    }
}

/// Encode the record announcing `namespace` and its index.
pub(crate) fn encode_namespace(namespace: &Namespace) -> Result<Item, Error> {
    let mut data = [ERASED; 8];
    data[0] = namespace.index();
    let header = build_header(0, ItemType::U8, 1, CHUNK_ANY, namespace.name(), &data)?;
    Ok(Item {
        header,
        payload: Vec::new(),
    })
}

/// Encode one logical entry into the items that represent it on flash.
///
/// Primitives and strings produce a single item. Blobs produce a BLOB_INDEX
/// item followed by one BLOB_DATA item per chunk of up to 4000 bytes.
pub(crate) fn encode_entry(
    namespace_index: u8,
    key: &str,
    value: &DataValue,
) -> Result<Vec<Item>, Error> {
    validate_key(key)?;
    validate_value(key, value)?;

    let items = match value {
        DataValue::U8(_) | DataValue::U16(_) | DataValue::U32(_) => {
            vec![encode_primitive(namespace_index, key, value)?]
        }
        DataValue::String(s) => {
            let mut bytes = s.as_bytes().to_vec();

            // ESP-IDF stores strings with a null terminator included in the size
            bytes.push(0);

            vec![encode_sized(
                namespace_index,
                ItemType::Sized,
                CHUNK_ANY,
                key,
                bytes,
            )?]
        }
        DataValue::Binary(b) => encode_blob(namespace_index, key, b)?,
    };

    debug!(
        key,
        item_type = %value.item_type(),
        items = items.len(),
        "encoded entry"
    );

    Ok(items)
}

fn encode_primitive(namespace_index: u8, key: &str, value: &DataValue) -> Result<Item, Error> {
    let mut data = [ERASED; 8];
    match value {
        DataValue::U8(v) => data[0] = *v,
        DataValue::U16(v) => data[..2].copy_from_slice(&v.to_le_bytes()),
        DataValue::U32(v) => data[..4].copy_from_slice(&v.to_le_bytes()),
        _ => unreachable!("encode_primitive called with non-primitive DataValue"),
    }

    let header = build_header(namespace_index, value.item_type(), 1, CHUNK_ANY, key, &data)?;
    Ok(Item {
        header,
        payload: Vec::new(),
    })
}

fn encode_sized(
    namespace_index: u8,
    item_type: ItemType,
    chunk_index: u8,
    key: &str,
    bytes: Vec<u8>,
) -> Result<Item, Error> {
    let span = 1 + bytes.len().div_ceil(ENTRY_SIZE);
    let span = u8::try_from(span)
        .ok()
        .filter(|&s| s as usize <= ENTRIES_PER_PAGE)
        .ok_or_else(|| Error::ValueTooLong {
            key: key.to_string(),
            len: bytes.len(),
            max: MAX_DATA_PER_CHUNK,
        })?;

    let data = build_sized_data_field(key, &bytes)?;
    let header = build_header(namespace_index, item_type, span, chunk_index, key, &data)?;
    Ok(Item {
        header,
        payload: bytes,
    })
}

fn encode_blob(namespace_index: u8, key: &str, bytes: &[u8]) -> Result<Vec<Item>, Error> {
    let too_long = || Error::ValueTooLong {
        key: key.to_string(),
        len: bytes.len(),
        max: super::MAX_BLOB_SIZE,
    };

    // An empty blob still gets one (empty) data chunk
    let chunks: Vec<&[u8]> = if bytes.is_empty() {
        vec![bytes]
    } else {
        bytes.chunks(MAX_DATA_PER_CHUNK).collect()
    };
    let chunk_count = u8::try_from(chunks.len()).map_err(|_| too_long())?;
    let total_size = u32::try_from(bytes.len()).map_err(|_| too_long())?;

    let mut index_data = [ERASED; 8];
    index_data[..4].copy_from_slice(&total_size.to_le_bytes());
    index_data[4] = chunk_count;
    index_data[5] = BLOB_CHUNK_START;
    let index_header = build_header(
        namespace_index,
        ItemType::BlobIndex,
        1,
        CHUNK_ANY,
        key,
        &index_data,
    )?;

    let mut items = vec![Item {
        header: index_header,
        payload: Vec::new(),
    }];

    for (chunk_idx, chunk) in chunks.into_iter().enumerate() {
        // chunk_count fits into a u8, so every index does too
        let chunk_index = BLOB_CHUNK_START + chunk_idx as u8;
        items.push(encode_sized(
            namespace_index,
            ItemType::BlobData,
            chunk_index,
            key,
            chunk.to_vec(),
        )?);
    }

    Ok(items)
}

/// Build the 8-byte data field for SIZED and BLOB_DATA entries:
/// `[size:u16, reserved:u16, crc32:u32]`.
fn build_sized_data_field(key: &str, bytes: &[u8]) -> Result<[u8; 8], Error> {
    let size = u16::try_from(bytes.len()).map_err(|_| Error::ValueTooLong {
        key: key.to_string(),
        len: bytes.len(),
        max: MAX_DATA_PER_CHUNK,
    })?;
    let mut data = [0u8; 8];
    data[..2].copy_from_slice(&size.to_le_bytes());
    data[2..4].copy_from_slice(&RESERVED_U16.to_le_bytes());
    data[4..].copy_from_slice(&crc32(bytes).to_le_bytes());
    Ok(data)
}

/// Assemble a 32-byte descriptor and fill in its CRC.
fn build_header(
    namespace_index: u8,
    item_type: ItemType,
    span: u8,
    chunk_index: u8,
    key: &str,
    data: &[u8; 8],
) -> Result<[u8; ENTRY_SIZE], Error> {
    let mut entry = [ERASED; ENTRY_SIZE];
    entry[0] = namespace_index;
    entry[1] = item_type as u8;
    entry[2] = span;
    entry[3] = chunk_index;

    write_key(&mut entry[8..24], key)?;
    entry[24..32].copy_from_slice(data);

    let entry_crc = crc32_entry(&entry);
    entry[4..8].copy_from_slice(&entry_crc.to_le_bytes());

    Ok(entry)
}

fn write_key(dest: &mut [u8], key: &str) -> Result<(), Error> {
    validate_key(key)?;

    let key_bytes = key.as_bytes();
    dest[..key_bytes.len()].copy_from_slice(key_bytes);
    // Null-terminate and zero-fill the rest (ESP-IDF format uses zeros, not 0xFF)
    dest[key_bytes.len()..].fill(0);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_crc(header: &[u8; ENTRY_SIZE]) -> u32 {
        u32::from_le_bytes(header[4..8].try_into().unwrap())
    }

    #[test]
    fn namespace_record_layout() {
        let item = encode_namespace(&Namespace::default()).unwrap();
        let h = item.header;
        assert_eq!(&h[0..4], &[0x00, 0x01, 0x01, 0xFF]);
        assert_eq!(&h[8..18], b"device_cfg");
        assert!(h[18..24].iter().all(|&b| b == 0));
        assert_eq!(h[24], 1);
        assert!(h[25..32].iter().all(|&b| b == 0xFF));
        assert_eq!(stored_crc(&h), 0x8D3C_EFE9);
    }

    #[test]
    fn u16_is_packed_little_endian() {
        let items = encode_entry(1, "mqttPort", &DataValue::U16(1883)).unwrap();
        assert_eq!(items.len(), 1);
        let h = items[0].header;
        assert_eq!(h[1], ItemType::U16 as u8);
        assert_eq!(h[2], 1);
        assert_eq!(&h[24..26], &1883_u16.to_le_bytes());
        assert!(h[26..32].iter().all(|&b| b == 0xFF));
        assert_eq!(stored_crc(&h), crc32_entry(&h));
    }

    #[test]
    fn string_carries_terminator_and_correct_span() {
        let value = "x".repeat(40);
        let items = encode_entry(1, "deviceName", &DataValue::String(value)).unwrap();
        let item = &items[0];
        assert_eq!(item.payload.len(), 41);
        assert_eq!(item.payload.last(), Some(&0));
        assert_eq!(item.span(), 3);
        assert_eq!(item.header[2], 3);
        assert_eq!(item.header[1], ItemType::Sized as u8);
        assert_eq!(u16::from_le_bytes([item.header[24], item.header[25]]), 41);
        assert_eq!(&item.header[26..28], &[0xFF, 0xFF]);
        assert_eq!(
            u32::from_le_bytes(item.header[28..32].try_into().unwrap()),
            crc32(&item.payload)
        );
    }

    #[test]
    fn short_string_still_uses_a_data_entry() {
        let items = encode_entry(1, "k", &DataValue::String(String::new())).unwrap();
        assert_eq!(items[0].payload, vec![0]);
        assert_eq!(items[0].span(), 2);
    }

    #[test]
    fn blob_is_split_into_chunks() {
        let blob = vec![0xAB; MAX_DATA_PER_CHUNK + 10];
        let items = encode_entry(1, "cert", &DataValue::Binary(blob)).unwrap();
        assert_eq!(items.len(), 3);

        let index = &items[0].header;
        assert_eq!(index[1], ItemType::BlobIndex as u8);
        assert_eq!(index[3], CHUNK_ANY);
        assert_eq!(
            u32::from_le_bytes(index[24..28].try_into().unwrap()) as usize,
            MAX_DATA_PER_CHUNK + 10
        );
        assert_eq!(index[28], 2);
        assert_eq!(index[29], 0);

        assert_eq!(items[1].header[1], ItemType::BlobData as u8);
        assert_eq!(items[1].header[3], 0);
        assert_eq!(items[1].span(), ENTRIES_PER_PAGE);
        assert_eq!(items[2].header[3], 1);
        assert_eq!(items[2].payload.len(), 10);
    }

    #[test]
    fn empty_blob_has_one_empty_chunk() {
        let items = encode_entry(1, "empty", &DataValue::Binary(Vec::new())).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].header[28], 1);
        assert_eq!(items[1].span(), 1);
        assert_eq!(&items[1].header[24..26], &[0, 0]);
    }

    #[test]
    fn over_long_key_fails_instead_of_truncating() {
        let err = encode_entry(1, "mqttStatusTopic1", &DataValue::U8(0)).unwrap_err();
        assert!(matches!(err, Error::KeyTooLong(_)));
    }

    #[test]
    fn over_long_string_fails() {
        let err = encode_entry(1, "k", &DataValue::String("y".repeat(4001))).unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { .. }));
    }
}
