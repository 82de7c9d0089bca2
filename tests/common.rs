#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const PAGE_HEADER_SIZE: usize = 32;
pub const ENTRY_STATE_MAP_SIZE: usize = 32;
pub const ITEM_OFFSET: usize = PAGE_HEADER_SIZE + ENTRY_STATE_MAP_SIZE;
pub const ITEM_SIZE: usize = 32;
pub const ITEMS_PER_PAGE: usize = 126;

pub const STATE_UNINITIALIZED: u32 = 0xFFFF_FFFF;
pub const STATE_ACTIVE: u32 = 0xFFFF_FFFE;
pub const STATE_FULL: u32 = 0xFFFF_FFFC;

pub const TYPE_U8: u8 = 0x01;
pub const TYPE_U16: u8 = 0x02;
pub const TYPE_SIZED: u8 = 0x21;
pub const TYPE_BLOB_DATA: u8 = 0x42;
pub const TYPE_BLOB_INDEX: u8 = 0x48;

/// Reference CRC from zlib, seeded the way ESP-IDF seeds `crc32_le`.
pub fn reference_crc32(data: &[u8]) -> u32 {
    unsafe { libz_sys::crc32(0xFFFF_FFFFu32 as _, data.as_ptr(), data.len() as _) as u32 }
}

pub fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

pub fn page_state(data: &[u8], page: usize) -> u32 {
    read_u32(data, page * FLASH_SECTOR_SIZE)
}

pub fn slot_offset(page: usize, slot: usize) -> usize {
    page * FLASH_SECTOR_SIZE + ITEM_OFFSET + slot * ITEM_SIZE
}

pub fn slot_written(data: &[u8], page: usize, slot: usize) -> bool {
    let byte = data[page * FLASH_SECTOR_SIZE + PAGE_HEADER_SIZE + slot / 4];
    (byte >> ((slot % 4) * 2)) & 0b11 == 0b10
}

/// A descriptor found while walking the image, with the raw payload of the
/// data slots that follow it.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub page: usize,
    pub slot: usize,
    pub header: [u8; ITEM_SIZE],
    pub payload: Vec<u8>,
}

impl Descriptor {
    pub fn namespace_index(&self) -> u8 {
        self.header[0]
    }

    pub fn item_type(&self) -> u8 {
        self.header[1]
    }

    pub fn span(&self) -> usize {
        self.header[2] as usize
    }

    pub fn chunk_index(&self) -> u8 {
        self.header[3]
    }

    pub fn key(&self) -> String {
        let key = &self.header[8..24];
        let end = key.iter().position(|&b| b == 0).unwrap();
        String::from_utf8(key[..end].to_vec()).unwrap()
    }

    pub fn data(&self) -> &[u8] {
        &self.header[24..32]
    }

    /// Size field of a SIZED or BLOB_DATA descriptor.
    pub fn sized_len(&self) -> usize {
        u16::from_le_bytes([self.header[24], self.header[25]]) as usize
    }

    /// Payload of a SIZED or BLOB_DATA descriptor, trimmed to its size field.
    pub fn sized_payload(&self) -> &[u8] {
        &self.payload[..self.sized_len()]
    }

    pub fn string(&self) -> String {
        let bytes = self.sized_payload();
        assert_eq!(bytes.last(), Some(&0), "string must be null terminated");
        String::from_utf8(bytes[..bytes.len() - 1].to_vec()).unwrap()
    }
}

/// Walk every initialized page and collect the descriptors in slot order,
/// skipping over the data slots each one spans.
pub fn descriptors(data: &[u8]) -> Vec<Descriptor> {
    let mut found = Vec::new();
    for page in 0..data.len() / FLASH_SECTOR_SIZE {
        if page_state(data, page) == STATE_UNINITIALIZED {
            continue;
        }
        let mut slot = 0;
        while slot < ITEMS_PER_PAGE {
            if !slot_written(data, page, slot) {
                slot += 1;
                continue;
            }
            let offset = slot_offset(page, slot);
            let header: [u8; ITEM_SIZE] = data[offset..offset + ITEM_SIZE].try_into().unwrap();
            let span = header[2] as usize;
            assert!(span >= 1, "span must be at least 1");
            let payload_start = offset + ITEM_SIZE;
            let payload = data[payload_start..payload_start + (span - 1) * ITEM_SIZE].to_vec();
            found.push(Descriptor {
                page,
                slot,
                header,
                payload,
            });
            slot += span;
        }
    }
    found
}

pub fn find(data: &[u8], key: &str) -> Option<Descriptor> {
    descriptors(data)
        .into_iter()
        .find(|d| d.namespace_index() != 0 && d.key() == key)
}
