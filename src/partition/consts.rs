// NVS page layout
pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const PAGE_HEADER_SIZE: usize = 32;
pub const ENTRY_STATE_BITMAP_SIZE: usize = 32;
pub const ENTRY_SIZE: usize = 32;
pub const ENTRIES_PER_PAGE: usize = 126;

/// Version byte of the multi-page blob format (NVS format version 2).
pub const PAGE_VERSION: u8 = 0xFE;

/// Value of unwritten flash.
pub const ERASED: u8 = 0xFF;

// Reserved values for unused fields
pub const RESERVED_U16: u16 = 0xFFFF;
pub const CHUNK_ANY: u8 = 0xFF;

/// Index every blob starts numbering its data chunks from.
pub const BLOB_CHUNK_START: u8 = 0;

// Entry states in the 2-bit-per-slot bitmap
pub const ENTRY_STATE_WRITTEN: u8 = 0b10;

// Maximum data bytes per SIZED item or BLOB_DATA chunk.
// Each one uses a header entry + up to (ENTRIES_PER_PAGE - 1) data entries.
pub const MAX_DATA_PER_CHUNK: usize = (ENTRIES_PER_PAGE - 1) * ENTRY_SIZE; // 4000 bytes

const PSB_INIT: u32 = 0x1;
const PSB_FULL: u32 = 0x2;

/// Page states written to the first word of every page header.
#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u32)]
pub enum PageState {
    // All bits set, default state after flash erase.
    Uninitialized = u32::MAX,

    // Page is initialized and accepts writes.
    Active = PageState::Uninitialized as u32 & !PSB_INIT,

    // Page is marked as full and will not accept new writes.
    Full = PageState::Active as u32 & !PSB_FULL,
}

/// Item type tags as stored in byte 1 of every descriptor.
#[derive(strum::FromRepr, strum::Display, Debug, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
pub enum ItemType {
    U8 = 0x01,
    I8 = 0x11,
    U16 = 0x02,
    I16 = 0x12,
    U32 = 0x04,
    I32 = 0x14,
    U64 = 0x08,
    I64 = 0x18,
    Sized = 0x21,
    Blob = 0x41, // Legacy single-page blob (version 1 format)
    BlobData = 0x42,
    BlobIndex = 0x48,
    Any = 0xFF,
}
