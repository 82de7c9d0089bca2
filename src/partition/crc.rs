use super::consts::{
    ENTRY_SIZE,
    PAGE_HEADER_SIZE,
};

/// Compute an NVS CRC over `data`, exactly as ESP-IDF does for page headers,
/// item headers and variable-length payloads.
///
/// This is `crc32_le(0xFFFFFFFF, data)`. It is NOT the common IEEE CRC-32:
/// the seed is inverted before use, so the register starts at zero.
pub fn crc32(data: &[u8]) -> u32 {
    crc32_le(u32::MAX, data)
}

/// Little-endian CRC32 (reflected polynomial 0xEDB88320) with the semantics of
/// the ESP32 ROM `crc32_le` and zlib's `crc32`: `seed` is inverted on entry and
/// the result is inverted on exit, so calls can be chained.
pub fn crc32_le(seed: u32, data: &[u8]) -> u32 {
    let mut crc = !seed;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}

/// Compute an NVS entry CRC over all bytes except the CRC field at offset 4..8.
pub fn crc32_entry(entry: &[u8; ENTRY_SIZE]) -> u32 {
    let crc = crc32_le(u32::MAX, &entry[0..4]);
    crc32_le(crc, &entry[8..ENTRY_SIZE])
}

/// Compute a page header CRC over the sequence number, version and reserved
/// bytes (offset 4..28).
pub fn crc32_page_header(header: &[u8; PAGE_HEADER_SIZE]) -> u32 {
    crc32(&header[4..28])
}
