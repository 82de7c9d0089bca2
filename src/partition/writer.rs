use tracing::debug;

use super::consts::*;
use super::crc::crc32_page_header;
use super::item::Item;
use crate::error::Error;

/// Sequential cursor over a pre-allocated, erased partition buffer.
///
/// Items are appended slot by slot. An item never straddles two pages: when
/// the current page cannot hold it, the page is marked full and writing
/// continues on the next one.
pub(crate) struct PartitionWriter {
    data: Vec<u8>,
    current_page: usize,
    current_entry: usize,
    num_pages: usize,
}

impl PartitionWriter {
    /// `size` must already be validated as a non-zero multiple of the sector size.
    pub(crate) fn new(size: usize) -> Result<Self, Error> {
        let num_pages = size / FLASH_SECTOR_SIZE;
        let mut data = vec![ERASED; size];

        write_page_header(&mut data, 0, PageState::Active)?;

        Ok(Self {
            data,
            current_page: 0,
            current_entry: 0,
            num_pages,
        })
    }

    /// Append `item` to the current page, rolling over first if it does not fit.
    pub(crate) fn write_item(&mut self, item: &Item) -> Result<(), Error> {
        let span = item.span();
        if self.current_entry + span > ENTRIES_PER_PAGE {
            self.advance_page()?;
        }

        self.write_slot(&item.header);
        for chunk in item.payload.chunks(ENTRY_SIZE) {
            self.write_slot(chunk);
        }

        Ok(())
    }

    /// Finish the image and hand out the buffer.
    ///
    /// The last page is marked full only if it has no remaining free entries.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>, Error> {
        if self.current_entry >= ENTRIES_PER_PAGE {
            write_page_header(&mut self.data, self.current_page, PageState::Full)?;
        }
        Ok(self.data)
    }

    pub(crate) fn pages_used(&self) -> usize {
        self.current_page + 1
    }

    fn advance_page(&mut self) -> Result<(), Error> {
        if self.current_page + 1 >= self.num_pages {
            return Err(Error::PartitionOverflow {
                pages: self.num_pages,
            });
        }

        write_page_header(&mut self.data, self.current_page, PageState::Full)?;

        self.current_page += 1;
        self.current_entry = 0;
        write_page_header(&mut self.data, self.current_page, PageState::Active)?;

        debug!(page = self.current_page, "advanced to next page");
        Ok(())
    }

    /// Copy up to 32 bytes into the next free slot and mark it written.
    /// A short chunk leaves the tail of the slot erased.
    fn write_slot(&mut self, bytes: &[u8]) {
        let offset = calc_entry_offset(self.current_page, self.current_entry);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        set_entry_state(
            &mut self.data,
            self.current_page,
            self.current_entry,
            ENTRY_STATE_WRITTEN,
        );
        self.current_entry += 1;
    }
}

fn calc_entry_offset(page_index: usize, entry_index: usize) -> usize {
    page_index * FLASH_SECTOR_SIZE
        + PAGE_HEADER_SIZE
        + ENTRY_STATE_BITMAP_SIZE
        + (entry_index * ENTRY_SIZE)
}

/// The sequence number of a page is its index, one generation only.
fn write_page_header(data: &mut [u8], page_index: usize, state: PageState) -> Result<(), Error> {
    let sequence = u32::try_from(page_index).map_err(|_| Error::PartitionOverflow {
        pages: page_index,
    })?;

    let mut header = [ERASED; PAGE_HEADER_SIZE];
    header[0..4].copy_from_slice(&(state as u32).to_le_bytes());
    header[4..8].copy_from_slice(&sequence.to_le_bytes());
    header[8] = PAGE_VERSION;
    // Reserved bytes (19 bytes) stay 0xFF
    let crc = crc32_page_header(&header);
    header[28..32].copy_from_slice(&crc.to_le_bytes());

    let offset = page_index * FLASH_SECTOR_SIZE;
    data[offset..offset + PAGE_HEADER_SIZE].copy_from_slice(&header);
    Ok(())
}

fn set_entry_state(data: &mut [u8], page_index: usize, entry_index: usize, state: u8) {
    let bitmap_offset = page_index * FLASH_SECTOR_SIZE + PAGE_HEADER_SIZE;

    let byte_index = entry_index / 4;
    let bit_offset = (entry_index % 4) * 2;

    let mut byte = data[bitmap_offset + byte_index];
    byte &= !(0b11 << bit_offset); // Clear the 2 bits
    byte |= state << bit_offset; // Set the state
    data[bitmap_offset + byte_index] = byte;
}
