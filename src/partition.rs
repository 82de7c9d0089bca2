pub mod crc;

pub(crate) mod consts;
pub(crate) mod generator;
pub(crate) mod item;
pub(crate) mod writer;

pub use consts::{
    ItemType,
    PageState,
    ENTRIES_PER_PAGE,
    ENTRY_SIZE,
    FLASH_SECTOR_SIZE,
};

use crate::error::Error;

/// Maximum Key length is 15 bytes + 1 byte for the null terminator.
pub const MAX_KEY_LENGTH: usize = 15;

/// Maximum encoded string size, null terminator included. A string and all of
/// its data entries have to fit on a single page.
pub const MAX_STRING_SIZE: usize = consts::MAX_DATA_PER_CHUNK;

/// Maximum blob size: 255 chunks of up to 4000 bytes each.
pub const MAX_BLOB_SIZE: usize = u8::MAX as usize * consts::MAX_DATA_PER_CHUNK;

/// Namespace the device firmware opens its configuration from.
pub const DEFAULT_NAMESPACE: &str = "device_cfg";

/// A namespace name together with the index its entries refer to.
///
/// Index 0 is reserved for namespace records themselves and 0xFF marks
/// unwritten entries, so valid indices are 1..=254.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    name: String,
    index: u8,
}

impl Namespace {
    pub fn new(name: impl Into<String>, index: u8) -> Result<Self, Error> {
        let name = name.into();
        validate_key(&name)?;
        if index == 0 || index == u8::MAX {
            return Err(Error::InvalidConfiguration(format!(
                "namespace index {index} is reserved"
            )));
        }
        Ok(Self { name, index })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u8 {
        self.index
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAMESPACE.to_string(),
            index: 1,
        }
    }
}

/// A single key-value entry of the provisioning namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvsEntry {
    /// The key identifying this entry (max 15 bytes).
    pub key: String,
    /// The value, its variant decides the on-flash item type.
    pub value: DataValue,
}

impl NvsEntry {
    /// Create a new entry, rejecting over-long keys and values up front.
    pub fn new(key: impl Into<String>, value: DataValue) -> Result<Self, Error> {
        let key = key.into();
        validate_key(&key)?;
        validate_value(&key, &value)?;
        Ok(Self { key, value })
    }
}

/// A concrete data value stored in an NVS entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// UTF-8 string (without null terminator).
    String(String),
    /// Opaque byte blob.
    Binary(Vec<u8>),
}

impl DataValue {
    /// Return the `nvs_partition_gen` CSV encoding name for this value.
    pub fn encoding_str(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::String(_) => "string",
            Self::Binary(_) => "base64",
        }
    }

    /// The item type a descriptor for this value carries.
    pub fn item_type(&self) -> ItemType {
        match self {
            Self::U8(_) => ItemType::U8,
            Self::U16(_) => ItemType::U16,
            Self::U32(_) => ItemType::U32,
            Self::String(_) => ItemType::Sized,
            Self::Binary(_) => ItemType::BlobIndex,
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Binary(b) => {
                use base64::Engine;
                f.write_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }
}

/// Validate that `key` is non-empty and within the NVS maximum key length.
///
/// Over-long keys are always an error, they are never truncated.
pub(crate) fn validate_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::EmptyKey);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(Error::KeyTooLong(key.to_string()));
    }
    Ok(())
}

/// Validate that a variable-length value fits the format limits.
pub(crate) fn validate_value(key: &str, value: &DataValue) -> Result<(), Error> {
    let (len, max) = match value {
        DataValue::String(s) => (s.len() + 1, MAX_STRING_SIZE),
        DataValue::Binary(b) => (b.len(), MAX_BLOB_SIZE),
        _ => return Ok(()),
    };
    if len > max {
        return Err(Error::ValueTooLong {
            key: key.to_string(),
            len,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_byte_key_is_accepted() {
        assert!(NvsEntry::new("abcdefghijklmno", DataValue::U8(1)).is_ok());
    }

    #[test]
    fn sixteen_byte_key_is_rejected() {
        let err = NvsEntry::new("abcdefghijklmnop", DataValue::U8(1)).unwrap_err();
        assert!(matches!(err, Error::KeyTooLong(k) if k == "abcdefghijklmnop"));
    }

    #[test]
    fn key_length_counts_bytes_not_chars() {
        // 8 chars, 16 bytes
        let err = NvsEntry::new("ääääääää", DataValue::U8(1)).unwrap_err();
        assert!(matches!(err, Error::KeyTooLong(_)));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            NvsEntry::new("", DataValue::U8(1)),
            Err(Error::EmptyKey)
        ));
    }

    #[test]
    fn string_limit_includes_terminator() {
        assert!(NvsEntry::new("s", DataValue::String("x".repeat(3999))).is_ok());
        let err = NvsEntry::new("s", DataValue::String("x".repeat(4000))).unwrap_err();
        assert!(matches!(
            err,
            Error::ValueTooLong {
                len: 4001,
                max: 4000,
                ..
            }
        ));
    }

    #[test]
    fn reserved_namespace_indices_are_rejected() {
        assert!(Namespace::new("cfg", 0).is_err());
        assert!(Namespace::new("cfg", 255).is_err());
        assert!(matches!(
            Namespace::new("a_very_long_namespace", 1),
            Err(Error::KeyTooLong(_))
        ));
        assert_eq!(Namespace::new("cfg", 3).unwrap().index(), 3);
    }

    #[test]
    fn binary_values_display_as_base64() {
        assert_eq!(DataValue::Binary(vec![0xDE, 0xAD]).to_string(), "3q0=");
        assert_eq!(DataValue::U16(1883).to_string(), "1883");
    }
}
