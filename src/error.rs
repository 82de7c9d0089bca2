use thiserror::Error;

/// Errors that can occur while turning a device configuration into an NVS
/// partition image, exporting it, or flashing it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("key '{0}' is too long (max 15 bytes)")]
    KeyTooLong(String),

    #[error("key must not be empty")]
    EmptyKey,

    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    #[error("value for key '{key}' is too long ({len} bytes, max {max})")]
    ValueTooLong { key: String, len: usize, max: usize },

    #[error("invalid partition size {0}: must be a non-zero multiple of 4096 bytes")]
    MisalignedPartitionSize(usize),

    #[error("entries do not fit into a partition of {pages} page(s)")]
    PartitionOverflow { pages: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("flashing failed: {0}")]
    FlashFailed(String),
}
