//! Writing a finished image to a device with `esptool`.
//!
//! The image is only handed over once it is complete. A failing `esptool`
//! run is reported as is and never retried.

use std::ffi::OsString;
use std::path::{
    Path,
    PathBuf,
};
use std::process::Command;

use tracing::{
    debug,
    info,
};

use crate::error::Error;

pub const DEFAULT_ESPTOOL: &str = "esptool.py";
pub const DEFAULT_CHIP: &str = "esp32s3";
pub const DEFAULT_PORT: &str = "/dev/cu.usbmodem101";

/// Offset of the `nvs` partition in the default partition table.
pub const DEFAULT_OFFSET: u32 = 0x9000;

/// How to reach the device: which `esptool`, chip, serial port and offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flasher {
    pub esptool: PathBuf,
    pub chip: String,
    pub port: String,
    pub offset: u32,
}

impl Default for Flasher {
    fn default() -> Self {
        Self {
            esptool: PathBuf::from(DEFAULT_ESPTOOL),
            chip: DEFAULT_CHIP.to_string(),
            port: DEFAULT_PORT.to_string(),
            offset: DEFAULT_OFFSET,
        }
    }
}

impl Flasher {
    /// Arguments passed to `esptool` for writing `image`.
    pub fn args(&self, image: &Path) -> Vec<OsString> {
        vec![
            "--chip".into(),
            self.chip.clone().into(),
            "--port".into(),
            self.port.clone().into(),
            "write_flash".into(),
            format!("{:#x}", self.offset).into(),
            image.as_os_str().to_owned(),
        ]
    }

    /// Run `esptool` to write `image` at the configured offset.
    ///
    /// Blocks until `esptool` exits. A non-zero exit status is terminal.
    pub fn flash(&self, image: &Path) -> Result<(), Error> {
        let args = self.args(image);
        debug!(esptool = %self.esptool.display(), ?args, "running esptool");

        let status = Command::new(&self.esptool)
            .args(&args)
            .status()
            .map_err(|e| {
                Error::FlashFailed(format!(
                    "could not run {}: {e}",
                    self.esptool.display()
                ))
            })?;

        if !status.success() {
            return Err(Error::FlashFailed(format!(
                "{} exited with {status}",
                self.esptool.display()
            )));
        }

        info!(
            port = %self.port,
            offset = %format!("{:#x}", self.offset),
            "flashed partition image"
        );
        Ok(())
    }
}
