mod hidraw;

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use co2meter_core::SessionKey;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to open device {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to send session key to device {path}")]
    Handshake {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An opened hidraw node of a CO2 meter.
///
/// The handle is read by the poll loop only and lives for the whole process.
#[derive(Debug)]
pub struct Device {
    path: PathBuf,
    file: File,
}

impl Device {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| DeviceError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), "Opened device");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Hand `key` to the device with a HID SET_REPORT request.
    ///
    /// From then on the device obfuscates every frame with this key.
    pub fn arm(&self, key: &SessionKey) -> Result<(), DeviceError> {
        hidraw::set_feature_report(&self.file, &key.feature_report()).map_err(|source| {
            DeviceError::Handshake {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(path = %self.path.display(), "Device armed with session key");
        Ok(())
    }
}

impl Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}
