//! Raw capture input.
//!
//! Frames are read out of physical order, so the whole capture is held in memory.
use std::{fs::File, io::Read, path::Path};

use tracing::debug;

use crate::Result;

/// Raw bytes of a downlink capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    data: Vec<u8>,
}

impl Capture {
    /// Read the capture file at `path`.
    ///
    /// # Errors
    /// [crate::Error::Io] if the file cannot be opened or read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let capture = Self::from_reader(File::open(path)?)?;
        debug!(path = %path.display(), bytes = capture.len(), "read capture");
        Ok(capture)
    }

    /// Read everything from `reader`.
    ///
    /// # Errors
    /// [crate::Error::Io] if reading fails.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self { data })
    }

    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Capture {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}
