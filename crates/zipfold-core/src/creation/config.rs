//! Compression settings for repacking.

use crate::PipelineError;
use crate::Result;
use zip::write::SimpleFileOptions;

/// Storage method for archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    /// Entries are stored uncompressed (ZIP method 0).
    Stored,
    /// Entries are Deflate-compressed (ZIP method 8).
    #[default]
    Deflated,
}

impl CompressionMethod {
    /// Returns the ZIP method number written to entry headers.
    #[must_use]
    pub const fn method_id(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflated => 8,
        }
    }
}

/// Compression settings applied to every entry of a written archive.
///
/// # Examples
///
/// ```
/// use zipfold_core::creation::CompressionMethod;
/// use zipfold_core::creation::CompressionOptions;
///
/// let options = CompressionOptions::default();
/// assert_eq!(options.method, CompressionMethod::Deflated);
/// assert_eq!(options.level, 6);
///
/// let stored = CompressionOptions::default().with_method(CompressionMethod::Stored);
/// assert_eq!(stored.method, CompressionMethod::Stored);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Storage method.
    ///
    /// Default: `Deflated`.
    pub method: CompressionMethod,

    /// Deflate level (1-9). Ignored for `Stored`.
    ///
    /// Default: 6.
    pub level: u8,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            method: CompressionMethod::Deflated,
            level: 6,
        }
    }
}

impl CompressionOptions {
    /// Creates the default settings (Deflate, level 6).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage method.
    #[must_use]
    pub fn with_method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the Deflate level.
    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the level is outside 1-9.
    pub fn validate(&self) -> Result<()> {
        if !(1..=9).contains(&self.level) {
            return Err(PipelineError::InvalidConfig(format!(
                "compression level must be 1-9, got {}",
                self.level
            )));
        }
        Ok(())
    }

    pub(crate) fn file_options(&self) -> SimpleFileOptions {
        match self.method {
            CompressionMethod::Stored => {
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
            }
            CompressionMethod::Deflated => SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.level))),
        }
    }
}
