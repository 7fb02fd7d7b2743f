//! ISO 9660 seed image writer
//!
//! Builds the small, flat images cloud-init's NoCloud datasource reads:
//! every file sits in the root directory, short names follow interchange
//! level 3 and the original names are kept as Rock Ridge (RRIP 1.09)
//! aliases.
//!
//! Image construction is exposed through the [`ImageWriter`] trait so the
//! seed flow does not depend on one particular writer.

mod datetime;
mod record;
pub mod rock_ridge;
mod writer;

pub use writer::IsoImageBuilder;

use time::OffsetDateTime;

use crate::error::Result;

/// Logical sector size used for every image
pub const SECTOR_SIZE: usize = 2048;

/// Volume label cloud-init looks for
pub const CIDATA_LABEL: &str = "cidata";

/// ISO 9660 interchange level written by [`IsoImageBuilder`]
pub const INTERCHANGE_LEVEL: u8 = 3;

/// Longest file identifier interchange level 3 allows
pub const MAX_IDENTIFIER_LEN: usize = 30;

/// Longest volume identifier
pub const MAX_VOLUME_LABEL_LEN: usize = 32;

/// Characters allowed in a short (ISO 9660) file name
const SAFE_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

/// Options for a new image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    /// Volume identifier
    pub volume_label: String,
    /// Timestamp recorded on the volume and every directory record
    pub timestamp: OffsetDateTime,
}

impl ImageOptions {
    /// Options with the given label, stamped with the current time
    pub fn new(volume_label: impl Into<String>) -> Self {
        Self {
            volume_label: volume_label.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Use a fixed timestamp (for reproducible images)
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self::new(CIDATA_LABEL)
    }
}

/// Capability to build a filesystem image from root-level files
pub trait ImageWriter: Sized {
    /// Start a new, empty image
    fn create(options: ImageOptions) -> Result<Self>;

    /// Add a file at the image root
    fn add_file(&mut self, name: &str, content: Vec<u8>) -> Result<()>;

    /// Serialize the image, consuming the writer
    fn finalize(self) -> Result<Vec<u8>>;
}

/// Make a file name safe for ISO 9660 (interchange level 3)
///
/// Uppercases the name and replaces every character outside `[A-Z0-9_]`
/// with `_`. The result has as many characters as the input.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) if SAFE_CHARS.contains(u) => u,
                _ => '_',
            }
        })
        .collect()
}
