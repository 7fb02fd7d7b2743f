//! mkcii library
//!
//! Builds cloud-init "cidata" seed images: three NoCloud documents
//! (`user-data`, `meta-data`, `network-config`) written to a small ISO 9660
//! image with Rock Ridge names.
//!
//! # Example
//! ```
//! use mkcii::{build_user, generate};
//!
//! let user = build_user("alice", "s3cret", &[]);
//! let image = generate("host1", user, None).unwrap();
//! assert_eq!(&image[16 * 2048 + 1..16 * 2048 + 6], b"CD001");
//! ```

pub mod config;
pub mod iso9660;
pub mod metadata;
pub mod network;
pub mod output;
pub mod seed;

mod error;

pub use error::{Result, SeedError};
pub use seed::{
    EthernetSpec, SeedBuilder, SeedDocuments, SeedFile, UserOptions, assemble, build_ethernet,
    build_user, build_user_with,
};

use config::UserSpec;
use iso9660::{ImageOptions, ImageWriter, IsoImageBuilder};
use tracing::info;

/// Generate a cidata image for one user and an optional interface
///
/// Uses the `cidata` volume label and the current time.
pub fn generate(hostname: &str, user: UserSpec, ethernet: Option<EthernetSpec>) -> Result<Vec<u8>> {
    let documents = assemble(hostname, user, ethernet)?;
    write_seed_image::<IsoImageBuilder>(&documents, ImageOptions::default())
}

/// Write a document set to a new image and return the image bytes
///
/// Nothing is returned unless every file was added and the image was
/// finalized.
pub fn write_seed_image<W: ImageWriter>(
    documents: &SeedDocuments,
    options: ImageOptions,
) -> Result<Vec<u8>> {
    let mut writer = W::create(options)?;
    for file in documents.render()? {
        writer.add_file(file.name, file.content)?;
    }
    let image = writer.finalize()?;
    info!("Built seed image ({} bytes)", image.len());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that concatenates file contents, optionally failing on one name
    struct MockWriter {
        files: Vec<(String, Vec<u8>)>,
        fail_on: Option<&'static str>,
    }

    impl ImageWriter for MockWriter {
        fn create(options: ImageOptions) -> Result<Self> {
            let fail_on = match options.volume_label.as_str() {
                "fail-meta" => Some(seed::META_DATA_FILE),
                _ => None,
            };
            Ok(Self {
                files: Vec::new(),
                fail_on,
            })
        }

        fn add_file(&mut self, name: &str, content: Vec<u8>) -> Result<()> {
            if self.fail_on == Some(name) {
                return Err(SeedError::image_write(format!("refusing {name}")));
            }
            self.files.push((name.to_string(), content));
            Ok(())
        }

        fn finalize(self) -> Result<Vec<u8>> {
            Ok(self.files.into_iter().flat_map(|(_, c)| c).collect())
        }
    }

    #[test]
    fn test_write_seed_image_adds_documents_in_order() {
        let documents = assemble("host1", build_user("alice", "pw", &[]), None).unwrap();
        let image =
            write_seed_image::<MockWriter>(&documents, ImageOptions::new("cidata")).unwrap();

        let expected: Vec<u8> = documents
            .render()
            .unwrap()
            .into_iter()
            .flat_map(|f| f.content)
            .collect();
        assert_eq!(image, expected);
    }

    #[test]
    fn test_write_seed_image_aborts_on_writer_error() {
        let documents = assemble("host1", build_user("alice", "pw", &[]), None).unwrap();
        let err = write_seed_image::<MockWriter>(&documents, ImageOptions::new("fail-meta"))
            .unwrap_err();
        assert!(matches!(err, SeedError::ImageWrite(_)));
    }

    #[test]
    fn test_generate_rejects_empty_hostname() {
        let err = generate("", build_user("alice", "pw", &[]), None).unwrap_err();
        assert!(matches!(err, SeedError::Validation(_)));
    }
}
