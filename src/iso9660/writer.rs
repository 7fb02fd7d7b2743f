//! In-memory ISO 9660 image builder
//!
//! Layout of a finished image, in 2048-byte sectors:
//!
//! | Sector | Contents |
//! |---|---|
//! | 0-15 | System area (zeros) |
//! | 16 | Primary volume descriptor |
//! | 17 | Volume descriptor set terminator |
//! | 18 | Type L path table |
//! | 19 | Type M path table |
//! | 20.. | Root directory |
//! | next | Rock Ridge continuation area (`ER`) |
//! | .. | File extents, in the order files were added |
//!
//! Readers that scan the image front to back only follow a `CE` entry
//! forwards, so the continuation area comes after the root directory.

use time::OffsetDateTime;
use tracing::{debug, trace};

use super::datetime::{UNSET_VOLUME_DATETIME, record_datetime, volume_datetime};
use super::record::{
    DOT, DOTDOT, DirectoryRecord, FLAG_DIRECTORY, MAX_RECORD_LEN, both_u16, both_u32,
    put_padded, root_path_table,
};
use super::rock_ridge::{self, DIRECTORY_MODE, FILE_MODE, RR_NM, RR_PX, RR_TF};
use super::{
    ImageOptions, ImageWriter, MAX_IDENTIFIER_LEN, MAX_VOLUME_LABEL_LEN, SECTOR_SIZE,
    sanitize_name,
};
use crate::error::{Result, SeedError};

const SYSTEM_AREA_SECTORS: u32 = 16;
const PRIMARY_DESCRIPTOR_SECTOR: u32 = SYSTEM_AREA_SECTORS;
const TERMINATOR_SECTOR: u32 = 17;
const L_PATH_TABLE_SECTOR: u32 = 18;
const M_PATH_TABLE_SECTOR: u32 = 19;
const ROOT_DIRECTORY_SECTOR: u32 = 20;

/// File version appended to every file identifier
const FILE_VERSION_SUFFIX: &str = ";1";

const APPLICATION_ID: &str = "MKCII";

/// A file queued for the image
#[derive(Debug, Clone)]
struct PendingFile {
    short_name: String,
    long_name: String,
    content: Vec<u8>,
}

/// Builds a flat ISO 9660 image with Rock Ridge names
///
/// # Example
/// ```
/// use mkcii::iso9660::{ImageWriter, IsoImageBuilder};
///
/// let mut builder = IsoImageBuilder::new("cidata").unwrap();
/// builder.add_file("meta-data", b"local-hostname: host1\n".to_vec()).unwrap();
/// let image = builder.finalize().unwrap();
/// assert_eq!(image.len() % 2048, 0);
/// ```
#[derive(Debug, Clone)]
pub struct IsoImageBuilder {
    volume_label: String,
    timestamp: OffsetDateTime,
    files: Vec<PendingFile>,
}

impl IsoImageBuilder {
    /// New builder with the given volume label, stamped with the current time
    pub fn new(volume_label: &str) -> Result<Self> {
        Self::with_options(ImageOptions::new(volume_label))
    }

    pub fn with_options(options: ImageOptions) -> Result<Self> {
        let label = &options.volume_label;
        if label.is_empty() || label.len() > MAX_VOLUME_LABEL_LEN || !label.is_ascii() {
            return Err(SeedError::image_write(format!(
                "volume label must be 1-{MAX_VOLUME_LABEL_LEN} ASCII characters: {label:?}"
            )));
        }

        debug!(
            "New ISO 9660 image '{}' (interchange level {}, Rock Ridge 1.09)",
            label,
            super::INTERCHANGE_LEVEL
        );

        Ok(Self {
            volume_label: options.volume_label,
            timestamp: options.timestamp,
            files: Vec::new(),
        })
    }

    /// Number of files added so far
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn recorded(&self) -> [u8; 7] {
        record_datetime(self.timestamp)
    }

    /// Directory record for a file, before its extent is known
    fn file_record(&self, file: &PendingFile, extent: u32) -> Result<DirectoryRecord> {
        let nm = rock_ridge::nm(&file.long_name).ok_or_else(|| {
            SeedError::image_write(format!("file name too long: {}", file.long_name))
        })?;

        let mut system_use = rock_ridge::rr(RR_PX | RR_NM | RR_TF);
        system_use.extend(nm);
        system_use.extend(rock_ridge::px(FILE_MODE, 1));
        system_use.extend(rock_ridge::tf(self.recorded()));

        let record = DirectoryRecord {
            extent,
            data_len: file.content.len() as u32,
            recorded: self.recorded(),
            flags: 0,
            identifier: format!("{}{FILE_VERSION_SUFFIX}", file.short_name).into_bytes(),
            system_use,
        };

        if record.encoded_len() > MAX_RECORD_LEN {
            return Err(SeedError::image_write(format!(
                "file name too long: {}",
                file.long_name
            )));
        }
        Ok(record)
    }

    /// The "." and ".." records of the root directory
    fn root_self_records(
        &self,
        root_size: u32,
        continuation_sector: u32,
        er_len: u32,
    ) -> [DirectoryRecord; 2] {
        let mut dot_system_use = rock_ridge::sp();
        dot_system_use.extend(rock_ridge::rr(RR_PX | RR_TF));
        dot_system_use.extend(rock_ridge::ce(continuation_sector, 0, er_len));
        dot_system_use.extend(rock_ridge::px(DIRECTORY_MODE, 2));
        dot_system_use.extend(rock_ridge::tf(self.recorded()));

        let mut dotdot_system_use = rock_ridge::rr(RR_PX | RR_TF);
        dotdot_system_use.extend(rock_ridge::px(DIRECTORY_MODE, 2));
        dotdot_system_use.extend(rock_ridge::tf(self.recorded()));

        let record = |identifier: &[u8], system_use: Vec<u8>| DirectoryRecord {
            extent: ROOT_DIRECTORY_SECTOR,
            data_len: root_size,
            recorded: self.recorded(),
            flags: FLAG_DIRECTORY,
            identifier: identifier.to_vec(),
            system_use,
        };

        [
            record(DOT, dot_system_use),
            record(DOTDOT, dotdot_system_use),
        ]
    }

    /// Root record embedded in the primary volume descriptor
    fn descriptor_root_record(&self, root_size: u32) -> DirectoryRecord {
        DirectoryRecord {
            extent: ROOT_DIRECTORY_SECTOR,
            data_len: root_size,
            recorded: self.recorded(),
            flags: FLAG_DIRECTORY,
            identifier: DOT.to_vec(),
            system_use: Vec::new(),
        }
    }

    fn primary_volume_descriptor(&self, volume_sectors: u32, root_size: u32) -> Vec<u8> {
        let path_table_len = root_path_table(ROOT_DIRECTORY_SECTOR, false).len() as u32;
        let created = volume_datetime(self.timestamp);

        let mut pvd = vec![0u8; SECTOR_SIZE];
        pvd[0] = 1;
        pvd[1..6].copy_from_slice(b"CD001");
        pvd[6] = 1;
        put_padded(&mut pvd[8..40], "");
        put_padded(&mut pvd[40..72], &self.volume_label);
        pvd[80..88].copy_from_slice(&both_u32(volume_sectors));
        pvd[120..124].copy_from_slice(&both_u16(1)); // volume set size
        pvd[124..128].copy_from_slice(&both_u16(1)); // volume sequence number
        pvd[128..132].copy_from_slice(&both_u16(SECTOR_SIZE as u16));
        pvd[132..140].copy_from_slice(&both_u32(path_table_len));
        pvd[140..144].copy_from_slice(&L_PATH_TABLE_SECTOR.to_le_bytes());
        pvd[148..152].copy_from_slice(&M_PATH_TABLE_SECTOR.to_be_bytes());
        pvd[156..190].copy_from_slice(&self.descriptor_root_record(root_size).encode());
        put_padded(&mut pvd[190..318], ""); // volume set
        put_padded(&mut pvd[318..446], ""); // publisher
        put_padded(&mut pvd[446..574], ""); // data preparer
        put_padded(&mut pvd[574..702], APPLICATION_ID);
        put_padded(&mut pvd[702..813], ""); // copyright, abstract, bibliographic
        pvd[813..830].copy_from_slice(&created);
        pvd[830..847].copy_from_slice(&created);
        pvd[847..864].copy_from_slice(&UNSET_VOLUME_DATETIME);
        pvd[864..881].copy_from_slice(&UNSET_VOLUME_DATETIME);
        pvd[881] = 1; // file structure version
        pvd
    }

    fn terminator() -> Vec<u8> {
        let mut vd = vec![0u8; SECTOR_SIZE];
        vd[0] = 255;
        vd[1..6].copy_from_slice(b"CD001");
        vd[6] = 1;
        vd
    }
}

/// Offsets of records packed into a directory extent
///
/// Records never straddle a sector boundary. Returns each record's byte
/// offset within the extent and the number of sectors used.
fn pack_records(lengths: &[usize]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(lengths.len());
    let mut sector = 0;
    let mut used = 0;
    for &len in lengths {
        if used + len > SECTOR_SIZE {
            sector += 1;
            used = 0;
        }
        offsets.push(sector * SECTOR_SIZE + used);
        used += len;
    }
    (offsets, sector + 1)
}

fn sectors_for(len: usize) -> u64 {
    len.div_ceil(SECTOR_SIZE) as u64
}

impl ImageWriter for IsoImageBuilder {
    fn create(options: ImageOptions) -> Result<Self> {
        Self::with_options(options)
    }

    fn add_file(&mut self, name: &str, content: Vec<u8>) -> Result<()> {
        let short_name = sanitize_name(name);

        if short_name.is_empty() {
            return Err(SeedError::image_write("file name is empty"));
        }
        if short_name.len() > MAX_IDENTIFIER_LEN {
            return Err(SeedError::image_write(format!(
                "file name {name} exceeds {MAX_IDENTIFIER_LEN} characters"
            )));
        }
        if u32::try_from(content.len()).is_err() {
            return Err(SeedError::image_write(format!(
                "file {name} is too large ({} bytes)",
                content.len()
            )));
        }
        if let Some(existing) = self.files.iter().find(|f| f.short_name == short_name) {
            return Err(SeedError::image_write(format!(
                "{name} and {} both map to {short_name}",
                existing.long_name
            )));
        }

        let file = PendingFile {
            short_name,
            long_name: name.to_string(),
            content,
        };
        // Reject names whose record would not fit before accepting the file
        self.file_record(&file, 0)?;

        debug!(
            "Adding {} as {} ({} bytes)",
            file.long_name,
            file.short_name,
            file.content.len()
        );
        self.files.push(file);
        Ok(())
    }

    fn finalize(self) -> Result<Vec<u8>> {
        let er = rock_ridge::er();

        // Directory entries are ordered by identifier; extents keep insertion order
        let mut order: Vec<usize> = (0..self.files.len()).collect();
        order.sort_by(|&a, &b| self.files[a].short_name.cmp(&self.files[b].short_name));

        let mut lengths: Vec<usize> = self
            .root_self_records(0, 0, er.len() as u32)
            .iter()
            .map(DirectoryRecord::encoded_len)
            .collect();
        for &index in &order {
            lengths.push(self.file_record(&self.files[index], 0)?.encoded_len());
        }
        let (offsets, root_sectors) = pack_records(&lengths);
        let root_size = root_sectors * SECTOR_SIZE;

        let continuation_sector = u64::from(ROOT_DIRECTORY_SECTOR) + root_sectors as u64;
        let mut extents = Vec::with_capacity(self.files.len());
        let mut next_sector = continuation_sector + sectors_for(er.len());
        for file in &self.files {
            extents.push(next_sector);
            next_sector += sectors_for(file.content.len());
        }
        let volume_sectors = u32::try_from(next_sector).map_err(|_| {
            SeedError::image_write(format!("image needs {next_sector} sectors"))
        })?;
        let root_size = u32::try_from(root_size)
            .map_err(|_| SeedError::image_write("root directory is too large"))?;

        // Every extent lies below volume_sectors, which fits in u32
        let continuation_sector = continuation_sector as u32;

        trace!(
            "Layout: {} root sectors, continuation at {}, {} total sectors",
            root_sectors, continuation_sector, volume_sectors
        );

        let mut image = vec![0u8; volume_sectors as usize * SECTOR_SIZE];
        let mut put = |sector: u32, offset: usize, bytes: &[u8]| {
            let start = sector as usize * SECTOR_SIZE + offset;
            image[start..start + bytes.len()].copy_from_slice(bytes);
        };

        put(
            PRIMARY_DESCRIPTOR_SECTOR,
            0,
            &self.primary_volume_descriptor(volume_sectors, root_size),
        );
        put(TERMINATOR_SECTOR, 0, &Self::terminator());
        put(L_PATH_TABLE_SECTOR, 0, &root_path_table(ROOT_DIRECTORY_SECTOR, false));
        put(M_PATH_TABLE_SECTOR, 0, &root_path_table(ROOT_DIRECTORY_SECTOR, true));
        put(continuation_sector, 0, &er);

        let [dot, dotdot] =
            self.root_self_records(root_size, continuation_sector, er.len() as u32);
        put(ROOT_DIRECTORY_SECTOR, offsets[0], &dot.encode());
        put(ROOT_DIRECTORY_SECTOR, offsets[1], &dotdot.encode());
        for (slot, &index) in order.iter().enumerate() {
            let file = &self.files[index];
            let record = self.file_record(file, extents[index] as u32)?;
            put(ROOT_DIRECTORY_SECTOR, offsets[slot + 2], &record.encode());
        }

        for (file, &extent) in self.files.iter().zip(&extents) {
            put(extent as u32, 0, &file.content);
        }

        debug!(
            "Finalized image '{}': {} files, {} bytes",
            self.volume_label,
            self.files.len(),
            image.len()
        );
        Ok(image)
    }
}
