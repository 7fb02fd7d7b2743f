//! Minimal ISO 9660 reader for inspecting generated images

#![allow(dead_code)]

const SECTOR: usize = 2048;

/// A file found in the root directory
#[derive(Debug, Clone)]
pub struct IsoEntry {
    pub short_name: String,
    pub rock_ridge_name: Option<String>,
    pub content: Vec<u8>,
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn primary_descriptor(image: &[u8]) -> &[u8] {
    let pvd = &image[16 * SECTOR..17 * SECTOR];
    assert_eq!(pvd[0], 1, "sector 16 is not a primary volume descriptor");
    assert_eq!(&pvd[1..6], b"CD001");
    pvd
}

/// Volume identifier with padding removed
pub fn volume_label(image: &[u8]) -> String {
    String::from_utf8_lossy(&primary_descriptor(image)[40..72])
        .trim_end()
        .to_string()
}

/// Volume space size in sectors
pub fn volume_sectors(image: &[u8]) -> usize {
    le_u32(&primary_descriptor(image)[80..84]) as usize
}

fn root_records(image: &[u8]) -> Vec<&[u8]> {
    let root = &primary_descriptor(image)[156..190];
    let extent = le_u32(&root[2..6]) as usize;
    let size = le_u32(&root[10..14]) as usize;
    let dir = &image[extent * SECTOR..extent * SECTOR + size];

    let mut records = Vec::new();
    let mut pos = 0;
    while pos < dir.len() {
        let len = dir[pos] as usize;
        if len == 0 {
            // Rest of this sector is padding
            pos = (pos / SECTOR + 1) * SECTOR;
            continue;
        }
        records.push(&dir[pos..pos + len]);
        pos += len;
    }
    records
}

fn system_use(record: &[u8]) -> &[u8] {
    let id_len = record[32] as usize;
    let start = 33 + id_len + usize::from(id_len % 2 == 0);
    &record[start.min(record.len())..]
}

/// SUSP entries as (signature, payload after the 4-byte header)
pub fn susp_entries(area: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos + 4 <= area.len() {
        let len = area[pos + 2] as usize;
        if len < 4 || pos + len > area.len() {
            break;
        }
        let signature = String::from_utf8_lossy(&area[pos..pos + 2]).to_string();
        entries.push((signature, area[pos + 4..pos + len].to_vec()));
        pos += len;
    }
    entries
}

/// SUSP entries of the root directory's "." record
pub fn root_dot_entries(image: &[u8]) -> Vec<(String, Vec<u8>)> {
    susp_entries(system_use(root_records(image)[0]))
}

/// Files in the root directory, in directory order
pub fn root_entries(image: &[u8]) -> Vec<IsoEntry> {
    root_records(image)
        .into_iter()
        .filter(|record| record[32] != 1 || (record[33] != 0 && record[33] != 1))
        .map(|record| {
            let id_len = record[32] as usize;
            let short_name = String::from_utf8_lossy(&record[33..33 + id_len]).to_string();
            let extent = le_u32(&record[2..6]) as usize;
            let size = le_u32(&record[10..14]) as usize;
            let content = image[extent * SECTOR..extent * SECTOR + size].to_vec();
            let rock_ridge_name = susp_entries(system_use(record))
                .into_iter()
                .find(|(signature, _)| signature == "NM")
                .map(|(_, data)| String::from_utf8_lossy(&data[1..]).to_string());
            IsoEntry {
                short_name,
                rock_ridge_name,
                content,
            }
        })
        .collect()
}

/// Look up a root file by its Rock Ridge name
pub fn find_file(image: &[u8], name: &str) -> Option<IsoEntry> {
    root_entries(image)
        .into_iter()
        .find(|entry| entry.rock_ridge_name.as_deref() == Some(name))
}
