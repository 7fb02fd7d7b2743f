//! System Use Sharing Protocol and Rock Ridge (RRIP 1.09) entries
//!
//! Entries are appended to a directory record's system use area. The root
//! "." record carries `SP` and a `CE` pointing at the continuation area that
//! holds the `ER` entry identifying the extension.

use super::record::both_u32;

/// Extension identifier for RRIP 1.09
pub const RRIP_1991A_ID: &str = "RRIP_1991A";

const RRIP_DESCRIPTOR: &str =
    "THE ROCK RIDGE INTERCHANGE PROTOCOL PROVIDES SUPPORT FOR POSIX FILE SYSTEM SEMANTICS";

const RRIP_SOURCE: &str = "PLEASE CONTACT DISC PUBLISHER FOR SPECIFICATION SOURCE.  \
SEE PUBLISHER IDENTIFIER IN PRIMARY VOLUME DESCRIPTOR FOR CONTACT INFORMATION.";

/// `RR` flag: entry carries `PX`
pub const RR_PX: u8 = 0x01;
/// `RR` flag: entry carries `NM`
pub const RR_NM: u8 = 0x08;
/// `RR` flag: entry carries `TF`
pub const RR_TF: u8 = 0x80;

/// `TF` flags: modify, access and attribute-change times
const TF_MODIFY_ACCESS_ATTRIBUTES: u8 = 0x02 | 0x04 | 0x08;

/// Length of a `PX` entry in RRIP 1.09 (no inode number field)
pub const PX_LEN: usize = 36;

/// Length of a `CE` entry
pub const CE_LEN: usize = 28;

/// Mode of the root directory
pub const DIRECTORY_MODE: u32 = 0o040555;

/// Mode of regular files
pub const FILE_MODE: u32 = 0o100444;

fn header(signature: &[u8; 2], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(signature);
    out.push(len as u8);
    out.push(1); // entry version
    out
}

/// `SP` entry marking the start of SUSP use on the volume
pub fn sp() -> Vec<u8> {
    let mut out = header(b"SP", 7);
    out.extend_from_slice(&[0xBE, 0xEF, 0]);
    out
}

/// `RR` entry listing which Rock Ridge entries follow
pub fn rr(flags: u8) -> Vec<u8> {
    let mut out = header(b"RR", 5);
    out.push(flags);
    out
}

/// `CE` entry pointing at a continuation area
pub fn ce(block: u32, offset: u32, len: u32) -> Vec<u8> {
    let mut out = header(b"CE", CE_LEN);
    out.extend_from_slice(&both_u32(block));
    out.extend_from_slice(&both_u32(offset));
    out.extend_from_slice(&both_u32(len));
    out
}

/// `ER` entry identifying RRIP 1.09
pub fn er() -> Vec<u8> {
    let len = 8 + RRIP_1991A_ID.len() + RRIP_DESCRIPTOR.len() + RRIP_SOURCE.len();
    let mut out = header(b"ER", len);
    out.push(RRIP_1991A_ID.len() as u8);
    out.push(RRIP_DESCRIPTOR.len() as u8);
    out.push(RRIP_SOURCE.len() as u8);
    out.push(1); // extension version
    out.extend_from_slice(RRIP_1991A_ID.as_bytes());
    out.extend_from_slice(RRIP_DESCRIPTOR.as_bytes());
    out.extend_from_slice(RRIP_SOURCE.as_bytes());
    out
}

/// `PX` entry with POSIX mode and link count, owned by root
pub fn px(mode: u32, links: u32) -> Vec<u8> {
    let mut out = header(b"PX", PX_LEN);
    out.extend_from_slice(&both_u32(mode));
    out.extend_from_slice(&both_u32(links));
    out.extend_from_slice(&both_u32(0)); // uid
    out.extend_from_slice(&both_u32(0)); // gid
    out
}

/// `TF` entry with the same 7-byte time for modify, access and attributes
pub fn tf(recorded: [u8; 7]) -> Vec<u8> {
    let mut out = header(b"TF", 5 + 3 * recorded.len());
    out.push(TF_MODIFY_ACCESS_ATTRIBUTES);
    for _ in 0..3 {
        out.extend_from_slice(&recorded);
    }
    out
}

/// `NM` entry carrying the full file name
///
/// Returns `None` when the name does not fit in a single entry.
pub fn nm(name: &str) -> Option<Vec<u8>> {
    let len = 5 + name.len();
    if len > usize::from(u8::MAX) {
        return None;
    }
    let mut out = header(b"NM", len);
    out.push(0); // flags
    out.extend_from_slice(name.as_bytes());
    Some(out)
}
