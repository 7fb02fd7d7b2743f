//! Directory record and path table encoding

/// Fixed part of a directory record, up to the file identifier
pub const RECORD_HEADER_LEN: usize = 33;

/// Largest directory record
pub const MAX_RECORD_LEN: usize = 255;

/// Directory flag bit
pub const FLAG_DIRECTORY: u8 = 0x02;

/// Identifier of the "." record
pub const DOT: &[u8] = &[0x00];

/// Identifier of the ".." record
pub const DOTDOT: &[u8] = &[0x01];

/// Both-byte-order 16-bit field (ECMA-119 7.2.3)
pub fn both_u16(value: u16) -> [u8; 4] {
    let le = value.to_le_bytes();
    let be = value.to_be_bytes();
    [le[0], le[1], be[0], be[1]]
}

/// Both-byte-order 32-bit field (ECMA-119 7.3.3)
pub fn both_u32(value: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&value.to_le_bytes());
    out[4..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Write `text` into `field`, padding with spaces
pub fn put_padded(field: &mut [u8], text: &str) {
    field.fill(b' ');
    let len = text.len().min(field.len());
    field[..len].copy_from_slice(&text.as_bytes()[..len]);
}

/// A directory record (ECMA-119 9.1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub extent: u32,
    pub data_len: u32,
    pub recorded: [u8; 7],
    pub flags: u8,
    pub identifier: Vec<u8>,
    /// System use area (SUSP entries)
    pub system_use: Vec<u8>,
}

impl DirectoryRecord {
    fn identifier_padding(&self) -> usize {
        // Pads the identifier so the system use area starts on an even offset
        usize::from(self.identifier.len() % 2 == 0)
    }

    /// Encoded length, rounded up to an even number of bytes
    pub fn encoded_len(&self) -> usize {
        let len = RECORD_HEADER_LEN
            + self.identifier.len()
            + self.identifier_padding()
            + self.system_use.len();
        len + len % 2
    }

    pub fn encode(&self) -> Vec<u8> {
        let len = self.encoded_len();
        let mut out = Vec::with_capacity(len);
        out.push(len as u8);
        out.push(0); // extended attribute record length
        out.extend_from_slice(&both_u32(self.extent));
        out.extend_from_slice(&both_u32(self.data_len));
        out.extend_from_slice(&self.recorded);
        out.push(self.flags);
        out.push(0); // file unit size
        out.push(0); // interleave gap
        out.extend_from_slice(&both_u16(1)); // volume sequence number
        out.push(self.identifier.len() as u8);
        out.extend_from_slice(&self.identifier);
        out.resize(out.len() + self.identifier_padding(), 0);
        out.extend_from_slice(&self.system_use);
        out.resize(len, 0);
        out
    }
}

/// Path table holding only the root directory (ECMA-119 9.4)
pub fn root_path_table(root_extent: u32, big_endian: bool) -> Vec<u8> {
    let location = if big_endian {
        root_extent.to_be_bytes()
    } else {
        root_extent.to_le_bytes()
    };
    let parent: [u8; 2] = if big_endian {
        1u16.to_be_bytes()
    } else {
        1u16.to_le_bytes()
    };

    let mut out = vec![1, 0];
    out.extend_from_slice(&location);
    out.extend_from_slice(&parent);
    // Root identifier followed by the padding byte for an odd length
    out.extend_from_slice(&[0, 0]);
    out
}
