//! Index entry codec
//!
//! One fixed-width record describing where a tile's bytes are stored.

/// Encoded size of an entry: FileIndex (2) + Offset (8) + Size (4) + Flags (1)
pub const ENTRY_SIZE: usize = 15;

/// Location descriptor of one grid cell
///
/// `size == 0` means the cell is absent. Flag bits have no meaning beyond
/// `0 = normal`; they are carried through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    /// Sequential number of the blob file holding the chunk
    pub file_index: u16,
    /// Byte offset of the chunk inside that file
    pub offset: u64,
    /// Chunk length in bytes (0 = absent)
    pub size: u32,
    pub flags: u8,
}

impl IndexEntry {
    pub fn new(file_index: u16, offset: u64, size: u32) -> Self {
        Self {
            file_index,
            offset,
            size,
            flags: 0,
        }
    }

    /// Same location with the given flag bits
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// The all-zero entry every cell starts with
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.size == 0
    }

    /// Encode as big-endian `>HQIB`
    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[0..2].copy_from_slice(&self.file_index.to_be_bytes());
        buf[2..10].copy_from_slice(&self.offset.to_be_bytes());
        buf[10..14].copy_from_slice(&self.size.to_be_bytes());
        buf[14] = self.flags;
        buf
    }

    /// Decode from big-endian `>HQIB`
    pub fn decode(buf: &[u8; ENTRY_SIZE]) -> Self {
        Self {
            file_index: u16::from_be_bytes([buf[0], buf[1]]),
            offset: u64::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
            ]),
            size: u32::from_be_bytes([buf[10], buf[11], buf[12], buf[13]]),
            flags: buf[14],
        }
    }
}
