use core::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::{keccak_512, HASH_BYTES, NODE_WORDS};

/// The 64-byte unit of cache and dataset storage.
///
/// The bytes are always kept in canonical little-endian order. The 32-bit
/// and 64-bit word views are read from and written to those bytes on demand,
/// so every view agrees on every host.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node([u8; HASH_BYTES]);

impl Node {
    pub const fn zero() -> Self {
        Self([0u8; HASH_BYTES])
    }

    pub const fn from_bytes(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Copies one node out of a buffer of nodes.
    ///
    /// `bytes` must hold at least `HASH_BYTES` bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut inner = [0u8; HASH_BYTES];
        inner.copy_from_slice(&bytes[..HASH_BYTES]);
        Self(inner)
    }

    pub fn from_words(words: &[u32; NODE_WORDS]) -> Self {
        let mut inner = [0u8; HASH_BYTES];
        LittleEndian::write_u32_into(words, &mut inner);
        Self(inner)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    pub fn word(&self, i: usize) -> u32 {
        LittleEndian::read_u32(&self.0[i * 4..])
    }

    pub fn set_word(&mut self, i: usize, value: u32) {
        LittleEndian::write_u32(&mut self.0[i * 4..], value);
    }

    pub fn double_word(&self, i: usize) -> u64 {
        LittleEndian::read_u64(&self.0[i * 8..])
    }

    pub fn words(&self) -> [u32; NODE_WORDS] {
        let mut words = [0u32; NODE_WORDS];
        LittleEndian::read_u32_into(&self.0, &mut words);
        words
    }

    pub fn double_words(&self) -> [u64; NODE_WORDS / 2] {
        let mut words = [0u64; NODE_WORDS / 2];
        LittleEndian::read_u64_into(&self.0, &mut words);
        words
    }

    /// Keccak-512 of the node bytes, as a new node.
    pub fn keccak_512(&self) -> Node {
        Node(keccak_512(&self.0))
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::zero()
    }
}

impl AsRef<[u8]> for Node {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_BYTES]> for Node {
    fn from(b: [u8; HASH_BYTES]) -> Self {
        Self(b)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node(0x")?;
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}
