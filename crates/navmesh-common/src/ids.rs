//! Identifiers of persisted navigation mesh tiles

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Numeric id assigned to a persisted tile; unique and monotonic within a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl TileId {
    pub fn next(self) -> TileId {
        TileId(self.0 + 1)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of the tile build pipeline that produced a persisted tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileVersion(pub u32);

/// SHA-256 of a tile build input
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputHash(pub [u8; 32]);

impl InputHash {
    /// Hash the serialized build input
    pub fn of(input: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(input);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for InputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputHash({})", self)
    }
}

impl fmt::Display for InputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_hash_is_deterministic() {
        assert_eq!(InputHash::of(b"tile input"), InputHash::of(b"tile input"));
        assert_ne!(InputHash::of(b"tile input"), InputHash::of(b"tile inpuT"));
    }

    #[test]
    fn test_input_hash_display() {
        // SHA-256 of the empty string
        assert_eq!(
            InputHash::of(b"").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_tile_id_next() {
        assert_eq!(TileId(0).next(), TileId(1));
        assert_eq!(TileId(53).next(), TileId(54));
    }
}
