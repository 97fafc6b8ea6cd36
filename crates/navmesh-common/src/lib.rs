//! Common value types shared by the navigation mesh tile tracking crates
//!
//! Grid coordinates, tile bounds, versions, transforms and the identifiers used by
//! the persistent tile store all live here, together with the error type returned by
//! every fallible operation in the workspace.

mod area;
mod ids;
mod tile;
mod transform;
mod version;

pub use area::*;
pub use ids::*;
pub use tile::*;
pub use transform::*;
pub use version::*;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("tile id {0} already exists")]
    DuplicateTileId(TileId),

    #[error("tile for region '{region}' at {tile_position} with the same input already exists")]
    DuplicateTileKey {
        region: String,
        tile_position: TilePosition,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt tile store: {0}")]
    CorruptStore(String),
}

impl Error {
    /// Returns true for uniqueness violations reported by the tile store
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::DuplicateTileId(_) | Error::DuplicateTileKey { .. }
        )
    }
}

/// Result type for tile tracking operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        assert!(Error::DuplicateTileId(TileId(3)).is_conflict());
        assert!(Error::DuplicateTileKey {
            region: "sys::default".to_string(),
            tile_position: TilePosition::new(1, 2),
        }
        .is_conflict());
        assert!(!Error::CorruptStore("bad magic".to_string()).is_conflict());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::DuplicateTileId(TileId(53));
        assert_eq!(err.to_string(), "tile id 53 already exists");

        let err = Error::DuplicateTileKey {
            region: "sys::default".to_string(),
            tile_position: TilePosition::new(3, 4),
        };
        assert!(err.to_string().contains("(3, 4)"));
    }
}
