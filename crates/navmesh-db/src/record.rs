//! Append-only record log backing the tile store
//!
//! Layout: big-endian magic, big-endian format version, then any number of records.
//! Each record is a big-endian `u32` body length followed by the body encoded with
//! postcard. Replaying the records in order rebuilds the store.

use std::borrow::Cow;

use navmesh_common::{Error, InputHash, Result, TileId, TilePosition, TileVersion};
use serde::{Deserialize, Serialize};

pub const STORE_FILE_MAGIC: u32 =
    (b'N' as u32) << 24 | (b'M' as u32) << 16 | (b'D' as u32) << 8 | (b'B' as u32);
pub const STORE_FORMAT_VERSION: u32 = 2;

pub(crate) const HEADER_SIZE: usize = 8;
const LENGTH_SIZE: usize = 4;

/// One mutation of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Record<'a> {
    Insert {
        tile_id: TileId,
        region: Cow<'a, str>,
        tile_position: TilePosition,
        version: TileVersion,
        input_hash: InputHash,
        data: Cow<'a, [u8]>,
    },
    Update {
        tile_id: TileId,
        version: TileVersion,
        data: Cow<'a, [u8]>,
    },
    Delete {
        tile_ids: Cow<'a, [TileId]>,
    },
}

/// Records read back from a store file
#[derive(Debug)]
pub(crate) struct Log {
    pub records: Vec<Record<'static>>,
    /// Length of the prefix holding the header and every complete record
    pub valid_len: u64,
}

pub(crate) fn header() -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(&STORE_FILE_MAGIC.to_be_bytes());
    bytes[4..8].copy_from_slice(&STORE_FORMAT_VERSION.to_be_bytes());
    bytes
}

/// Appends the length-prefixed encoding of `record` to `out`
pub(crate) fn encode_into(record: &Record<'_>, out: &mut Vec<u8>) -> Result<()> {
    let body = postcard::to_allocvec(record).map_err(|e| Error::Serialization(e.to_string()))?;
    let len = u32::try_from(body.len())
        .map_err(|_| Error::Serialization(format!("record of {} bytes is too large", body.len())))?;

    out.reserve(LENGTH_SIZE + body.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&body);
    Ok(())
}

/// Reads every complete record of a store file
///
/// An empty file holds no records. A record cut short at the end of the file (an
/// interrupted append) is dropped, and `valid_len` stops before it.
pub(crate) fn decode(bytes: &[u8]) -> Result<Log> {
    if bytes.is_empty() {
        return Ok(Log {
            records: Vec::new(),
            valid_len: 0,
        });
    }
    if bytes.len() < HEADER_SIZE {
        return Err(Error::CorruptStore(format!(
            "file of {} bytes is shorter than the header",
            bytes.len()
        )));
    }

    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[0..4]);
    let magic = u32::from_be_bytes(word);
    if magic != STORE_FILE_MAGIC {
        return Err(Error::CorruptStore(format!("invalid magic {:#010x}", magic)));
    }

    word.copy_from_slice(&bytes[4..8]);
    let version = u32::from_be_bytes(word);
    if version != STORE_FORMAT_VERSION {
        return Err(Error::CorruptStore(format!(
            "unsupported format version {}",
            version
        )));
    }

    let mut records = Vec::new();
    let mut offset = HEADER_SIZE;
    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        if remaining < LENGTH_SIZE {
            log::warn!("Ignoring {} trailing bytes of an incomplete record", remaining);
            break;
        }
        word.copy_from_slice(&bytes[offset..offset + LENGTH_SIZE]);
        let len = u32::from_be_bytes(word) as usize;
        if remaining - LENGTH_SIZE < len {
            log::warn!(
                "Ignoring incomplete record at offset {} ({} of {} bytes present)",
                offset,
                remaining - LENGTH_SIZE,
                len
            );
            break;
        }

        let body = &bytes[offset + LENGTH_SIZE..offset + LENGTH_SIZE + len];
        let record: Record<'static> = postcard::from_bytes(body)
            .map_err(|e| Error::CorruptStore(format!("record at offset {}: {}", offset, e)))?;
        records.push(record);
        offset += LENGTH_SIZE + len;
    }

    Ok(Log {
        records,
        valid_len: offset as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(id: u64) -> Record<'static> {
        Record::Insert {
            tile_id: TileId(id),
            region: Cow::Borrowed("sys::default"),
            tile_position: TilePosition::new(3, -7),
            version: TileVersion(1),
            input_hash: InputHash::of(&id.to_le_bytes()),
            data: Cow::Owned(vec![1, 2, 3]),
        }
    }

    fn encode(records: &[Record<'_>]) -> Vec<u8> {
        let mut bytes = header().to_vec();
        for record in records {
            encode_into(record, &mut bytes).unwrap();
        }
        bytes
    }

    #[test]
    fn test_header_is_big_endian_magic() {
        let bytes = header();
        assert_eq!(&bytes[0..4], b"NMDB");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_records_replay_in_order() {
        let records = vec![
            insert(1),
            insert(2),
            Record::Update {
                tile_id: TileId(1),
                version: TileVersion(2),
                data: Cow::Borrowed(&b"new"[..]),
            },
            Record::Delete {
                tile_ids: Cow::Owned(vec![TileId(2)]),
            },
        ];
        let bytes = encode(&records);

        let log = decode(&bytes).unwrap();
        assert_eq!(log.records, records);
        assert_eq!(log.valid_len, bytes.len() as u64);
    }

    #[test]
    fn test_empty_file_has_no_records() {
        let log = decode(&[]).unwrap();
        assert!(log.records.is_empty());
        assert_eq!(log.valid_len, 0);

        let log = decode(&header()).unwrap();
        assert!(log.records.is_empty());
        assert_eq!(log.valid_len, HEADER_SIZE as u64);
    }

    #[test]
    fn test_rejects_foreign_files() {
        assert!(matches!(decode(b"NMD"), Err(Error::CorruptStore(_))));
        assert!(matches!(decode(b"VOXL\0\0\0\x02"), Err(Error::CorruptStore(_))));

        let mut bytes = header();
        bytes[7] = 9;
        assert!(matches!(decode(&bytes), Err(Error::CorruptStore(_))));
    }

    #[test]
    fn test_incomplete_trailing_record_is_dropped() {
        let complete = encode(&[insert(1)]);
        let bytes = encode(&[insert(1), insert(2)]);

        for cut in [complete.len() + 2, bytes.len() - 1] {
            let log = decode(&bytes[..cut]).unwrap();
            assert_eq!(log.records, vec![insert(1)]);
            assert_eq!(log.valid_len, complete.len() as u64);
        }
    }

    #[test]
    fn test_rejects_garbled_complete_record() {
        let mut bytes = header().to_vec();
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFF]);
        assert!(matches!(decode(&bytes), Err(Error::CorruptStore(_))));
    }
}
