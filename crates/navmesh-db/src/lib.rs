//! Durable store of built navigation mesh tiles
//!
//! [`NavMeshDb`] maps a world region, tile position and content hash of the build input
//! to an assigned tile id, a version and the built tile data. It lets a new process
//! reuse tiles built by an earlier one instead of running the builder again.
//!
//! The store file is an append-only log: every successful mutation appends one record
//! and [`NavMeshDb::open`] replays them. A mutation whose append fails truncates the
//! file back to its previous length and leaves the store in the state it had before
//! the call. [`NavMeshDb::compact`] rewrites the log with one record per stored tile.

mod record;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use navmesh_common::{Error, InputHash, Result, TileId, TilePosition, TileVersion};
use record::Record;

pub use record::{STORE_FILE_MAGIC, STORE_FORMAT_VERSION};

/// Identity and version of a stored tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub tile_id: TileId,
    pub version: TileVersion,
}

/// Stored tile including its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileData {
    pub tile_id: TileId,
    pub version: TileVersion,
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct TileRow {
    region: String,
    tile_position: TilePosition,
    version: TileVersion,
    input_hash: InputHash,
    data: Vec<u8>,
}

/// Tiles of one region by position and input hash
type RegionKeys = BTreeMap<(TilePosition, InputHash), TileId>;

#[derive(Debug)]
pub struct NavMeshDb {
    path: Option<PathBuf>,
    /// Bytes of the store file holding the header and complete records
    len: u64,
    rows: BTreeMap<TileId, TileRow>,
    keys: BTreeMap<String, RegionKeys>,
}

impl NavMeshDb {
    /// Opens the store at `path`, starting empty if the file does not exist yet
    ///
    /// The file is not created until the first mutation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let replay = match fs::read(&path) {
            Ok(bytes) => record::decode(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => record::Log {
                records: Vec::new(),
                valid_len: 0,
            },
            Err(e) => return Err(e.into()),
        };

        let mut db = Self {
            path: Some(path),
            len: replay.valid_len,
            rows: BTreeMap::new(),
            keys: BTreeMap::new(),
        };
        let record_count = replay.records.len();
        for record in replay.records {
            db.apply(record).map_err(|e| match e {
                Error::CorruptStore(_) => e,
                other => Error::CorruptStore(other.to_string()),
            })?;
        }

        log::info!(
            "Opened tile store {} with {} tiles from {} records",
            db.path().map(|p| p.display().to_string()).unwrap_or_default(),
            db.rows.len(),
            record_count
        );
        Ok(db)
    }

    /// Creates a store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            len: 0,
            rows: BTreeMap::new(),
            keys: BTreeMap::new(),
        }
    }

    /// File backing the store, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bytes of the store file in use, 0 for in-memory stores
    pub fn file_size(&self) -> u64 {
        self.len
    }

    /// Largest assigned tile id, or 0 for an empty store
    pub fn get_max_tile_id(&self) -> TileId {
        self.rows
            .last_key_value()
            .map(|(id, _)| *id)
            .unwrap_or_default()
    }

    pub fn tile_count(&self) -> usize {
        self.rows.len()
    }

    /// Inserts a new tile, returning the number of inserted rows
    ///
    /// Fails with [`Error::DuplicateTileId`] if `tile_id` is taken and with
    /// [`Error::DuplicateTileKey`] if a tile with the same region, position and input
    /// hash exists. Nothing changes on failure.
    pub fn insert_tile(
        &mut self,
        tile_id: TileId,
        region: &str,
        tile_position: TilePosition,
        version: TileVersion,
        input_hash: &InputHash,
        data: &[u8],
    ) -> Result<usize> {
        if let Err(e) = self.check_insert(tile_id, region, tile_position, input_hash) {
            log::warn!("Rejected tile {} for region '{}' at {}: {}", tile_id, region, tile_position, e);
            return Err(e);
        }

        let record = Record::Insert {
            tile_id,
            region: Cow::Borrowed(region),
            tile_position,
            version,
            input_hash: *input_hash,
            data: Cow::Borrowed(data),
        };
        self.append(&record)?;
        self.apply(record)?;
        Ok(1)
    }

    /// Replaces version and data of tile `tile_id`, returning the number of updated rows
    pub fn update_tile(&mut self, tile_id: TileId, version: TileVersion, data: &[u8]) -> Result<usize> {
        if !self.rows.contains_key(&tile_id) {
            return Ok(0);
        }

        let record = Record::Update {
            tile_id,
            version,
            data: Cow::Borrowed(data),
        };
        self.append(&record)?;
        self.apply(record)?;
        Ok(1)
    }

    pub fn find_tile(&self, region: &str, tile_position: TilePosition, input_hash: &InputHash) -> Option<Tile> {
        let (tile_id, row) = self.find_row(region, tile_position, input_hash)?;
        Some(Tile {
            tile_id,
            version: row.version,
        })
    }

    pub fn get_tile_data(
        &self,
        region: &str,
        tile_position: TilePosition,
        input_hash: &InputHash,
    ) -> Option<TileData> {
        let (tile_id, row) = self.find_row(region, tile_position, input_hash)?;
        Some(TileData {
            tile_id,
            version: row.version,
            data: row.data.clone(),
        })
    }

    /// Deletes every tile of `region` at `tile_position`, returning how many were removed
    pub fn delete_tiles_at(&mut self, region: &str, tile_position: TilePosition) -> Result<usize> {
        let Some(region_keys) = self.keys.get(region) else {
            return Ok(0);
        };
        let range = (tile_position, InputHash([0; 32]))..=(tile_position, InputHash([u8::MAX; 32]));
        let tile_ids: Vec<TileId> = region_keys.range(range).map(|(_, id)| *id).collect();
        if tile_ids.is_empty() {
            return Ok(0);
        }

        let removed = tile_ids.len();
        let record = Record::Delete {
            tile_ids: Cow::Owned(tile_ids),
        };
        self.append(&record)?;
        self.apply(record)?;
        Ok(removed)
    }

    /// Rewrites the store file with one record per stored tile
    ///
    /// The new log is written to a temporary sibling file and renamed over the store
    /// file. In-memory stores have nothing to compact.
    pub fn compact(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut bytes = record::header().to_vec();
        for (tile_id, row) in &self.rows {
            let record = Record::Insert {
                tile_id: *tile_id,
                region: Cow::Borrowed(row.region.as_str()),
                tile_position: row.tile_position,
                version: row.version,
                input_hash: row.input_hash,
                data: Cow::Borrowed(row.data.as_slice()),
            };
            record::encode_into(&record, &mut bytes)?;
        }

        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);
        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        log::info!(
            "Compacted tile store {} from {} to {} bytes",
            path.display(),
            self.len,
            bytes.len()
        );
        self.len = bytes.len() as u64;
        Ok(())
    }

    fn find_row(
        &self,
        region: &str,
        tile_position: TilePosition,
        input_hash: &InputHash,
    ) -> Option<(TileId, &TileRow)> {
        let tile_id = *self.keys.get(region)?.get(&(tile_position, *input_hash))?;
        Some((tile_id, self.rows.get(&tile_id)?))
    }

    fn check_insert(
        &self,
        tile_id: TileId,
        region: &str,
        tile_position: TilePosition,
        input_hash: &InputHash,
    ) -> Result<()> {
        if self.rows.contains_key(&tile_id) {
            return Err(Error::DuplicateTileId(tile_id));
        }
        if self.find_row(region, tile_position, input_hash).is_some() {
            return Err(Error::DuplicateTileKey {
                region: region.to_string(),
                tile_position,
            });
        }
        Ok(())
    }

    /// Applies one record to the in-memory state
    fn apply(&mut self, record: Record<'_>) -> Result<()> {
        match record {
            Record::Insert {
                tile_id,
                region,
                tile_position,
                version,
                input_hash,
                data,
            } => {
                self.check_insert(tile_id, &region, tile_position, &input_hash)?;
                let region = region.into_owned();
                self.keys
                    .entry(region.clone())
                    .or_default()
                    .insert((tile_position, input_hash), tile_id);
                self.rows.insert(
                    tile_id,
                    TileRow {
                        region,
                        tile_position,
                        version,
                        input_hash,
                        data: data.into_owned(),
                    },
                );
            }
            Record::Update { tile_id, version, data } => {
                let row = self
                    .rows
                    .get_mut(&tile_id)
                    .ok_or_else(|| Error::CorruptStore(format!("update of unknown tile {}", tile_id)))?;
                row.version = version;
                row.data = data.into_owned();
            }
            Record::Delete { tile_ids } => {
                for tile_id in tile_ids.iter() {
                    let row = self
                        .rows
                        .remove(tile_id)
                        .ok_or_else(|| Error::CorruptStore(format!("delete of unknown tile {}", tile_id)))?;
                    if let Some(region_keys) = self.keys.get_mut(&row.region) {
                        region_keys.remove(&(row.tile_position, row.input_hash));
                        if region_keys.is_empty() {
                            self.keys.remove(&row.region);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Appends `record` to the store file
    ///
    /// On failure the file is cut back to the length it had before the call.
    fn append(&mut self, record: &Record<'_>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut bytes = Vec::new();
        if self.len == 0 {
            bytes.extend_from_slice(&record::header());
        }
        record::encode_into(record, &mut bytes)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(self.len == 0)
            .open(path)?;
        if let Err(e) = write_at(&mut file, self.len, &bytes) {
            let _ = file.set_len(self.len);
            return Err(e.into());
        }

        log::debug!(
            "Appended {} bytes to {} at offset {}",
            bytes.len(),
            path.display(),
            self.len
        );
        self.len += bytes.len() as u64;
        Ok(())
    }
}

/// Writes `bytes` at `offset`, dropping anything stored past it
fn write_at(file: &mut fs::File, offset: u64, bytes: &[u8]) -> std::io::Result<()> {
    file.set_len(offset)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    file.sync_data()
}
