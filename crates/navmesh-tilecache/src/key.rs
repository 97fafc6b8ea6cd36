//! Content-addressed cache keys
//!
//! A key is the byte serialization of a geometry snapshot plus the off-mesh
//! connections of its tile. Lookups happen far more often than geometry changes, so a
//! lookup never materializes the key: [`SnapshotKeyView`] streams the serialization
//! straight into a comparison against stored bytes and stops at the first difference.
//!
//! Layout (little-endian, each section prefixed by a `u32` element count):
//! indices (`i32`), vertices (`f32`), areas (`u8`), water (`i32` cell size + 3×`f32`
//! shift), off-mesh connections (3×`f32` start + 3×`f32` end + `u8` area).

use byteorder::{ByteOrder, LittleEndian};
use navmesh_common::OffMeshConnection;
use navmesh_geometry::GeometrySnapshot;
use std::cmp::Ordering;

/// Receiver of serialized key bytes
pub trait KeySink {
    fn put(&mut self, bytes: &[u8]);

    fn put_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    fn put_u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.put(&buf);
    }

    fn put_i32(&mut self, value: i32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_i32(&mut buf, value);
        self.put(&buf);
    }

    fn put_f32(&mut self, value: f32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_f32(&mut buf, value);
        self.put(&buf);
    }

    fn put_len(&mut self, len: usize) {
        self.put_u32(len as u32);
    }
}

impl KeySink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Serialize the key of `snapshot` and `connections` into `sink`
///
/// This is the only definition of the key layout; both the materialized key and the
/// lazy comparison go through it.
pub fn write_key<S: KeySink>(sink: &mut S, snapshot: &GeometrySnapshot, connections: &[OffMeshConnection]) {
    let mesh = snapshot.mesh();

    sink.put_len(mesh.indices.len());
    for index in &mesh.indices {
        sink.put_i32(*index);
    }

    sink.put_len(mesh.vertices.len());
    for coordinate in &mesh.vertices {
        sink.put_f32(*coordinate);
    }

    sink.put_len(mesh.areas.len());
    for area in &mesh.areas {
        sink.put_u8(area.as_u8());
    }

    sink.put_len(snapshot.water().len());
    for water in snapshot.water() {
        sink.put_i32(water.cell_size);
        sink.put_f32(water.shift.x);
        sink.put_f32(water.shift.y);
        sink.put_f32(water.shift.z);
    }

    sink.put_len(connections.len());
    for connection in connections {
        sink.put_f32(connection.start.x);
        sink.put_f32(connection.start.y);
        sink.put_f32(connection.start.z);
        sink.put_f32(connection.end.x);
        sink.put_f32(connection.end.y);
        sink.put_f32(connection.end.z);
        sink.put_u8(connection.area_type.as_u8());
    }
}

/// Exact size in bytes of the key [`write_key`] produces
pub fn key_size(snapshot: &GeometrySnapshot, connections: &[OffMeshConnection]) -> usize {
    const COUNT: usize = 4;
    let mesh = snapshot.mesh();
    COUNT
        + mesh.indices.len() * 4
        + COUNT
        + mesh.vertices.len() * 4
        + COUNT
        + mesh.areas.len()
        + COUNT
        + snapshot.water().len() * 16
        + COUNT
        + connections.len() * 25
}

/// Materialize the full key
pub fn make_key(snapshot: &GeometrySnapshot, connections: &[OffMeshConnection]) -> Vec<u8> {
    let mut key = Vec::with_capacity(key_size(snapshot, connections));
    write_key(&mut key, snapshot, connections);
    key
}

/// Sink comparing streamed bytes against a stored key
///
/// Ordering matches slice comparison: first differing byte, then length.
struct CompareSink<'a> {
    other: &'a [u8],
    offset: usize,
    ordering: Ordering,
}

impl<'a> CompareSink<'a> {
    fn new(other: &'a [u8]) -> Self {
        Self {
            other,
            offset: 0,
            ordering: Ordering::Equal,
        }
    }

    fn finish(self) -> Ordering {
        if self.ordering != Ordering::Equal {
            return self.ordering;
        }
        if self.offset < self.other.len() {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl KeySink for CompareSink<'_> {
    fn put(&mut self, bytes: &[u8]) {
        if self.ordering != Ordering::Equal {
            return;
        }
        let rest = &self.other[self.offset..];
        let n = bytes.len().min(rest.len());
        match bytes[..n].cmp(&rest[..n]) {
            Ordering::Equal if n < bytes.len() => self.ordering = Ordering::Greater,
            Ordering::Equal => self.offset += n,
            ordering => self.ordering = ordering,
        }
    }
}

/// Three-way comparison of a key against stored key bytes
pub trait KeyView {
    /// Compare this key with `other` using byte order
    fn compare(&self, other: &[u8]) -> Ordering;
}

/// View over already serialized key bytes
#[derive(Debug, Clone, Copy)]
pub struct BytesKeyView<'a>(pub &'a [u8]);

impl KeyView for BytesKeyView<'_> {
    fn compare(&self, other: &[u8]) -> Ordering {
        self.0.cmp(other)
    }
}

/// Lazy view over the key a snapshot would serialize to
#[derive(Debug, Clone, Copy)]
pub struct SnapshotKeyView<'a> {
    snapshot: &'a GeometrySnapshot,
    connections: &'a [OffMeshConnection],
}

impl<'a> SnapshotKeyView<'a> {
    pub fn new(snapshot: &'a GeometrySnapshot, connections: &'a [OffMeshConnection]) -> Self {
        Self {
            snapshot,
            connections,
        }
    }
}

impl KeyView for SnapshotKeyView<'_> {
    fn compare(&self, other: &[u8]) -> Ordering {
        let mut sink = CompareSink::new(other);
        write_key(&mut sink, self.snapshot, self.connections);
        sink.finish()
    }
}
