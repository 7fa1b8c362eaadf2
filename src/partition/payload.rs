//! The capability contract a record type implements to be stored in
//! segments.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::{Read, Write};

use ahash::AHashSet;

use crate::error::Result;
use crate::storage::{StructReader, StructWriter};

/// Tombstones of one segment.
pub type Tombstones<P> = AHashSet<<P as Payload>::Tombstone>;

/// Encoding, decoding and collision handling of one kind of segment entry.
///
/// Implementors are zero-sized markers; all state lives in the segment.
pub trait Payload: Debug + Send + Sync + 'static {
    /// In-memory representation of one record's data.
    type Entry: Clone + Debug + Send + Sync;

    /// Marker recorded when a key is deleted from a disk segment.
    type Tombstone: Eq + Hash + Clone + Debug + Send + Sync;

    /// Serialize an entry into a record's data section.
    fn encode(entry: &Self::Entry) -> Vec<u8>;

    /// Deserialize a record, dropping whatever `tombstones` invalidates.
    ///
    /// Returns `None` when nothing of the record survives.
    fn decode(
        key: &str,
        data: &[u8],
        tombstones: &AHashSet<Self::Tombstone>,
    ) -> Result<Option<Self::Entry>>;

    /// Fold `incoming` into the entry already held in memory for the same key.
    fn absorb(existing: &mut Self::Entry, incoming: Self::Entry);

    /// Combine the live entries that several segments hold for one key
    /// during a merge.
    fn combine(key: &str, entries: Vec<Self::Entry>) -> Result<Option<Self::Entry>>;

    /// Tombstone to record when `key` is deleted.
    fn tombstone(key: &str) -> Result<Self::Tombstone>;

    /// Remove `key` from a memory segment's entries directly.
    ///
    /// Returns how many additions the removal undid.
    fn purge(entries: &mut BTreeMap<String, Self::Entry>, key: &str) -> Result<usize>;

    fn write_tombstone<W: Write>(
        tombstone: &Self::Tombstone,
        writer: &mut StructWriter<W>,
    ) -> Result<()>;

    fn read_tombstone<R: Read>(reader: &mut StructReader<R>) -> Result<Self::Tombstone>;
}
