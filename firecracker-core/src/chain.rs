//! Grow-only segmented buffer used by every parser while it ingests one
//! source, plus the flatten step that produces the contiguous array the
//! rest of the pipeline operates on.

use crate::record::PacketRecord;

/// Records per chunk. Matches the original tool's `PKTS_PER_CHUNK`; large
/// enough that the chain overhead (one `Vec` allocation per chunk) stays
/// negligible next to a real capture's record count.
pub const CHUNK_CAPACITY: usize = 256 * 1024;

/// One fixed-capacity segment of a [`Chain`].
struct Chunk {
    records: Vec<PacketRecord>,
}

impl Chunk {
    fn new() -> Self {
        Chunk {
            records: Vec::with_capacity(CHUNK_CAPACITY),
        }
    }

    fn is_full(&self) -> bool {
        self.records.len() >= CHUNK_CAPACITY
    }
}

/// A singly-linked list of chunks, appended to by a single parser and
/// consumed exactly once by [`Chain::flatten`].
pub struct Chain {
    chunks: Vec<Chunk>,
}

impl Chain {
    pub fn new() -> Self {
        Chain { chunks: Vec::new() }
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|c| c.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one record, allocating a new chunk if the tail is full or absent.
    pub fn push(&mut self, record: PacketRecord) {
        if self.chunks.last().is_none_or(Chunk::is_full) {
            self.chunks.push(Chunk::new());
        }
        self.chunks.last_mut().unwrap().records.push(record);
    }

    /// Copies every chunk into one contiguous buffer, in append order.
    /// The chain is consumed: there is no use for the chunked form once
    /// a flat array exists.
    pub fn flatten(self) -> Vec<PacketRecord> {
        let total = self.len();
        let mut out = Vec::with_capacity(total);
        for chunk in self.chunks {
            out.extend_from_slice(&chunk.records);
        }
        out
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<PacketRecord> for Chain {
    fn from_iter<I: IntoIterator<Item = PacketRecord>>(iter: I) -> Self {
        let mut chain = Chain::new();
        for record in iter {
            chain.push(record);
        }
        chain
    }
}
