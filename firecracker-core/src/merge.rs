//! Combines the per-source record arrays produced by the input
//! dispatcher into one time-ordered array.

use crate::record::PacketRecord;

/// Flattens every chain and stable-sorts the result by `(ts_sec, ts_usec)`.
///
/// This is the only merge implementation evaluation should use. A stable
/// sort is required: [`crate::engine`]'s sort comparator relies on
/// timestamp order as its final tie-break, which only holds if records
/// that were already in time order going in stay in relative order
/// through the sort.
pub fn merge(sources: Vec<Vec<PacketRecord>>) -> Vec<PacketRecord> {
    let total: usize = sources.iter().map(|s| s.len()).sum();
    let mut merged = Vec::with_capacity(total);
    for source in sources {
        merged.extend(source);
    }
    merged.sort_by_key(PacketRecord::timestamp);
    merged
}

/// A k-way merge that walks all sources concurrently, always taking the
/// globally-smallest front record. Never call this: it is kept only as
/// a contrast with [`merge`]. Given inputs whose chunk boundaries don't
/// align with a strict per-source time order (which real captures do
/// not guarantee), the "smallest candidate so far" scan below does not
/// correctly handle a chain reaching the end of one chunk before its
/// next chunk's first record has been compared against the current
/// candidates, and can silently drop or misorder records. Use [`merge`].
#[allow(dead_code)]
fn merge_by_selection_buggy(mut sources: Vec<Vec<PacketRecord>>) -> Vec<PacketRecord> {
    let total: usize = sources.iter().map(|s| s.len()).sum();
    let mut merged = Vec::with_capacity(total);
    let mut cursors = vec![0usize; sources.len()];

    loop {
        let mut best: Option<(usize, PacketRecord)> = None;
        for (i, source) in sources.iter().enumerate() {
            if cursors[i] >= source.len() {
                continue;
            }
            let candidate = source[cursors[i]];
            let better = match &best {
                None => true,
                Some((_, current)) => candidate.timestamp() < current.timestamp(),
            };
            if better {
                best = Some((i, candidate));
            }
        }
        match best {
            Some((i, candidate)) => {
                merged.push(candidate);
                cursors[i] += 1;
            }
            None => break,
        }
    }

    sources.clear();
    merged
}
