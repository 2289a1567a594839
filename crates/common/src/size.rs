//! Reverse-engineering of the store's chunking and node envelope format.
//!
//! A stored node carries a small varint-encoded-length envelope on top of
//! the raw payload, so the cumulative size reported by the store is larger
//! than the logical file size. The overhead is a step function of the
//! payload length because the varint length prefix grows in width at fixed
//! breakpoints. Files at or above the chunking threshold are split into
//! fixed-size chunks plus a remainder chunk, each with its own envelope.
//!
//! This is an external-format dependency: if the store ever changes its
//! chunk size constant or envelope encoding, these formulas must be
//! re-derived against real samples.

/// Max size of a node's data after which the store's chunker splits the
/// original file.
pub const MAX_CHUNK_SIZE: u64 = 262_144;

/// Envelope overhead of a full 262144-byte chunk.
const FULL_CHUNK_OVERHEAD: u64 = 14;

/// A file is a single chunk when its cumulative size is below this.
const SINGLE_CHUNK_CUTOFF: u64 = MAX_CHUNK_SIZE + 123;

/// Decode the cumulative size of a single-chunk node into its payload
/// length. Only valid below [`SINGLE_CHUNK_CUTOFF`].
fn single_chunk_size(cumulative: u64) -> u64 {
    match cumulative {
        0 => 0,
        c if c < 9 => c - 6,
        c if c < 131 => c - 8,
        c if c < 139 => c - 9,
        c if c < 16_388 => c - 11,
        c if c < 16_398 => c - 12,
        c => c - 14,
    }
}

/// Decode a node's cumulative on-disk size into the logical byte length of
/// the file it represents.
///
/// `block_size` is the size of the node's own root block, as reported by
/// the store's object stat; it only matters for chunked files.
pub fn logical_size(cumulative: u64, block_size: u64) -> u64 {
    if cumulative < SINGLE_CHUNK_CUTOFF {
        return single_chunk_size(cumulative);
    }
    // Chunked file: the root block links to full chunks plus a remainder
    // chunk, each carrying its own envelope overhead.
    let chunks_total = cumulative - block_size;
    let full_chunks = chunks_total / (MAX_CHUNK_SIZE + FULL_CHUNK_OVERHEAD);
    let remainder = chunks_total % (MAX_CHUNK_SIZE + FULL_CHUNK_OVERHEAD);
    chunks_total - full_chunks * FULL_CHUNK_OVERHEAD - (remainder - single_chunk_size(remainder))
}

/// Envelope overhead added on top of a payload of `len` bytes.
///
/// Forward counterpart of [`single_chunk_size`], used by the in-memory
/// store to report cumulative sizes consistent with the real store.
pub fn envelope_overhead(len: u64) -> u64 {
    match len {
        0 => 0,
        l if l < 3 => 6,
        l if l < 123 => 8,
        l if l < 130 => 9,
        l if l < 16_377 => 11,
        l if l < 16_386 => 12,
        _ => 14,
    }
}

/// Compute the (cumulative size, root block size) pair the store would
/// report for a file of `len` logical bytes.
pub fn cumulative_size(len: u64) -> (u64, u64) {
    if len <= MAX_CHUNK_SIZE {
        let cumulative = if len == 0 {
            0
        } else {
            len + envelope_overhead(len)
        };
        return (cumulative, cumulative);
    }
    let full_chunks = len / MAX_CHUNK_SIZE;
    let remainder = len % MAX_CHUNK_SIZE;
    let remainder_cumulative = if remainder == 0 {
        0
    } else {
        remainder + envelope_overhead(remainder)
    };
    let chunks_total = full_chunks * (MAX_CHUNK_SIZE + FULL_CHUNK_OVERHEAD) + remainder_cumulative;
    let n_chunks = full_chunks + u64::from(remainder > 0);
    // Root block holds one link per chunk.
    let block_size = 2 + 51 * n_chunks;
    (chunks_total + block_size, block_size)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bracket_boundaries() {
        // Known fixture pairs at each envelope bracket boundary.
        assert_eq!(logical_size(0, 0), 0);
        assert_eq!(logical_size(8, 8), 2);
        assert_eq!(logical_size(130, 130), 122);
        assert_eq!(logical_size(138, 138), 129);
        assert_eq!(logical_size(16_387, 16_387), 16_376);
        assert_eq!(logical_size(16_397, 16_397), 16_385);
    }

    #[test]
    fn bracket_interiors() {
        assert_eq!(logical_size(7, 7), 1);
        assert_eq!(logical_size(11, 11), 3);
        assert_eq!(logical_size(141, 141), 130);
        assert_eq!(logical_size(16_400, 16_400), 16_386);
    }

    #[test]
    fn largest_single_chunk() {
        let (cumulative, block_size) = cumulative_size(MAX_CHUNK_SIZE);
        assert_eq!(cumulative, MAX_CHUNK_SIZE + 14);
        assert_eq!(logical_size(cumulative, block_size), MAX_CHUNK_SIZE);
    }

    #[test]
    fn chunked_round_trips() {
        for len in [
            MAX_CHUNK_SIZE + 1,
            MAX_CHUNK_SIZE + 16_376,
            2 * MAX_CHUNK_SIZE,
            2 * MAX_CHUNK_SIZE + 7,
            5 * MAX_CHUNK_SIZE + 100_000,
        ] {
            let (cumulative, block_size) = cumulative_size(len);
            assert_eq!(logical_size(cumulative, block_size), len, "len {len}");
        }
    }

    #[test]
    fn small_round_trips() {
        for len in [0, 1, 2, 3, 122, 123, 129, 130, 16_376, 16_377, 16_385, 16_386, 100_000] {
            let (cumulative, block_size) = cumulative_size(len);
            assert_eq!(logical_size(cumulative, block_size), len, "len {len}");
        }
    }
}
