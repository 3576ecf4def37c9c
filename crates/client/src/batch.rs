//! Knapsack-style batch packing.

use porter_core::{Digest, MAX_BATCH_BYTES, MAX_BATCH_COUNT};

/// Split digests into batches, each below the byte and count ceilings.
///
/// Digests are sorted by size; each batch is seeded with the largest
/// remaining digest and then filled with as many small ones as fit. A naive
/// take on the knapsack problem, but it is deterministic, runs in
/// O(n log n), and avoids the stranded-large-blob pathology of a one-ended
/// sweep.
///
/// A digest bigger than [`MAX_BATCH_BYTES`] becomes a batch of its own; the
/// caller must route such singletons over the byte stream instead of the
/// batch RPC.
pub fn make_batches(mut digests: Vec<Digest>) -> Vec<Vec<Digest>> {
    tracing::debug!(count = digests.len(), "batching digests");
    // Ties broken by hash so the result is independent of input order.
    digests.sort_by(|a, b| {
        (a.size_bytes, a.hash.as_bytes()).cmp(&(b.size_bytes, b.hash.as_bytes()))
    });

    let mut batches = Vec::new();
    let mut small = 0;
    let mut large = digests.len();
    while small < large {
        large -= 1;
        let mut batch = vec![digests[large]];
        let mut size = digests[large].size_bytes;
        // checked_sub: an oversize seed leaves no remaining capacity rather
        // than wrapping.
        while small < large
            && batch.len() < MAX_BATCH_COUNT
            && MAX_BATCH_BYTES
                .checked_sub(size)
                .is_some_and(|room| digests[small].size_bytes <= room)
        {
            size += digests[small].size_bytes;
            batch.push(digests[small]);
            small += 1;
        }
        tracing::trace!(blobs = batch.len(), size, "created batch");
        batches.push(batch);
    }
    tracing::debug!(count = batches.len(), "batches created");
    batches
}
