use std::ops::Range;

/// Number of concurrent workers for `items` units of work capped at `batch_size`.
/// Zero only when there is no work at all.
pub fn worker_count(batch_size: usize, items: usize) -> usize {
    if items == 0 {
        return 0;
    }
    batch_size.clamp(1, items)
}

/// Splits `total` across `parts` workers: the first `total % parts` workers get
/// one extra unit, so the counts sum to `total` and differ by at most one.
pub fn split_counts(total: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let remainder = total % parts;
    (0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Contiguous, order-preserving index ranges sized by [`split_counts`].
pub fn split_ranges(total: usize, parts: usize) -> Vec<Range<usize>> {
    let mut start = 0;
    split_counts(total, parts)
        .into_iter()
        .map(|count| {
            let range = start..start + count;
            start += count;
            range
        })
        .collect()
}
