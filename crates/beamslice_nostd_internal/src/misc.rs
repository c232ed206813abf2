//! Small helpers shared by the rest of the crate.

/// Computes the `[start, stop)` index bounds of segment `seg_index` when
/// `length` elements are divided among `n_segments` segments as equitably as
/// possible.
///
/// When `length` isn't evenly divisible, each of the leading
/// `length % n_segments` segments holds one extra element. Every index in
/// `0..length` belongs to exactly one segment.
pub fn segment_idx_bounds(length: usize, seg_index: usize, n_segments: usize) -> (usize, usize) {
    debug_assert!(n_segments > 0);
    debug_assert!(seg_index < n_segments);
    let quotient = length / n_segments;
    let remainder = length % n_segments;
    let start = seg_index * quotient + seg_index.min(remainder);
    let stop = start + quotient + usize::from(seg_index < remainder);
    (start, stop)
}
