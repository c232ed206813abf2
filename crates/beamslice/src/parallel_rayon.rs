//! Implements the rayon-backed backends for driving the slicing reduction
//!
//! Two strategies are provided:
//! - [`RayonExecutor`] gives each segment of the particle collection its own
//!   scratch statepack and consolidates the scratch copies serially
//!   afterwards. For a fixed segment count the result is bitwise
//!   reproducible.
//! - [`AtomicExecutor`] shares one statepack between all workers and updates
//!   it with atomic read-modify-write loops. It avoids the scratch memory
//!   (which scales with the bin count times the worker count) at the cost
//!   of a reproducible summation order.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use beamslice_nostd_internal::{
    AssignmentRecords, AtomicReducer, AtomicStatePackView, Executor, ParticleView, Reducer,
    StatePackViewMut, ZetaSlicer, apply_slicing, apply_slicing_atomic, merge_full_statepacks,
    reset_full_statepack, segment_idx_bounds, serial_consolidate_scratch_statepacks,
};

/// Validates the inputs shared by both backends and splits `records` into
/// per-segment sub-records (tagged with the particle range each covers).
///
/// The upfront coverage check matters: splitting a too-short records buffer
/// would panic, while failing here reports the same error the kernel itself
/// would.
fn validated_segments<'a>(
    binned_statepack: &StatePackViewMut,
    reducer: &impl Reducer,
    slicer: &ZetaSlicer,
    particles: &ParticleView,
    records: AssignmentRecords<'a>,
    n_segments: usize,
) -> Result<Vec<(usize, usize, AssignmentRecords<'a>)>, &'static str> {
    if binned_statepack.n_states() != slicer.n_bins() {
        return Err("binned_statepack must hold an accum_state per bin");
    } else if binned_statepack.state_size() != reducer.accum_state_size() {
        return Err("the statepack's state_size doesn't match the reducer");
    } else if !records.covers(0, particles.len()) {
        return Err("records must span the processed particle range");
    }

    let n_particles = particles.len();
    let mut segments = Vec::with_capacity(n_segments);
    let mut rest = records;
    for seg_index in 0..n_segments {
        let (start, stop) = segment_idx_bounds(n_particles, seg_index, n_segments);
        let (seg_records, tail) = rest.split_at_mut(stop - start);
        rest = tail;
        segments.push((start, stop, seg_records));
    }
    Ok(segments)
}

/// Drives the slicing reduction on the rayon thread pool, with a private
/// scratch statepack per particle segment.
///
/// The scratch statepacks are consolidated serially (in segment order) once
/// the parallel phase finishes, so a fixed segment count yields bitwise
/// identical results across runs and thread counts.
pub struct RayonExecutor {
    n_segments: Option<NonZeroUsize>,
}

impl RayonExecutor {
    /// create a new instance
    ///
    /// When `n_segments` is `None`, the particle collection is split into
    /// one segment per thread in the rayon pool. Either way, we never use
    /// more segments than particles.
    pub fn new(n_segments: Option<NonZeroUsize>) -> Self {
        Self { n_segments }
    }

    fn resolved_n_segments(&self, n_particles: usize) -> usize {
        let n = self
            .n_segments
            .map_or_else(rayon::current_num_threads, NonZeroUsize::get);
        n.min(n_particles).max(1)
    }
}

impl Executor for RayonExecutor {
    fn drive_slicing<R: AtomicReducer>(
        &mut self,
        binned_statepack: &mut StatePackViewMut,
        reducer: &R,
        slicer: &ZetaSlicer,
        particles: &ParticleView,
        records: AssignmentRecords<'_>,
    ) -> Result<(), &'static str> {
        let n_segments = self.resolved_n_segments(particles.len());
        let segments =
            validated_segments(binned_statepack, reducer, slicer, particles, records, n_segments)?;

        let n_bins = binned_statepack.n_states();
        let state_size = binned_statepack.state_size();
        let total_size = binned_statepack.total_size();
        let mut scratch = vec![0.0; total_size * n_segments];

        let jobs: Vec<_> = scratch.chunks_exact_mut(total_size).zip(segments).collect();
        jobs.into_par_iter()
            .try_for_each(|(seg_scratch, (start, stop, mut seg_records))| {
                let mut seg_statepack =
                    StatePackViewMut::from_slice(n_bins, state_size, seg_scratch);
                reset_full_statepack(reducer, &mut seg_statepack);
                apply_slicing(
                    &mut seg_statepack,
                    reducer,
                    slicer,
                    particles,
                    &mut seg_records,
                    Some((start, stop)),
                )
            })?;

        let mut scratch_statepacks: Vec<StatePackViewMut> = scratch
            .chunks_exact_mut(total_size)
            .map(|buf| StatePackViewMut::from_slice(n_bins, state_size, buf))
            .collect();
        serial_consolidate_scratch_statepacks(reducer, &mut scratch_statepacks);
        merge_full_statepacks(reducer, binned_statepack, &scratch_statepacks[0]);
        Ok(())
    }
}

/// Drives the slicing reduction on the rayon thread pool, with all workers
/// sharing a single statepack through atomic f64 adds.
///
/// Per-bin results agree with the other backends up to floating-point
/// summation order (exactly, whenever the accumulated values are exactly
/// representable).
pub struct AtomicExecutor;

impl Executor for AtomicExecutor {
    fn drive_slicing<R: AtomicReducer>(
        &mut self,
        binned_statepack: &mut StatePackViewMut,
        reducer: &R,
        slicer: &ZetaSlicer,
        particles: &ParticleView,
        records: AssignmentRecords<'_>,
    ) -> Result<(), &'static str> {
        let n_segments = rayon::current_num_threads().min(particles.len()).max(1);
        let segments =
            validated_segments(binned_statepack, reducer, slicer, particles, records, n_segments)?;

        let n_bins = binned_statepack.n_states();
        let state_size = binned_statepack.state_size();
        let total_size = binned_statepack.total_size();
        // the all-zeros bit pattern is also 0.0_f64
        let shared: Vec<AtomicU64> = (0..total_size).map(|_| AtomicU64::new(0)).collect();

        segments
            .into_par_iter()
            .try_for_each(|(start, stop, mut seg_records)| {
                let shared_view = AtomicStatePackView::from_slice(n_bins, state_size, &shared);
                apply_slicing_atomic(
                    &shared_view,
                    reducer,
                    slicer,
                    particles,
                    &mut seg_records,
                    Some((start, stop)),
                )
            })?;

        let out_slice = binned_statepack.as_slice_mut();
        for (k, cell) in shared.iter().enumerate() {
            out_slice[k] += f64::from_bits(cell.load(Ordering::Relaxed));
        }
        Ok(())
    }
}
