//! The binning-and-accumulation kernel.
//!
//! [`apply_slicing`] is the serial building block: classify each particle,
//! record its resolved indices, and (when fully assigned) let the reducer
//! consume it into the matching bin's accumulator state. Execution backends
//! compose it (or its atomic twin) over particle sub-ranges; the
//! [`Executor`] trait is the seam they implement.

use crate::atomic::AtomicStatePackView;
use crate::bins::{SliceAssignment, ZetaSlicer};
use crate::particles::{AssignmentRecords, ParticleView};
use crate::reducer::{AtomicReducer, Reducer};
use crate::state::StatePackViewMut;

fn validated_idx_bounds(
    particles: &ParticleView,
    records: &AssignmentRecords,
    start_stop_idx: Option<(usize, usize)>,
) -> Result<(usize, usize), &'static str> {
    let (i_start, i_stop) = start_stop_idx.unwrap_or((0, particles.len()));
    if (i_start > i_stop) || (i_stop > particles.len()) {
        Err("start_stop_idx must describe a range within the particle collection")
    } else if !records.covers(i_start, i_stop) {
        Err("records must span the processed particle range")
    } else {
        Ok((i_start, i_stop))
    }
}

/// Classifies each particle in the (optionally restricted) range and
/// accumulates the fully assigned ones into `binned_statepack`.
///
/// The statepack must hold one accumulator state per flat bin, laid out the
/// way `reducer` expects. Contributions are purely additive: the caller is
/// responsible for initializing the statepack (typically to zero) and may
/// call this repeatedly to accumulate across invocations. Per-particle
/// outputs are written through `records` using absolute particle indices,
/// so a sub-range invocation touches exactly that sub-range of the buffers.
pub fn apply_slicing<R: Reducer>(
    binned_statepack: &mut StatePackViewMut,
    reducer: &R,
    slicer: &ZetaSlicer,
    particles: &ParticleView,
    records: &mut AssignmentRecords,
    start_stop_idx: Option<(usize, usize)>,
) -> Result<(), &'static str> {
    let (i_start, i_stop) = validated_idx_bounds(particles, records, start_stop_idx)?;
    if binned_statepack.n_states() != slicer.n_bins() {
        return Err("binned_statepack must hold an accum_state per bin");
    } else if binned_statepack.state_size() != reducer.accum_state_size() {
        return Err("the statepack's state_size doesn't match the reducer");
    }

    for ipart in i_start..i_stop {
        let assignment = slicer.classify(particles.zeta(ipart));
        records.record(ipart, &assignment);
        if let SliceAssignment::Assigned {
            bunch_rel, i_slice, ..
        } = assignment
        {
            let bin_index = slicer.flat_bin(bunch_rel, i_slice);
            reducer.consume(
                &mut binned_statepack.get_state_mut(bin_index),
                &particles.datum(ipart),
            );
        }
    }
    Ok(())
}

/// The atomic twin of [`apply_slicing`]: accumulates through a shared
/// [`AtomicStatePackView`], so multiple callers may target the same
/// statepack concurrently (each covering a disjoint particle range with its
/// own records).
pub fn apply_slicing_atomic<R: AtomicReducer>(
    binned_statepack: &AtomicStatePackView,
    reducer: &R,
    slicer: &ZetaSlicer,
    particles: &ParticleView,
    records: &mut AssignmentRecords,
    start_stop_idx: Option<(usize, usize)>,
) -> Result<(), &'static str> {
    let (i_start, i_stop) = validated_idx_bounds(particles, records, start_stop_idx)?;
    if binned_statepack.n_states() != slicer.n_bins() {
        return Err("binned_statepack must hold an accum_state per bin");
    } else if binned_statepack.state_size() != reducer.accum_state_size() {
        return Err("the statepack's state_size doesn't match the reducer");
    }

    for ipart in i_start..i_stop {
        let assignment = slicer.classify(particles.zeta(ipart));
        records.record(ipart, &assignment);
        if let SliceAssignment::Assigned {
            bunch_rel, i_slice, ..
        } = assignment
        {
            let bin_index = slicer.flat_bin(bunch_rel, i_slice);
            reducer.consume_atomic(&binned_statepack.get_state(bin_index), &particles.datum(ipart));
        }
    }
    Ok(())
}

/// Implemented by execution backends that drive a full slicing reduction.
///
/// Implementations accumulate into `binned_statepack` additively (they never
/// reset it), so one statepack can collect contributions across repeated
/// drives. `records` is taken by value because parallel backends split it
/// into per-segment sub-records.
pub trait Executor {
    fn drive_slicing<R: AtomicReducer>(
        &mut self,
        binned_statepack: &mut StatePackViewMut,
        reducer: &R,
        slicer: &ZetaSlicer,
        particles: &ParticleView,
        records: AssignmentRecords<'_>,
    ) -> Result<(), &'static str>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::AtomicStatePackView;
    use crate::bins::SliceGeometry;
    use crate::particles::UNASSIGNED;
    use crate::reducer::SliceMoments;
    use core::sync::atomic::AtomicU64;

    // slice centers at 0, 1, 2 -> grid covers [-0.5, 2.5)
    fn three_slice_slicer() -> ZetaSlicer {
        ZetaSlicer::new(SliceGeometry::new(3, 0.0, 1.0).unwrap(), None)
    }

    #[test]
    fn apply_slicing_single_particle() {
        let slicer = three_slice_slicer();
        let moments = SliceMoments::new(true);

        let x = [1.0];
        let zero = [0.0];
        let zeta = [0.4];
        let weights = [2.0];
        let particles =
            ParticleView::new(&x, &zero, &zero, &zero, &zeta, &zero, Some(&weights)).unwrap();

        let mut slice_idx = [0_i64; 1];
        let mut records = AssignmentRecords::new(Some(&mut slice_idx), None);

        let mut buf = [0.0; 3 * 28];
        let mut statepack = StatePackViewMut::from_slice(3, 28, &mut buf);
        apply_slicing(
            &mut statepack,
            &moments,
            &slicer,
            &particles,
            &mut records,
            None,
        )
        .unwrap();

        let state = statepack.get_state(0);
        assert_eq!(state[SliceMoments::WEIGHT_SUM], 2.0);
        assert_eq!(state[moments.first_moment_slot(0).unwrap()], 2.0);
        assert_eq!(state[moments.second_moment_slot(0, 0)], 2.0);
        // zeta moments pick up the particle's zeta
        assert_eq!(state[moments.first_moment_slot(4).unwrap()], 0.8);

        // the other bins stay untouched
        for bin_index in 1..3 {
            let state = statepack.get_state(bin_index);
            assert_eq!(state[SliceMoments::WEIGHT_SUM], 0.0);
        }

        assert_eq!(slice_idx, [0]);
    }

    #[test]
    fn apply_slicing_unassigned_particle() {
        let slicer = three_slice_slicer();
        let moments = SliceMoments::new(true);

        let zero = [0.0];
        let zeta = [-10.0];
        let particles =
            ParticleView::new(&zero, &zero, &zero, &zero, &zeta, &zero, None).unwrap();

        let mut slice_idx = [7_i64; 1];
        let mut records = AssignmentRecords::new(Some(&mut slice_idx), None);

        let mut buf = [0.0; 3 * 28];
        let mut statepack = StatePackViewMut::from_slice(3, 28, &mut buf);
        apply_slicing(
            &mut statepack,
            &moments,
            &slicer,
            &particles,
            &mut records,
            None,
        )
        .unwrap();

        assert_eq!(slice_idx, [UNASSIGNED]);
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn apply_slicing_range_restriction() {
        let slicer = three_slice_slicer();
        let moments = SliceMoments::new(false);

        let zero = [0.0; 4];
        let zeta = [0.0, 1.0, 2.0, 0.0];
        let particles =
            ParticleView::new(&zero, &zero, &zero, &zero, &zeta, &zero, None).unwrap();

        let mut slice_idx = [99_i64; 4];
        let (_, mut records) =
            AssignmentRecords::new(Some(&mut slice_idx), None).split_at_mut(1);

        let mut buf = [0.0; 3 * 22];
        let mut statepack = StatePackViewMut::from_slice(3, 22, &mut buf);
        apply_slicing(
            &mut statepack,
            &moments,
            &slicer,
            &particles,
            &mut records,
            Some((1, 3)),
        )
        .unwrap();

        // only particles 1 and 2 were processed
        assert_eq!(statepack.get_state(0)[0], 0.0);
        assert_eq!(statepack.get_state(1)[0], 1.0);
        assert_eq!(statepack.get_state(2)[0], 1.0);
        assert_eq!(slice_idx, [99, 1, 2, 99]);
    }

    #[test]
    fn apply_slicing_rejects_bad_arguments() {
        let slicer = three_slice_slicer();
        let moments = SliceMoments::new(true);

        let zero = [0.0; 2];
        let particles =
            ParticleView::new(&zero, &zero, &zero, &zero, &zero, &zero, None).unwrap();

        // statepack with the wrong number of bins
        let mut buf = [0.0; 2 * 28];
        let mut statepack = StatePackViewMut::from_slice(2, 28, &mut buf);
        assert!(
            apply_slicing(
                &mut statepack,
                &moments,
                &slicer,
                &particles,
                &mut AssignmentRecords::disabled(),
                None,
            )
            .is_err()
        );

        // statepack with the wrong state size
        let mut buf = [0.0; 3 * 22];
        let mut statepack = StatePackViewMut::from_slice(3, 22, &mut buf);
        assert!(
            apply_slicing(
                &mut statepack,
                &moments,
                &slicer,
                &particles,
                &mut AssignmentRecords::disabled(),
                None,
            )
            .is_err()
        );

        // out-of-bounds index range
        let mut buf = [0.0; 3 * 28];
        let mut statepack = StatePackViewMut::from_slice(3, 28, &mut buf);
        assert!(
            apply_slicing(
                &mut statepack,
                &moments,
                &slicer,
                &particles,
                &mut AssignmentRecords::disabled(),
                Some((0, 3)),
            )
            .is_err()
        );

        // records buffer too short for the particle collection
        let mut slice_idx = [0_i64; 1];
        let mut records = AssignmentRecords::new(Some(&mut slice_idx), None);
        assert!(
            apply_slicing(
                &mut statepack,
                &moments,
                &slicer,
                &particles,
                &mut records,
                None,
            )
            .is_err()
        );
    }

    #[test]
    fn atomic_kernel_matches_plain_kernel() {
        let slicer = three_slice_slicer();
        let moments = SliceMoments::new(true);

        let x = [0.5, -1.0, 2.0, 0.25];
        let px = [0.1, 0.2, -0.3, 0.0];
        let y = [1.0, 1.0, -1.0, 0.5];
        let py = [0.0, -0.5, 0.5, 0.125];
        let zeta = [0.0, 0.75, 2.25, -3.0];
        let delta = [0.01, -0.02, 0.03, 0.0];
        let weights = [1.0, 2.0, 0.5, 4.0];
        let particles =
            ParticleView::new(&x, &px, &y, &py, &zeta, &delta, Some(&weights)).unwrap();

        let mut plain_buf = [0.0; 3 * 28];
        let mut plain = StatePackViewMut::from_slice(3, 28, &mut plain_buf);
        apply_slicing(
            &mut plain,
            &moments,
            &slicer,
            &particles,
            &mut AssignmentRecords::disabled(),
            None,
        )
        .unwrap();

        let atomic_buf: [AtomicU64; 3 * 28] = core::array::from_fn(|_| AtomicU64::new(0));
        let atomic = AtomicStatePackView::from_slice(3, 28, &atomic_buf);
        apply_slicing_atomic(
            &atomic,
            &moments,
            &slicer,
            &particles,
            &mut AssignmentRecords::disabled(),
            None,
        )
        .unwrap();

        // identical consume order means bitwise-identical sums
        for bin_index in 0..3 {
            let expected = plain.get_state(bin_index);
            let actual = atomic.get_state(bin_index);
            for slot in 0..28 {
                assert_eq!(actual.load(slot), expected[slot]);
            }
        }
    }
}
