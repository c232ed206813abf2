//! Define API functions to actually drive the slicing reduction
//!
//! In practice, these functions all call into a private method of
//! [`MomentAccumulator`]. In other words, they could all be methods of
//! [`MomentAccumulator`].
//!
//! I'm choosing to make them standalone functions because I'm worried about
//! [`MomentAccumulator`] becoming a "god" object. The accumulator is
//! primarily a data-class: it owns the reducer state (the primary output of
//! a calculation) plus the lightweight slicing configuration that describes
//! what's in that state. Runtime parameters that have no meaningful impact
//! on the output (i.e. results mathematically consistent, if not bitwise
//! identical), but impact performance, don't belong inside it; there's no
//! causal link between them and the accumulated state. They are passed
//! separately via [`RuntimeSpec`].

use std::num::NonZeroUsize;

use beamslice_nostd_internal::{AssignmentRecords, ParticleView};

use crate::{
    Error, MomentAccumulator,
    parallel_rayon::{AtomicExecutor, RayonExecutor},
    parallel_serial::SerialExecutor,
};

/// Selects the execution backend used to process a particle collection.
///
/// The choice never affects which contributions are accumulated, only how
/// the work is scheduled (and, for [`RuntimeSpec::RayonAtomic`], the
/// floating-point summation order).
pub enum RuntimeSpec {
    /// process every particle on the calling thread
    Serial,
    /// split the collection into segments processed on the rayon thread
    /// pool, each with a private scratch statepack that is consolidated
    /// afterwards (`None` means one segment per thread)
    Rayon { n_segments: Option<NonZeroUsize> },
    /// process segments on the rayon thread pool directly into a single
    /// atomically-shared statepack
    RayonAtomic,
}

/// Update `accum` with the contributions from the supplied particles.
///
/// When provided, `slice_indices` and `bunch_indices` must hold one entry
/// per particle; they receive each particle's resolved slice index and
/// absolute bunch number (`UNASSIGNED` where the particle didn't resolve).
/// Contributions add to whatever `accum` already holds.
pub fn process_particles(
    accum: &mut MomentAccumulator,
    particles: &ParticleView<'_>,
    slice_indices: Option<&mut [i64]>,
    bunch_indices: Option<&mut [i64]>,
    spec: &RuntimeSpec,
) -> Result<(), Error> {
    let n_particles = particles.len();
    if let Some(ref buf) = slice_indices {
        if buf.len() != n_particles {
            return Err(Error::record_length(
                "slice_indices",
                n_particles as u64,
                buf.len() as u64,
            ));
        }
    }
    if let Some(ref buf) = bunch_indices {
        if buf.len() != n_particles {
            return Err(Error::record_length(
                "bunch_indices",
                n_particles as u64,
                buf.len() as u64,
            ));
        }
    }

    let records = AssignmentRecords::new(slice_indices, bunch_indices);
    match spec {
        RuntimeSpec::Serial => accum.exec_slicing(&mut SerialExecutor, particles, records),
        RuntimeSpec::Rayon { n_segments } => {
            accum.exec_slicing(&mut RayonExecutor::new(*n_segments), particles, records)
        }
        RuntimeSpec::RayonAtomic => accum.exec_slicing(&mut AtomicExecutor, particles, records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MomentAccumulatorBuilder;
    use beamslice_nostd_internal::UNASSIGNED;

    #[test]
    fn check_mismatched_record_buffers() {
        let mut accum = MomentAccumulatorBuilder::new()
            .num_slices(3)
            .z_min(0.0)
            .dzeta(1.0)
            .build()
            .unwrap();

        let zeta = [0.4, 1.2];
        let zeros = [0.0, 0.0];
        let particles =
            ParticleView::new(&zeros, &zeros, &zeros, &zeros, &zeta, &zeros, None).unwrap();

        // should fail: one entry per particle is required
        let mut too_short = [0_i64; 1];
        assert!(
            process_particles(
                &mut accum,
                &particles,
                Some(&mut too_short),
                None,
                &RuntimeSpec::Serial,
            )
            .is_err()
        );
        let mut too_long = [0_i64; 3];
        assert!(
            process_particles(
                &mut accum,
                &particles,
                None,
                Some(&mut too_long),
                &RuntimeSpec::Serial,
            )
            .is_err()
        );
    }

    #[test]
    fn accumulate_across_calls() {
        let mut accum = MomentAccumulatorBuilder::new()
            .num_slices(2)
            .z_min(0.0)
            .dzeta(1.0)
            .build()
            .unwrap();

        let zeta = [0.25, 1.25, 7.0];
        let zeros = [0.0; 3];
        let weights = [2.0, 3.0, 5.0];
        let particles = ParticleView::new(
            &zeros,
            &zeros,
            &zeros,
            &zeros,
            &zeta,
            &zeros,
            Some(&weights),
        )
        .unwrap();

        let mut slice_indices = [0_i64; 3];
        process_particles(
            &mut accum,
            &particles,
            Some(&mut slice_indices),
            None,
            &RuntimeSpec::Serial,
        )
        .unwrap();
        assert_eq!(slice_indices, [0, 1, UNASSIGNED]);
        assert_eq!(accum.get_output()["weight_sum"], vec![2.0, 3.0]);

        // a second call adds on top of the first
        process_particles(&mut accum, &particles, None, None, &RuntimeSpec::Serial).unwrap();
        assert_eq!(accum.get_output()["weight_sum"], vec![4.0, 6.0]);

        accum.reset();
        assert_eq!(accum.get_output()["weight_sum"], vec![0.0, 0.0]);
    }
}
