//! Implements the serial backend for driving the slicing reduction

use beamslice_nostd_internal::{
    AssignmentRecords, AtomicReducer, Executor, ParticleView, StatePackViewMut, ZetaSlicer,
    apply_slicing,
};

/// Processes every particle on the calling thread.
///
/// This backend is the reference that the parallel backends are expected to
/// reproduce (the scratch-merge backend bitwise, the atomic backend up to
/// floating-point summation order).
pub struct SerialExecutor;

impl Executor for SerialExecutor {
    fn drive_slicing<R: AtomicReducer>(
        &mut self,
        binned_statepack: &mut StatePackViewMut,
        reducer: &R,
        slicer: &ZetaSlicer,
        particles: &ParticleView,
        mut records: AssignmentRecords<'_>,
    ) -> Result<(), &'static str> {
        apply_slicing(
            binned_statepack,
            reducer,
            slicer,
            particles,
            &mut records,
            None,
        )
    }
}
