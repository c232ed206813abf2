/*!
Provides parallelized routines for binning particle-beam distributions into
longitudinal slices and accumulating weighted statistical moments per slice.

<div class="warning">

This crate is still in early development. The initial goal is to serve as a
backend for beam-dynamics tracking codes.

</div>

# High-Level: Slice Moments

Collective-effect models (wakefields, beam-beam interactions, space charge)
don't act on individual particles directly; they act on moments of the beam
computed over thin longitudinal slices. The calculation here takes a
collection of macroparticles, each described by six phase-space coordinates
`(x, px, y, py, zeta, delta)` and a statistical weight, assigns every
particle to a slice of a uniform grid along `zeta` (optionally replicated
across a train of equally spaced bunches), and accumulates the per-slice
weight sum together with weighted first and second moments of the
coordinates.

Everything accumulated is a plain weighted sum, so the work can be split
across particle subsets in any order and the partial results combined by
addition. All provided execution backends exploit this.

# User Guide

Configure a [`MomentAccumulator`] with [`MomentAccumulatorBuilder`], then
feed it particle collections with [`process_particles`]. Retrieve the
per-bin sums with [`MomentAccumulator::get_output`].

# Developer Guide

See the crate-level documentation for [`beamslice_nostd_internal`].

*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod accumulator;
mod error;
mod func;
mod output;
mod parallel_rayon;
mod parallel_serial;

// pull in symbols that are visible outside of the package
pub use accumulator::{MomentAccumulator, MomentAccumulatorBuilder};
pub use beamslice_nostd_internal::{
    AccumStateView, AccumStateViewMut, AssignmentRecords, AtomicAccumStateView, AtomicReducer,
    AtomicStatePackView, BunchTrain, COORD_NAMES, Executor, N_COORDS, N_SECOND_MOMENTS,
    ParticleDatum, ParticleView, Reducer, SliceAssignment, SliceGeometry, SliceMoments,
    StatePackView, StatePackViewMut, UNASSIGNED, WeightHistogram, ZetaSlicer, apply_slicing,
    apply_slicing_atomic, merge_full_statepacks, reset_full_statepack,
};
pub use error::Error;
pub use func::{RuntimeSpec, process_particles};
pub use output::get_output;
pub use parallel_rayon::{AtomicExecutor, RayonExecutor};
pub use parallel_serial::SerialExecutor;
