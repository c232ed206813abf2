#![no_std]
mod atomic;
mod bins;
mod misc;
mod particles;
mod reduce_utils;
mod reducer;
mod slicing;
mod state;

pub use atomic::{AtomicAccumStateView, AtomicStatePackView};
pub use bins::{BunchTrain, SliceAssignment, SliceGeometry, ZetaSlicer};
pub use misc::segment_idx_bounds;
pub use particles::{AssignmentRecords, ParticleView, UNASSIGNED};
pub use reduce_utils::{
    merge_full_statepacks, reset_full_statepack, serial_consolidate_scratch_statepacks,
};
pub use reducer::{
    AtomicReducer, COORD_NAMES, N_COORDS, N_SECOND_MOMENTS, ParticleDatum, Reducer, SliceMoments,
    WeightHistogram,
};
pub use slicing::{Executor, apply_slicing, apply_slicing_atomic};
pub use state::{AccumStateView, AccumStateViewMut, StatePackView, StatePackViewMut};
