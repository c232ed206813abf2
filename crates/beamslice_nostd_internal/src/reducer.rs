//! Define the reducer machinery (no standard library required).
//!
//! The binning itself is handled separately (by the bins and slicing
//! modules); a reducer only encodes how a single bin's running statistic
//! changes when a particle lands in that bin. We distinguish the
//! *state* of a reduction from the reducer *logic*:
//! - the running state of one bin is its `accum_state`, a small block of
//!   f64 slots accessed through [`AccumStateView`] / [`AccumStateViewMut`]
//!   (the reducer stays agnostic about how the slots are organized in
//!   memory, which is what lets a statepack interleave them),
//! - the logic lives in the [`Reducer`] trait: initialize a state, consume
//!   one particle, merge two states, extract named output values.
//!
//! Every implemented reduction is a plain weighted sum per slot, so merging
//! partial states is element-wise addition and the whole reduction is
//! associative and commutative up to floating-point rounding.

use crate::atomic::AtomicAccumStateView;
use crate::state::{AccumStateView, AccumStateViewMut};
use ndarray::ArrayViewMut1;

/// number of phase-space coordinates per particle
pub const N_COORDS: usize = 6;

/// number of distinct entries in the symmetric second-moment matrix
pub const N_SECOND_MOMENTS: usize = (N_COORDS * (N_COORDS + 1)) / 2;

/// coordinate ordering shared by [`ParticleDatum::coords`] and the moment
/// output component names
pub const COORD_NAMES: [&str; N_COORDS] = ["x", "px", "y", "py", "zeta", "delta"];

/// A single particle's contribution, as consumed by reducers.
///
/// Deliberately `Copy`: the kernel materializes one per assigned particle
/// and hands it straight to the reducer.
#[derive(Clone, Copy)]
pub struct ParticleDatum {
    /// phase-space coordinates, ordered `x, px, y, py, zeta, delta`
    pub coords: [f64; N_COORDS],
    pub weight: f64,
}

impl ParticleDatum {
    pub fn zeroed() -> Self {
        ParticleDatum {
            coords: [0.0; N_COORDS],
            weight: 0.0,
        }
    }
}

/// Reducers operate on individual `accum_state`s.
pub trait Reducer {
    /// the number of f64 slots needed to track one bin's accumulator state
    fn accum_state_size(&self) -> usize;

    /// initializes the storage tracking one bin's accumulator state.
    ///
    /// Must be called before the storage is used in a reduction (the
    /// low-level API leaves allocation to the caller). It blindly
    /// overwrites, so it doubles as a reset.
    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut);

    /// consume one particle's contribution, updating the accum_state
    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &ParticleDatum);

    /// merge the state information tracked by `other` into `accum_state`
    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView);

    /// extract all output values from a single accum_state. Expects `value`
    /// to have shape `[self.output_components().len()]` and `accum_state` to
    /// have shape `[self.accum_state_size()]`
    fn value_from_accum_state(&self, value: &mut ArrayViewMut1<f64>, accum_state: &AccumStateView);

    /// names of the output components extracted from a single accum_state,
    /// in extraction order
    fn output_components(&self) -> &'static [&'static str];
}

/// Extension trait for reducers whose consume step can also target an
/// atomically shared accumulator state.
///
/// Each slot update becomes a single atomic add with no intermediate
/// visible state, so concurrent callers may consume into the same bin.
/// Implementors must be shareable across threads (execution backends hand
/// one reducer reference to every worker).
pub trait AtomicReducer: Reducer + Sync {
    fn consume_atomic(&self, accum_state: &AtomicAccumStateView, datum: &ParticleDatum);
}

/// Weighted-moment reduction over the six phase-space coordinates.
///
/// Tracks, per bin, the particle weight sum, optionally the six weighted
/// first-moment sums, and always the 21 weighted second-moment sums (the
/// upper triangle of the symmetric outer-product matrix, rows ordered
/// `x, px, y, py, zeta, delta`). The extracted outputs are these raw sums;
/// deriving means or covariances from them is left to the caller.
#[derive(Clone, Copy)]
pub struct SliceMoments {
    track_first_moments: bool,
}

impl SliceMoments {
    /// slot (and output component) holding the per-bin weight sum
    pub const WEIGHT_SUM: usize = 0;

    const FULL_OUTPUT_COMPONENTS: &'static [&'static str] = &[
        "weight_sum",
        "sum_x",
        "sum_px",
        "sum_y",
        "sum_py",
        "sum_zeta",
        "sum_delta",
        "sum_x_x",
        "sum_x_px",
        "sum_x_y",
        "sum_x_py",
        "sum_x_zeta",
        "sum_x_delta",
        "sum_px_px",
        "sum_px_y",
        "sum_px_py",
        "sum_px_zeta",
        "sum_px_delta",
        "sum_y_y",
        "sum_y_py",
        "sum_y_zeta",
        "sum_y_delta",
        "sum_py_py",
        "sum_py_zeta",
        "sum_py_delta",
        "sum_zeta_zeta",
        "sum_zeta_delta",
        "sum_delta_delta",
    ];

    const SECOND_ONLY_OUTPUT_COMPONENTS: &'static [&'static str] = &[
        "weight_sum",
        "sum_x_x",
        "sum_x_px",
        "sum_x_y",
        "sum_x_py",
        "sum_x_zeta",
        "sum_x_delta",
        "sum_px_px",
        "sum_px_y",
        "sum_px_py",
        "sum_px_zeta",
        "sum_px_delta",
        "sum_y_y",
        "sum_y_py",
        "sum_y_zeta",
        "sum_y_delta",
        "sum_py_py",
        "sum_py_zeta",
        "sum_py_delta",
        "sum_zeta_zeta",
        "sum_zeta_delta",
        "sum_delta_delta",
    ];

    #[inline(always)]
    pub fn new(track_first_moments: bool) -> Self {
        Self {
            track_first_moments,
        }
    }

    /// whether the first-moment category is tracked
    #[inline]
    pub fn tracks_first_moments(&self) -> bool {
        self.track_first_moments
    }

    /// slot holding `sum_c` for coordinate index `coord`, or `None` when
    /// the first-moment category is disabled
    #[inline]
    pub fn first_moment_slot(&self, coord: usize) -> Option<usize> {
        debug_assert!(coord < N_COORDS);
        self.track_first_moments.then_some(1 + coord)
    }

    /// slot holding `sum_c1_c2`; requires `c1 <= c2`
    #[inline]
    pub fn second_moment_slot(&self, c1: usize, c2: usize) -> usize {
        debug_assert!(c1 <= c2);
        debug_assert!(c2 < N_COORDS);
        // entries of rows 0..c1 of the upper triangle, then the offset
        // within row c1
        let triangle_offset = c1 * N_COORDS - (c1 * c1 - c1) / 2 + (c2 - c1);
        self.second_moment_base() + triangle_offset
    }

    #[inline]
    fn second_moment_base(&self) -> usize {
        if self.track_first_moments {
            1 + N_COORDS
        } else {
            1
        }
    }
}

impl Reducer for SliceMoments {
    fn accum_state_size(&self) -> usize {
        self.second_moment_base() + N_SECOND_MOMENTS
    }

    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut) {
        accum_state.fill(0.0);
    }

    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &ParticleDatum) {
        let w = datum.weight;
        accum_state[Self::WEIGHT_SUM] += w;
        let mut slot = 1;
        if self.track_first_moments {
            for c in 0..N_COORDS {
                accum_state[slot] += w * datum.coords[c];
                slot += 1;
            }
        }
        for c1 in 0..N_COORDS {
            for c2 in c1..N_COORDS {
                accum_state[slot] += w * datum.coords[c1] * datum.coords[c2];
                slot += 1;
            }
        }
    }

    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView) {
        for i in 0..self.accum_state_size() {
            accum_state[i] += other[i];
        }
    }

    fn value_from_accum_state(&self, value: &mut ArrayViewMut1<f64>, accum_state: &AccumStateView) {
        // the outputs *are* the raw sums
        for i in 0..self.accum_state_size() {
            value[[i]] = accum_state[i];
        }
    }

    fn output_components(&self) -> &'static [&'static str] {
        if self.track_first_moments {
            Self::FULL_OUTPUT_COMPONENTS
        } else {
            Self::SECOND_ONLY_OUTPUT_COMPONENTS
        }
    }
}

impl AtomicReducer for SliceMoments {
    fn consume_atomic(&self, accum_state: &AtomicAccumStateView, datum: &ParticleDatum) {
        let w = datum.weight;
        accum_state.add(Self::WEIGHT_SUM, w);
        let mut slot = 1;
        if self.track_first_moments {
            for c in 0..N_COORDS {
                accum_state.add(slot, w * datum.coords[c]);
                slot += 1;
            }
        }
        for c1 in 0..N_COORDS {
            for c2 in c1..N_COORDS {
                accum_state.add(slot, w * datum.coords[c1] * datum.coords[c2]);
                slot += 1;
            }
        }
    }
}

/// Weight-only reduction: the per-bin weight sum (i.e. the longitudinal
/// beam profile) with no moment sums.
#[derive(Clone, Copy)]
pub struct WeightHistogram;

impl WeightHistogram {
    const OUTPUT_COMPONENTS: &'static [&'static str] = &["weight_sum"];

    #[inline(always)]
    pub fn new() -> Self {
        Self
    }
}

// we are only implementing this to silence clippy::new_without_default
impl Default for WeightHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for WeightHistogram {
    fn accum_state_size(&self) -> usize {
        1_usize
    }

    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut) {
        accum_state[0] = 0.0;
    }

    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &ParticleDatum) {
        accum_state[0] += datum.weight;
    }

    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView) {
        accum_state[0] += other[0];
    }

    fn value_from_accum_state(&self, value: &mut ArrayViewMut1<f64>, accum_state: &AccumStateView) {
        value[[0]] = accum_state[0];
    }

    fn output_components(&self) -> &'static [&'static str] {
        Self::OUTPUT_COMPONENTS
    }
}

impl AtomicReducer for WeightHistogram {
    fn consume_atomic(&self, accum_state: &AtomicAccumStateView, datum: &ParticleDatum) {
        accum_state.add(0, datum.weight);
    }
}
