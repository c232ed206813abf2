//! Views over the accumulator state owned by the caller.
//!
//! A "statepack" is the flat `[f64]` buffer holding the accumulator state of
//! every bin: `state_size` named slots for each of `n_states` bins. The
//! buffer is laid out slot-major, i.e. with logical shape
//! `[state_size, n_states]` in row-major order. Two consequences:
//! - slot `s` of every bin forms the contiguous run
//!   `data[s * n_states..(s + 1) * n_states]`. A caller that allocates its
//!   per-bin output arrays (weight sum first, then each moment sum)
//!   back-to-back can view that allocation directly as a statepack.
//! - the full state of a single bin is a strided column, which
//!   [`AccumStateView`] / [`AccumStateViewMut`] model with an explicit
//!   stride.
//!
//! Separate immutable/mutable view types are required to model lifetimes
//! properly (for the same reason `&[f64]` and `&mut [f64]` are distinct).
//! Because the views are built on slices, it's impossible to hold mutable
//! views of two different bins at the same time; a pointer-based
//! implementation could lift that restriction if it ever matters.

use core::num::NonZeroUsize;
use core::ops::{Index, IndexMut};

/// Read-only view of a single bin's accumulator state.
///
/// Indexing accesses the bin's slots (`0..len()`), transparently applying
/// the statepack stride.
pub struct AccumStateView<'a> {
    len: NonZeroUsize,
    stride: usize,
    data: &'a [f64],
}

impl<'a> AccumStateView<'a> {
    /// constructor reserved for the statepack types below
    fn internal_new(len: NonZeroUsize, stride: usize, data: &'a [f64]) -> Self {
        debug_assert!(((len.get() - 1) * stride) < data.len());
        Self { len, stride, data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl<'a> Index<usize> for AccumStateView<'a> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, index: usize) -> &Self::Output {
        self.data.index(index * self.stride)
    }
}

/// Mutable view of a single bin's accumulator state.
pub struct AccumStateViewMut<'a> {
    len: NonZeroUsize,
    stride: usize,
    data: &'a mut [f64],
}

impl<'a> AccumStateViewMut<'a> {
    /// constructor reserved for the statepack types below
    fn internal_new(len: NonZeroUsize, stride: usize, data: &'a mut [f64]) -> Self {
        debug_assert!(((len.get() - 1) * stride) < data.len());
        Self { len, stride, data }
    }

    /// Wraps a contiguous slice as a stride-1 accumulator state.
    ///
    /// Panics when `data` is empty.
    pub fn from_contiguous_slice(data: &'a mut [f64]) -> Self {
        let Some(len) = NonZeroUsize::new(data.len()) else {
            panic!("can't construct an empty AccumStateViewMut");
        };
        let stride = 1;
        Self { len, stride, data }
    }

    pub fn as_view<'b>(&'b self) -> AccumStateView<'b> {
        AccumStateView {
            len: self.len,
            stride: self.stride,
            data: self.data,
        }
    }

    pub fn fill(&mut self, val: f64) {
        // touches every viewed slot; also zeroes the gaps between strided
        // slots, which always belong to the same statepack
        self.data.fill(val);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl<'a> Index<usize> for AccumStateViewMut<'a> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, index: usize) -> &Self::Output {
        self.data.index(index * self.stride)
    }
}

impl<'a> IndexMut<usize> for AccumStateViewMut<'a> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.data.index_mut(index * self.stride)
    }
}

/// Read-only collection of accumulator states (one per bin).
pub struct StatePackView<'a> {
    data: &'a [f64],
    n_states: usize,
    state_size: usize,
}

impl<'a> StatePackView<'a> {
    /// Panics when either dimension is zero or `data` is too short; `data`
    /// may be longer than the statepack needs.
    pub fn from_slice(n_states: usize, state_size: usize, data: &'a [f64]) -> Self {
        assert!(n_states > 0);
        assert!(state_size > 0);
        if data.len() < (n_states * state_size) {
            panic!("data doesn't hold enough elements for the statepack shape");
        }
        Self {
            data,
            n_states,
            state_size,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data
    }

    #[inline]
    pub fn get_state(&self, i: usize) -> AccumStateView<'_> {
        debug_assert!(i < self.n_states);
        // from_slice guarantees state_size > 0
        let len = unsafe { NonZeroUsize::new_unchecked(self.state_size) };
        AccumStateView::internal_new(len, self.n_states, &self.data[i..])
    }

    #[inline]
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn total_size(&self) -> usize {
        self.state_size * self.n_states
    }
}

/// Mutable collection of accumulator states (one per bin).
///
/// This is the type the binning kernel writes through. The slot-major data
/// representation is described in the module docs; the important property is
/// that merging two statepacks or folding an atomic statepack back into one
/// walks contiguous memory.
pub struct StatePackViewMut<'a> {
    data: &'a mut [f64],
    n_states: usize,
    state_size: usize,
}

impl<'a> StatePackViewMut<'a> {
    /// Panics when either dimension is zero or `data` is too short; `data`
    /// may be longer than the statepack needs.
    pub fn from_slice(n_states: usize, state_size: usize, data: &'a mut [f64]) -> Self {
        assert!(n_states > 0);
        assert!(state_size > 0);
        if data.len() < (n_states * state_size) {
            panic!("data doesn't hold enough elements for the statepack shape");
        }
        Self {
            data,
            n_states,
            state_size,
        }
    }

    pub fn as_slice_mut(&mut self) -> &mut [f64] {
        self.data
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data
    }

    pub fn as_view<'b>(&'b self) -> StatePackView<'b> {
        StatePackView {
            data: self.data,
            n_states: self.n_states,
            state_size: self.state_size,
        }
    }

    #[inline]
    pub fn get_state(&self, i: usize) -> AccumStateView<'_> {
        debug_assert!(i < self.n_states);
        // from_slice guarantees state_size > 0
        let len = unsafe { NonZeroUsize::new_unchecked(self.state_size) };
        AccumStateView::internal_new(len, self.n_states, &self.data[i..])
    }

    #[inline]
    pub fn get_state_mut(&mut self, i: usize) -> AccumStateViewMut<'_> {
        debug_assert!(i < self.n_states);
        // from_slice guarantees state_size > 0
        let len = unsafe { NonZeroUsize::new_unchecked(self.state_size) };
        AccumStateViewMut::internal_new(len, self.n_states, &mut self.data[i..])
    }

    #[inline]
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn total_size(&self) -> usize {
        self.state_size * self.n_states
    }
}
