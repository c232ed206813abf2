//! Atomic views over accumulator state, for execution strategies that share
//! a single statepack across threads.
//!
//! `f64` has no native atomic type, so every slot is stored as an
//! [`AtomicU64`] bit pattern and updated through a compare-exchange retry
//! loop. The all-zero bit pattern is `0.0`, so a zero-initialized buffer is
//! a zeroed statepack. Relaxed ordering suffices here: the only cross-thread
//! communication is the commutative adds themselves, and executors join all
//! threads before reading results back.

use core::num::NonZeroUsize;
use core::sync::atomic::{AtomicU64, Ordering};

#[inline]
fn atomic_add_f64(cell: &AtomicU64, addend: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = f64::from_bits(current) + addend;
        match cell.compare_exchange_weak(
            current,
            next.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

/// Shared-mutability view of a single bin's accumulator state.
///
/// The only supported mutation is [`Self::add`], so concurrent callers can
/// hold views of the same bin.
pub struct AtomicAccumStateView<'a> {
    len: NonZeroUsize,
    stride: usize,
    data: &'a [AtomicU64],
}

impl<'a> AtomicAccumStateView<'a> {
    /// constructor reserved for [`AtomicStatePackView`]
    fn internal_new(len: NonZeroUsize, stride: usize, data: &'a [AtomicU64]) -> Self {
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

    /// Atomically adds `addend` to slot `i`.
    #[inline]
    pub fn add(&self, i: usize, addend: f64) {
        debug_assert!(i < self.len.get());
        atomic_add_f64(&self.data[i * self.stride], addend);
    }

    /// Reads slot `i` (meaningful once concurrent writers have quiesced).
    #[inline]
    pub fn load(&self, i: usize) -> f64 {
        debug_assert!(i < self.len.get());
        f64::from_bits(self.data[i * self.stride].load(Ordering::Relaxed))
    }
}

/// Shared-mutability collection of accumulator states, with the same
/// slot-major layout as the plain `StatePackViewMut`.
pub struct AtomicStatePackView<'a> {
    data: &'a [AtomicU64],
    n_states: usize,
    state_size: usize,
}

impl<'a> AtomicStatePackView<'a> {
    /// Panics when either dimension is zero or `data` is too short; `data`
    /// may be longer than the statepack needs.
    pub fn from_slice(n_states: usize, state_size: usize, data: &'a [AtomicU64]) -> Self {
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

    pub fn as_slice(&self) -> &[AtomicU64] {
        self.data
    }

    #[inline]
    pub fn get_state(&self, i: usize) -> AtomicAccumStateView<'_> {
        debug_assert!(i < self.n_states);
        // from_slice guarantees state_size > 0
        let len = unsafe { NonZeroUsize::new_unchecked(self.state_size) };
        AtomicAccumStateView::internal_new(len, self.n_states, &self.data[i..])
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
