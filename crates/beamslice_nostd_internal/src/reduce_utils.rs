// basic statepack-level utilities shared by the execution strategies

use crate::reducer::Reducer;
use crate::state::StatePackViewMut;

/// (Re)initializes every accumulator state in `statepack`.
pub fn reset_full_statepack(reducer: &impl Reducer, statepack: &mut StatePackViewMut) {
    for i in 0..statepack.n_states() {
        reducer.init_accum_state(&mut statepack.get_state_mut(i));
    }
}

/// Merges every accumulator state of `other` into the matching state of
/// `statepack`.
///
/// For the reducers in this crate, merging is element-wise addition, so the
/// destination's prior contents are only ever added to.
// ideally `other` would be more clearly immutable, but it isn't worth
// introducing another type just for this one case
pub fn merge_full_statepacks(
    reducer: &impl Reducer,
    statepack: &mut StatePackViewMut,
    other: &StatePackViewMut,
) {
    assert_eq!(statepack.n_states(), other.n_states());
    assert_eq!(statepack.state_size(), other.state_size());
    for i in 0..statepack.n_states() {
        reducer.merge(&mut statepack.get_state_mut(i), &other.get_state(i));
    }
}

/// Consolidates the statepacks such that `scratch_statepacks[0]` holds the
/// merged result of every entry.
///
/// This function makes no guarantees about the final contents of the other
/// entries.
pub fn serial_consolidate_scratch_statepacks(
    reducer: &impl Reducer,
    scratch_statepacks: &mut [StatePackViewMut],
) {
    for i in 1..scratch_statepacks.len() {
        let [main, other] = scratch_statepacks.get_disjoint_mut([0, i]).unwrap();
        merge_full_statepacks(reducer, main, other);
    }
}
