use std::collections::HashMap;

use ndarray::{ArrayView1, ArrayViewMut2, Axis};

use beamslice_nostd_internal::{Reducer, StatePackView};

/// compute the output quantities from every per-bin accumulator state and
/// return the result in a HashMap.
///
/// Each entry maps a component name to a `Vec` holding that component's
/// value for every flat bin (in flat-bin order).
pub fn get_output(
    reducer: &impl Reducer,
    binned_statepack: &StatePackView,
) -> HashMap<&'static str, Vec<f64>> {
    let names = reducer.output_components();
    let n_comps = names.len();
    let n_bins = binned_statepack.n_states();

    let mut buffer = vec![0.0; n_comps * n_bins];
    let mut buffer_view = ArrayViewMut2::from_shape([n_comps, n_bins], &mut buffer).unwrap();
    for i in 0..n_bins {
        reducer.value_from_accum_state(
            &mut buffer_view.index_axis_mut(Axis(1), i),
            &binned_statepack.get_state(i),
        );
    }

    let _to_vec = |row: ArrayView1<f64>| row.iter().cloned().collect();
    let row_iter = buffer_view.rows().into_iter().map(_to_vec);
    HashMap::from_iter(names.iter().cloned().zip(row_iter))
}
