//! Defines [`MomentAccumulator`] and its builder.
//!
//! A [`MomentAccumulator`] bundles the slicing configuration together with
//! the storage for every per-bin accumulator state. The statepack it owns is
//! persistent: repeated processing calls keep adding contributions until
//! [`MomentAccumulator::reset`] is invoked. This makes it natural to fold in
//! particles batch-by-batch (or to combine the work of separate
//! accumulators with [`MomentAccumulator::merge`]).

use std::collections::HashMap;

use beamslice_nostd_internal::{
    AssignmentRecords, BunchTrain, Executor, ParticleView, Reducer, SliceGeometry, SliceMoments,
    StatePackView, StatePackViewMut, ZetaSlicer,
};

use crate::{Error, output::get_output};

/// Accumulates per-slice weighted statistical moments of particle
/// coordinates.
///
/// Instances are configured and created with [`MomentAccumulatorBuilder`].
/// Use [`crate::process_particles`] to fold in the contributions from a
/// particle collection.
pub struct MomentAccumulator {
    reducer: SliceMoments,
    slicer: ZetaSlicer,
    binned_statepack: Vec<f64>,
}

impl MomentAccumulator {
    /// the number of slices per bunch
    pub fn n_slices(&self) -> usize {
        self.slicer.n_slices()
    }

    /// the number of bunch slots (1 when no bunch train was configured)
    pub fn n_bunches(&self) -> usize {
        self.slicer.n_bunches()
    }

    /// the total number of flat bins
    pub fn n_bins(&self) -> usize {
        self.slicer.n_bins()
    }

    /// whether first moments are tracked (alongside the second moments)
    pub fn tracks_first_moments(&self) -> bool {
        self.reducer.tracks_first_moments()
    }

    fn accum_state_size(&self) -> usize {
        self.reducer.accum_state_size()
    }

    /// zero every per-bin accumulator state
    pub fn reset(&mut self) {
        let reducer = self.reducer;
        let n_bins = self.slicer.n_bins();
        let mut statepack = StatePackViewMut::from_slice(
            n_bins,
            reducer.accum_state_size(),
            &mut self.binned_statepack,
        );
        for i in 0..n_bins {
            reducer.init_accum_state(&mut statepack.get_state_mut(i));
        }
    }

    /// merge the contributions tracked by `other` into `self`
    ///
    /// The accumulators must share a slicing configuration.
    pub fn merge(&mut self, other: &MomentAccumulator) -> Result<(), Error> {
        if (self.n_bins() != other.n_bins())
            || (self.accum_state_size() != other.accum_state_size())
        {
            return Err(Error::statepack_shape(
                self.n_bins() as u64,
                self.accum_state_size() as u64,
                other.n_bins() as u64,
                other.accum_state_size() as u64,
            ));
        } else if self.slicer != other.slicer {
            return Err(Error::slicer_config(
                "merge",
                "the accumulators use different slicing configurations".to_owned(),
            ));
        }

        let reducer = self.reducer;
        let n_bins = self.slicer.n_bins();
        let state_size = reducer.accum_state_size();
        let mut statepack =
            StatePackViewMut::from_slice(n_bins, state_size, &mut self.binned_statepack);
        let other_statepack =
            StatePackView::from_slice(n_bins, state_size, &other.binned_statepack);
        for i in 0..n_bins {
            reducer.merge(&mut statepack.get_state_mut(i), &other_statepack.get_state(i));
        }
        Ok(())
    }

    /// compute the output quantities from every per-bin accumulator state
    /// and return the result in a HashMap.
    ///
    /// Each entry maps a component name (e.g. `"weight_sum"`, `"sum_x"`,
    /// `"sum_x_px"`) to a `Vec` holding that component's value for every
    /// flat bin.
    pub fn get_output(&self) -> HashMap<&'static str, Vec<f64>> {
        let statepack = StatePackView::from_slice(
            self.n_bins(),
            self.accum_state_size(),
            &self.binned_statepack,
        );
        get_output(&self.reducer, &statepack)
    }

    /// drive the slicing reduction with the supplied executor, adding the
    /// contributions to the owned statepack
    pub(crate) fn exec_slicing(
        &mut self,
        executor: &mut impl Executor,
        particles: &ParticleView,
        records: AssignmentRecords<'_>,
    ) -> Result<(), Error> {
        let reducer = self.reducer;
        let slicer = self.slicer.clone();
        let mut statepack = StatePackViewMut::from_slice(
            slicer.n_bins(),
            reducer.accum_state_size(),
            &mut self.binned_statepack,
        );
        executor
            .drive_slicing(&mut statepack, &reducer, &slicer, particles, records)
            .map_err(Error::internal_adhoc)
    }
}

/// Configures and builds a [`MomentAccumulator`].
///
/// `num_slices`, `z_min` and `dzeta` must always be specified. The bunch
/// train is optional: leaving `num_bunches` unset (or setting a value of 0
/// or smaller) selects single-bunch operation, in which case `i_bunch_0`
/// and `bunch_spacing_zeta` are ignored.
///
/// # Example
/// ```
/// use beamslice::MomentAccumulatorBuilder;
///
/// let accum = MomentAccumulatorBuilder::new()
///     .num_slices(10)
///     .z_min(-0.5)
///     .dzeta(0.1)
///     .build()
///     .unwrap();
/// assert_eq!(accum.n_bins(), 10);
/// ```
pub struct MomentAccumulatorBuilder {
    num_slices: Option<i64>,
    z_min: Option<f64>,
    dzeta: Option<f64>,
    num_bunches: i64,
    i_bunch_0: i64,
    bunch_spacing_zeta: f64,
    track_first_moments: bool,
}

impl Default for MomentAccumulatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MomentAccumulatorBuilder {
    pub fn new() -> Self {
        Self {
            num_slices: None,
            z_min: None,
            dzeta: None,
            num_bunches: 0,
            i_bunch_0: 0,
            bunch_spacing_zeta: 0.0,
            track_first_moments: true,
        }
    }

    /// the number of slices per bunch
    pub fn num_slices(mut self, num_slices: i64) -> Self {
        self.num_slices = Some(num_slices);
        self
    }

    /// the center of slice 0 (the grid's left edge sits half a slice below)
    pub fn z_min(mut self, z_min: f64) -> Self {
        self.z_min = Some(z_min);
        self
    }

    /// the slice width
    pub fn dzeta(mut self, dzeta: f64) -> Self {
        self.dzeta = Some(dzeta);
        self
    }

    /// the number of bunches (a value of 0 or smaller selects single-bunch
    /// operation)
    pub fn num_bunches(mut self, num_bunches: i64) -> Self {
        self.num_bunches = num_bunches;
        self
    }

    /// the absolute bunch number of the first tracked bunch
    pub fn i_bunch_0(mut self, i_bunch_0: i64) -> Self {
        self.i_bunch_0 = i_bunch_0;
        self
    }

    /// the center-to-center bunch spacing (in zeta)
    pub fn bunch_spacing_zeta(mut self, bunch_spacing_zeta: f64) -> Self {
        self.bunch_spacing_zeta = bunch_spacing_zeta;
        self
    }

    /// whether to track first moments alongside the second moments
    /// (defaults to `true`)
    pub fn track_first_moments(mut self, track_first_moments: bool) -> Self {
        self.track_first_moments = track_first_moments;
        self
    }

    pub fn build(self) -> Result<MomentAccumulator, Error> {
        let Some(num_slices) = self.num_slices else {
            return Err(Error::slicer_config(
                "slice grid",
                "num_slices was never specified".to_owned(),
            ));
        };
        let Some(z_min) = self.z_min else {
            return Err(Error::slicer_config(
                "slice grid",
                "z_min was never specified".to_owned(),
            ));
        };
        let Some(dzeta) = self.dzeta else {
            return Err(Error::slicer_config(
                "slice grid",
                "dzeta was never specified".to_owned(),
            ));
        };

        if !(1..=(u32::MAX as i64)).contains(&num_slices) {
            return Err(Error::integer_range(
                "num_slices",
                num_slices,
                1,
                u32::MAX as i64,
            ));
        }
        let geometry = SliceGeometry::new(num_slices as usize, z_min, dzeta)
            .map_err(|what| Error::slicer_config("slice grid", what.to_owned()))?;

        let bunches = if self.num_bunches > 0 {
            if self.num_bunches > (u32::MAX as i64) {
                return Err(Error::integer_range(
                    "num_bunches",
                    self.num_bunches,
                    1,
                    u32::MAX as i64,
                ));
            }
            let train = BunchTrain::new(
                self.num_bunches as usize,
                self.i_bunch_0,
                self.bunch_spacing_zeta,
            )
            .map_err(|what| Error::slicer_config("bunch train", what.to_owned()))?;
            Some(train)
        } else {
            None
        };

        let slicer = ZetaSlicer::new(geometry, bunches);
        let reducer = SliceMoments::new(self.track_first_moments);
        let binned_statepack = vec![0.0; slicer.n_bins() * reducer.accum_state_size()];
        Ok(MomentAccumulator {
            reducer,
            slicer,
            binned_statepack,
        })
    }
}
