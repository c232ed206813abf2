//! Implements the longitudinal binning geometry: a uniform slice grid within
//! a bunch, an optional train of equally spaced bunches, and the
//! [`ZetaSlicer`] classifier that maps a particle's zeta coordinate onto a
//! flat bin index.

/// Outcome of classifying a single particle's zeta coordinate.
///
/// The absolute bunch number is reported whenever bunch resolution
/// succeeded, even if the particle then missed its bunch's slice grid; only
/// [`SliceAssignment::Assigned`] particles contribute to accumulators.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(Debug))]
pub enum SliceAssignment {
    /// `zeta` doesn't resolve to any bunch slot in the train's window
    /// (never produced in single-bunch mode)
    OutsideBunchWindow,
    /// the bunch resolved, but `zeta` falls outside that bunch's slice grid
    OutsideSliceGrid { i_bunch: i64 },
    /// fully assigned to a slice of an eligible bunch
    Assigned {
        i_bunch: i64,
        bunch_rel: usize,
        i_slice: usize,
    },
}

/// Geometry of the uniform slice grid within a single bunch.
///
/// `z_min` is the *center* of slice 0, not its edge; the grid's left edge
/// sits half a slice width below it. Slices are left-closed and right-open.
#[derive(Clone, PartialEq)]
#[cfg_attr(test, derive(Debug))]
pub struct SliceGeometry {
    num_slices: usize,
    z_min: f64,
    dzeta: f64,
}

impl SliceGeometry {
    /// Note that we initialize with the center of slice 0 rather than the
    /// grid's left edge
    pub fn new(num_slices: usize, z_min: f64, dzeta: f64) -> Result<Self, &'static str> {
        if num_slices == 0 {
            Err("the number of slices must be greater than zero")
        } else if !z_min.is_finite() {
            Err("z_min must be finite")
        } else if !dzeta.is_finite() || (dzeta <= 0.0) {
            Err("dzeta must be finite and greater than zero")
        } else {
            Ok(Self {
                num_slices,
                z_min,
                dzeta,
            })
        }
    }

    #[inline]
    pub fn n_slices(&self) -> usize {
        self.num_slices
    }

    #[inline]
    pub fn z_min(&self) -> f64 {
        self.z_min
    }

    #[inline]
    pub fn dzeta(&self) -> f64 {
        self.dzeta
    }

    /// Left edge of slice 0.
    #[inline]
    pub fn z_min_edge(&self) -> f64 {
        self.z_min - 0.5 * self.dzeta
    }

    /// Calculate the slice index for `zeta`, measuring from `left_edge`.
    ///
    /// A value on a slice's left edge belongs to that slice (intervals never
    /// include the right edge). Returns `None` when `zeta` falls outside the
    /// grid. The guard is written in positive form so that a NaN quotient
    /// (non-finite `zeta`) also maps to `None`.
    #[inline]
    pub fn slice_index(&self, zeta: f64, left_edge: f64) -> Option<usize> {
        let quotient = (zeta - left_edge) / self.dzeta;
        if (quotient >= 0.0) && (quotient < (self.num_slices as f64)) {
            // this cast truncates, which matches floor for non-negative values
            Some(quotient as usize)
        } else {
            None
        }
    }
}

/// A train of equally spaced bunches.
///
/// Absolute bunch numbers count spacing-widths from the slice grid's left
/// edge; `i_bunch_0` names the bunch occupying relative slot 0, so the train
/// covers absolute bunches `i_bunch_0..i_bunch_0 + num_bunches`.
#[derive(Clone, PartialEq)]
#[cfg_attr(test, derive(Debug))]
pub struct BunchTrain {
    num_bunches: usize,
    i_bunch_0: i64,
    bunch_spacing_zeta: f64,
}

impl BunchTrain {
    pub fn new(
        num_bunches: usize,
        i_bunch_0: i64,
        bunch_spacing_zeta: f64,
    ) -> Result<Self, &'static str> {
        if num_bunches == 0 {
            Err("the number of bunches must be greater than zero")
        } else if !bunch_spacing_zeta.is_finite() || (bunch_spacing_zeta <= 0.0) {
            Err("the bunch spacing must be finite and greater than zero")
        } else {
            Ok(Self {
                num_bunches,
                i_bunch_0,
                bunch_spacing_zeta,
            })
        }
    }

    #[inline]
    pub fn n_bunches(&self) -> usize {
        self.num_bunches
    }

    #[inline]
    pub fn i_bunch_0(&self) -> i64 {
        self.i_bunch_0
    }

    #[inline]
    pub fn bunch_spacing_zeta(&self) -> f64 {
        self.bunch_spacing_zeta
    }
}

/// Maps a particle's longitudinal coordinate onto `(bunch, slice)` bins.
///
/// Without a bunch train, every particle implicitly belongs to bunch 0 and
/// only the slice lookup applies. With a train, the particle's absolute
/// bunch number is the floor-quotient of its zeta offset (from the slice
/// grid's left edge) against the bunch spacing; the particle is
/// bunch-eligible when that number lands in the train's window. The absolute
/// bunch number then anchors the left edge of that bunch's own slice grid.
///
/// Flat bin indices run slice-fastest: `i_slice + bunch_rel * num_slices`.
#[derive(Clone, PartialEq)]
#[cfg_attr(test, derive(Debug))]
pub struct ZetaSlicer {
    geometry: SliceGeometry,
    bunches: Option<BunchTrain>,
}

impl ZetaSlicer {
    pub fn new(geometry: SliceGeometry, bunches: Option<BunchTrain>) -> Self {
        Self { geometry, bunches }
    }

    #[inline]
    pub fn n_slices(&self) -> usize {
        self.geometry.n_slices()
    }

    /// Number of bunch slots (1 without a bunch train).
    #[inline]
    pub fn n_bunches(&self) -> usize {
        self.bunches.as_ref().map_or(1, BunchTrain::n_bunches)
    }

    /// Total number of flat bins.
    pub fn n_bins(&self) -> usize {
        self.n_slices() * self.n_bunches()
    }

    pub fn geometry(&self) -> &SliceGeometry {
        &self.geometry
    }

    pub fn bunches(&self) -> Option<&BunchTrain> {
        self.bunches.as_ref()
    }

    /// Flattens a (relative bunch, slice) pair into a bin index.
    #[inline]
    pub fn flat_bin(&self, bunch_rel: usize, i_slice: usize) -> usize {
        debug_assert!(bunch_rel < self.n_bunches());
        debug_assert!(i_slice < self.n_slices());
        i_slice + bunch_rel * self.n_slices()
    }

    /// Classifies a particle by its zeta coordinate.
    pub fn classify(&self, zeta: f64) -> SliceAssignment {
        let z_min_edge = self.geometry.z_min_edge();
        let (i_bunch, bunch_rel, bunch_left_edge) = match &self.bunches {
            None => (0, 0, z_min_edge),
            Some(train) => {
                let quotient = (zeta - z_min_edge) / train.bunch_spacing_zeta();
                // shift by the bunch origin before truncating: the eligible
                // range then starts at 0, where a plain cast agrees with
                // floor (casting a negative quotient would round the wrong
                // way). A NaN quotient fails the positive-form guard.
                let rel = quotient - (train.i_bunch_0() as f64);
                if (rel >= 0.0) && (rel < (train.n_bunches() as f64)) {
                    let bunch_rel = rel as usize;
                    let i_bunch = train.i_bunch_0() + (bunch_rel as i64);
                    let left_edge = z_min_edge + (i_bunch as f64) * train.bunch_spacing_zeta();
                    (i_bunch, bunch_rel, left_edge)
                } else {
                    return SliceAssignment::OutsideBunchWindow;
                }
            }
        };
        match self.geometry.slice_index(zeta, bunch_left_edge) {
            Some(i_slice) => SliceAssignment::Assigned {
                i_bunch,
                bunch_rel,
                i_slice,
            },
            None => SliceAssignment::OutsideSliceGrid { i_bunch },
        }
    }
}
