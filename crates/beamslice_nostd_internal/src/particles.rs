//! Read-only particle views and the optional per-particle output records.

use crate::bins::SliceAssignment;
use crate::reducer::ParticleDatum;

/// sentinel written to per-particle output slots that didn't resolve
pub const UNASSIGNED: i64 = -1;

/// Collection of particle properties.
///
/// Each phase-space coordinate is its own contiguous slice (one entry per
/// particle), matching how tracking codes store particle collections. A
/// particle's stable index is its position within these slices; that same
/// index addresses the per-particle output buffers in
/// [`AssignmentRecords`].
pub struct ParticleView<'a> {
    x: &'a [f64],
    px: &'a [f64],
    y: &'a [f64],
    py: &'a [f64],
    zeta: &'a [f64],
    delta: &'a [f64],
    weights: Option<&'a [f64]>,
    n_particles: usize,
}

impl<'a> ParticleView<'a> {
    /// create a new instance
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: &'a [f64],
        px: &'a [f64],
        y: &'a [f64],
        py: &'a [f64],
        zeta: &'a [f64],
        delta: &'a [f64],
        weights: Option<&'a [f64]>,
    ) -> Result<ParticleView<'a>, &'static str> {
        let n_particles = x.len();
        // an empty collection is fine (the kernel is then a no-op)
        if [px, y, py, zeta, delta]
            .iter()
            .any(|arr| arr.len() != n_particles)
        {
            Err("all coordinate arrays must hold one entry per particle")
        } else if weights.is_some_and(|w| w.len() != n_particles) {
            Err("weights must hold one entry per particle")
        } else {
            Ok(Self {
                x,
                px,
                y,
                py,
                zeta,
                delta,
                weights,
                n_particles,
            })
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n_particles
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_particles == 0
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// If no weights are provided, returns 1.0, i.e., weights are just
    /// counts.
    #[inline]
    pub fn get_weight(&self, idx: usize) -> f64 {
        if let Some(weights) = self.weights {
            weights[idx]
        } else {
            1.0
        }
    }

    /// The longitudinal coordinate of particle `idx` (the only coordinate
    /// classification looks at).
    #[inline]
    pub fn zeta(&self, idx: usize) -> f64 {
        self.zeta[idx]
    }

    /// Gathers particle `idx` into the form reducers consume.
    #[inline]
    pub fn datum(&self, idx: usize) -> ParticleDatum {
        ParticleDatum {
            coords: [
                self.x[idx],
                self.px[idx],
                self.y[idx],
                self.py[idx],
                self.zeta[idx],
                self.delta[idx],
            ],
            weight: self.get_weight(idx),
        }
    }
}

fn split_opt<'a>(
    buf: Option<&'a mut [i64]>,
    mid: usize,
) -> (Option<&'a mut [i64]>, Option<&'a mut [i64]>) {
    match buf {
        Some(buf) => {
            let (head, tail) = buf.split_at_mut(mid);
            (Some(head), Some(tail))
        }
        None => (None, None),
    }
}

/// The optional per-particle output buffers recording resolved indices.
///
/// Each buffer is an independently present-or-absent capability: the
/// slice-index buffer receives a particle's resolved slice index when it was
/// fully assigned, the bunch-index buffer receives the absolute bunch number
/// whenever bunch resolution succeeded. All other slots of an enabled buffer
/// get [`UNASSIGNED`].
///
/// Particles are always addressed by their absolute index. Splitting (for
/// parallel execution) produces sub-records that remember their global
/// offset, so every segment keeps recording with absolute indices while
/// writing to disjoint buffer ranges.
pub struct AssignmentRecords<'a> {
    slice_indices: Option<&'a mut [i64]>,
    bunch_indices: Option<&'a mut [i64]>,
    offset: usize,
}

impl<'a> AssignmentRecords<'a> {
    pub fn new(
        slice_indices: Option<&'a mut [i64]>,
        bunch_indices: Option<&'a mut [i64]>,
    ) -> Self {
        Self {
            slice_indices,
            bunch_indices,
            offset: 0,
        }
    }

    /// Records with both outputs disabled (classification outcomes are
    /// simply dropped).
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    pub fn records_slice_index(&self) -> bool {
        self.slice_indices.is_some()
    }

    pub fn records_bunch_index(&self) -> bool {
        self.bunch_indices.is_some()
    }

    /// Length of the slice-index buffer, when enabled.
    pub fn slice_indices_len(&self) -> Option<usize> {
        self.slice_indices.as_deref().map(<[i64]>::len)
    }

    /// Length of the bunch-index buffer, when enabled.
    pub fn bunch_indices_len(&self) -> Option<usize> {
        self.bunch_indices.as_deref().map(<[i64]>::len)
    }

    /// Whether every enabled buffer can hold entries for all particle
    /// indices in `start..stop` (expects `start <= stop`).
    pub fn covers(&self, start: usize, stop: usize) -> bool {
        let slice_ok = match self.slice_indices.as_deref() {
            Some(buf) => (start >= self.offset) && ((stop - self.offset) <= buf.len()),
            None => true,
        };
        let bunch_ok = match self.bunch_indices.as_deref() {
            Some(buf) => (start >= self.offset) && ((stop - self.offset) <= buf.len()),
            None => true,
        };
        slice_ok && bunch_ok
    }

    /// Writes the outputs for particle `ipart` (an absolute index).
    #[inline]
    pub fn record(&mut self, ipart: usize, assignment: &SliceAssignment) {
        debug_assert!(ipart >= self.offset);
        let entry = ipart - self.offset;
        let (i_bunch, i_slice) = match assignment {
            SliceAssignment::OutsideBunchWindow => (UNASSIGNED, UNASSIGNED),
            SliceAssignment::OutsideSliceGrid { i_bunch } => (*i_bunch, UNASSIGNED),
            SliceAssignment::Assigned {
                i_bunch, i_slice, ..
            } => (*i_bunch, *i_slice as i64),
        };
        if let Some(buf) = self.bunch_indices.as_deref_mut() {
            buf[entry] = i_bunch;
        }
        if let Some(buf) = self.slice_indices.as_deref_mut() {
            buf[entry] = i_slice;
        }
    }

    /// Splits into records covering particles `offset..offset + mid` and
    /// `offset + mid..`, consuming `self`.
    ///
    /// Panics when an enabled buffer holds fewer than `mid` entries.
    pub fn split_at_mut(self, mid: usize) -> (AssignmentRecords<'a>, AssignmentRecords<'a>) {
        let (slice_head, slice_tail) = split_opt(self.slice_indices, mid);
        let (bunch_head, bunch_tail) = split_opt(self.bunch_indices, mid);
        (
            Self {
                slice_indices: slice_head,
                bunch_indices: bunch_head,
                offset: self.offset,
            },
            Self {
                slice_indices: slice_tail,
                bunch_indices: bunch_tail,
                offset: self.offset + mid,
            },
        )
    }
}
