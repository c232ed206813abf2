// each test binary that includes this module only exercises a subset of
// these helpers
#![allow(dead_code)]

// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

use beamslice::{COORD_NAMES, N_COORDS, ParticleView, Reducer, SliceMoments, UNASSIGNED};

use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;
use std::collections::HashMap;

pub type BinnedStatMap = HashMap<&'static str, Vec<f64>>;

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

/// Compares 2 maps of binned statistic-values. The `rtol_atol_vals` map
/// must carry a `[rtol, atol]` pair for every compared component (its key
/// set defines which components the other 2 maps are expected to hold).
pub fn assert_consistent_results(
    actual: &BinnedStatMap,
    expected: &BinnedStatMap,
    rtol_atol_vals: &HashMap<&'static str, [f64; 2]>,
) {
    for (designation, map) in [("actual", actual), ("expected", expected)] {
        let keys_match = (map.len() == rtol_atol_vals.len())
            && rtol_atol_vals.keys().all(|k| map.contains_key(k));
        assert!(
            keys_match,
            "`{designation}` & `rtol_atol_vals` don't have matching keys"
        );
    }

    for (key, [rtol, atol]) in rtol_atol_vals {
        let expected_vals = &expected[key];
        let actual_vals = &actual[key];
        assert_eq!(
            actual_vals.len(),
            expected_vals.len(),
            "the lengths of the '{key}' entry in actual and expected are unequal",
        );

        for (i, (actual_val, ref_val)) in actual_vals.iter().zip(expected_vals).enumerate() {
            assert!(
                isclose(*actual_val, *ref_val, *rtol, *atol),
                "map[\"{key}\"][{i}] values aren't equal to within rtol={rtol}, atol={atol}\
            \n  actual   = {actual_val}\
            \n  expected = {ref_val}",
            );
        }
    }
}

/// builds the tolerance map that [`assert_consistent_results`] expects,
/// applying the same `[rtol, atol]` pair to every listed component
pub fn uniform_tolerances(
    components: &[&'static str],
    rtol: f64,
    atol: f64,
) -> HashMap<&'static str, [f64; 2]> {
    HashMap::from_iter(components.iter().map(|name| (*name, [rtol, atol])))
}

/// Owns the per-particle arrays backing a [`ParticleView`].
pub struct OwnedParticleCollection {
    pub x: Vec<f64>,
    pub px: Vec<f64>,
    pub y: Vec<f64>,
    pub py: Vec<f64>,
    pub zeta: Vec<f64>,
    pub delta: Vec<f64>,
    pub weights: Option<Vec<f64>>,
}

impl OwnedParticleCollection {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn as_view<'a>(&'a self) -> ParticleView<'a> {
        self.range_view(0, self.len())
    }

    /// a view restricted to particles `start..stop`
    pub fn range_view<'a>(&'a self, start: usize, stop: usize) -> ParticleView<'a> {
        ParticleView::new(
            &self.x[start..stop],
            &self.px[start..stop],
            &self.y[start..stop],
            &self.py[start..stop],
            &self.zeta[start..stop],
            &self.delta[start..stop],
            self.weights.as_ref().map(|w| &w[start..stop]),
        )
        .unwrap()
    }

    pub fn weight(&self, ip: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |w| w[ip])
    }

    /// the coordinate arrays in the canonical `x, px, y, py, zeta, delta`
    /// ordering
    pub fn coord_arrays(&self) -> [&[f64]; N_COORDS] {
        [
            &self.x,
            &self.px,
            &self.y,
            &self.py,
            &self.zeta,
            &self.delta,
        ]
    }
}

/// setup an OwnedParticleCollection with randomly drawn properties
///
/// Every drawn value is integer-valued: summing them (or products of pairs
/// of them) is then exact, so reductions that reorder the additions still
/// produce bitwise-identical results. `zeta_range` is half-open.
pub fn setup_particle_cloud(
    seed: u64,
    n_particles: usize,
    zeta_range: (i64, i64),
    weighted: bool,
) -> OwnedParticleCollection {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let coord_dist = Uniform::try_from(-8..9_i64).unwrap();
    let zeta_dist = Uniform::try_from(zeta_range.0..zeta_range.1).unwrap();
    let weight_dist = Uniform::try_from(1..4_i64).unwrap();
    let sample = |dist: &Uniform<i64>, rng: &mut Xoshiro256PlusPlus, n: usize| -> Vec<f64> {
        (0..n).map(|_| dist.sample(rng) as f64).collect()
    };

    let x = sample(&coord_dist, &mut my_rng, n_particles);
    let px = sample(&coord_dist, &mut my_rng, n_particles);
    let y = sample(&coord_dist, &mut my_rng, n_particles);
    let py = sample(&coord_dist, &mut my_rng, n_particles);
    let zeta = sample(&zeta_dist, &mut my_rng, n_particles);
    let delta = sample(&coord_dist, &mut my_rng, n_particles);
    let weights = weighted.then(|| sample(&weight_dist, &mut my_rng, n_particles));

    OwnedParticleCollection {
        x,
        px,
        y,
        py,
        zeta,
        delta,
        weights,
    }
}

pub struct NaiveBunchParams {
    pub num_bunches: usize,
    pub i_bunch_0: i64,
    pub bunch_spacing_zeta: f64,
}

pub struct NaiveSlicerParams {
    pub num_slices: usize,
    /// center of slice 0 (not the grid's left edge)
    pub z_min: f64,
    pub dzeta: f64,
    pub bunches: Option<NaiveBunchParams>,
    pub track_first_moments: bool,
}

/// A deliberately simple formulation of the slicing reduction, for use as a
/// reference answer.
///
/// It resolves every index with explicit `floor` calls and accumulates into
/// one plain `Vec` per output component. Returns the binned statistics along
/// with the per-particle slice-index and bunch-index vectors (unresolved
/// entries hold [`UNASSIGNED`]).
pub fn naive_slice_moments(
    params: &NaiveSlicerParams,
    particles: &OwnedParticleCollection,
) -> (BinnedStatMap, Vec<i64>, Vec<i64>) {
    let n_particles = particles.len();
    let n_bunches = params.bunches.as_ref().map_or(1, |b| b.num_bunches);
    let n_bins = params.num_slices * n_bunches;

    let names = SliceMoments::new(params.track_first_moments).output_components();
    let mut columns: Vec<Vec<f64>> = names.iter().map(|_| vec![0.0; n_bins]).collect();
    let mut slice_indices = vec![UNASSIGNED; n_particles];
    let mut bunch_indices = vec![UNASSIGNED; n_particles];

    let z_min_edge = params.z_min - 0.5 * params.dzeta;
    let coords = particles.coord_arrays();

    for ip in 0..n_particles {
        let zeta = particles.zeta[ip];

        // the bunch number is recorded as soon as it resolves (even when the
        // particle then misses the bunch's slice grid)
        let (bunch_rel, grid_left_edge) = match &params.bunches {
            None => {
                bunch_indices[ip] = 0;
                (0_usize, z_min_edge)
            }
            Some(train) => {
                let i_bunch_f = ((zeta - z_min_edge) / train.bunch_spacing_zeta).floor();
                let lo = train.i_bunch_0 as f64;
                let hi = (train.i_bunch_0 + train.num_bunches as i64) as f64;
                if !(i_bunch_f >= lo && i_bunch_f < hi) {
                    continue;
                }
                let i_bunch = i_bunch_f as i64;
                bunch_indices[ip] = i_bunch;
                let bunch_rel = (i_bunch - train.i_bunch_0) as usize;
                let left_edge = z_min_edge + (i_bunch as f64) * train.bunch_spacing_zeta;
                (bunch_rel, left_edge)
            }
        };

        let i_slice_f = ((zeta - grid_left_edge) / params.dzeta).floor();
        if !(i_slice_f >= 0.0 && i_slice_f < (params.num_slices as f64)) {
            continue;
        }
        let i_slice = i_slice_f as usize;
        slice_indices[ip] = i_slice as i64;
        let flat = i_slice + bunch_rel * params.num_slices;

        // accumulate in output-component order: the weight sum, then (when
        // tracked) the 6 first moments, then the 21 second moments
        let w = particles.weight(ip);
        let vals: Vec<f64> = coords.iter().map(|arr| arr[ip]).collect();
        let mut slot = 0;
        columns[slot][flat] += w;
        slot += 1;
        if params.track_first_moments {
            for c in 0..N_COORDS {
                columns[slot][flat] += w * vals[c];
                slot += 1;
            }
        }
        for c1 in 0..N_COORDS {
            for c2 in c1..N_COORDS {
                columns[slot][flat] += w * vals[c1] * vals[c2];
                slot += 1;
            }
        }
    }

    let map = BinnedStatMap::from_iter(names.iter().cloned().zip(columns));
    (map, slice_indices, bunch_indices)
}

/// Derives bin `i_bin`'s 6x6 phase-space covariance matrix from the raw
/// moment sums (requires output produced with first-moment tracking and a
/// nonzero weight sum in that bin).
pub fn bin_covariance(out: &BinnedStatMap, i_bin: usize) -> [[f64; 6]; 6] {
    let weight_sum = out["weight_sum"][i_bin];

    let mut mean = [0.0; N_COORDS];
    for (c, name) in COORD_NAMES.iter().enumerate() {
        mean[c] = out[format!("sum_{name}").as_str()][i_bin] / weight_sum;
    }

    let mut cov = [[0.0; N_COORDS]; N_COORDS];
    for c1 in 0..N_COORDS {
        for c2 in c1..N_COORDS {
            let key = format!("sum_{}_{}", COORD_NAMES[c1], COORD_NAMES[c2]);
            let second = out[key.as_str()][i_bin] / weight_sum;
            let entry = second - mean[c1] * mean[c2];
            cov[c1][c2] = entry;
            cov[c2][c1] = entry;
        }
    }
    cov
}

/// Checks positive semi-definiteness (up to roundoff, controlled by `tol`)
/// by attempting a Cholesky factorization that clamps numerically-zero
/// pivots.
pub fn is_positive_semidefinite(matrix: &[[f64; 6]; 6], tol: f64) -> bool {
    let mut chol = [[0.0_f64; 6]; 6];
    for i in 0..6 {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= chol[i][k] * chol[j][k];
            }
            if i == j {
                if sum < -tol {
                    return false;
                }
                chol[i][i] = sum.max(0.0).sqrt();
            } else if chol[j][j] > 0.0 {
                chol[i][j] = sum / chol[j][j];
            } else if sum.abs() > tol {
                // a zero pivot forces the remainder of its column to zero
                return false;
            }
        }
    }
    true
}
