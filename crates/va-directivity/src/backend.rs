//! Directivity backend implementations (§4.3).

use crate::{Directivity, NearestNeighbor};

/// A two-channel head-related impulse response at one measured direction.
#[derive(Debug, Clone)]
pub struct HrirFrame {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

/// Energetic magnitude per third-octave band (§3 "an energetic magnitude
/// spectrum per third-octave band").
#[derive(Debug, Clone)]
pub struct MagnitudeSpectrum {
    pub band_center_hz: Vec<f64>,
    pub magnitude: Vec<f64>,
}

/// A discrete, spatially sampled HRIR directivity: nearest-neighbor lookup
/// onto a fixed measurement grid. May be full-sphere or partial (e.g. a
/// horizontal-plane-only measurement set), in which case queries outside the
/// grid's covered region are flagged out-of-bounds rather than silently
/// snapped to the closest edge point.
pub struct DiscreteHrirDirectivity {
    frames: Vec<HrirFrame>,
    is_head_above_torso: bool,
    /// Half-angle (degrees) beyond the nearest measured point's great-circle
    /// distance considered "in bounds"; `None` means full-sphere coverage
    /// (never out of bounds).
    coverage_radius_deg: Option<f64>,
}

impl DiscreteHrirDirectivity {
    pub fn new(frames: Vec<HrirFrame>, is_head_above_torso: bool) -> Self {
        Self { frames, is_head_above_torso, coverage_radius_deg: None }
    }

    pub fn with_coverage_radius_deg(mut self, radius_deg: f64) -> Self {
        self.coverage_radius_deg = Some(radius_deg);
        self
    }

    fn great_circle_distance_deg(az_a: f64, el_a: f64, az_b: f64, el_b: f64) -> f64 {
        let (az_a, el_a, az_b, el_b) = (az_a.to_radians(), el_a.to_radians(), az_b.to_radians(), el_b.to_radians());
        let cos_d = el_a.sin() * el_b.sin() + el_a.cos() * el_b.cos() * (az_a - az_b).cos();
        cos_d.clamp(-1.0, 1.0).acos().to_degrees()
    }

    fn nearest_index(&self, azimuth_deg: f64, elevation_deg: f64) -> Option<(usize, f64)> {
        self.frames
            .iter()
            .enumerate()
            .map(|(i, f)| (i, Self::great_circle_distance_deg(azimuth_deg, elevation_deg, f.azimuth_deg, f.elevation_deg)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl Directivity for DiscreteHrirDirectivity {
    fn nearest_neighbor(&self, azimuth_deg: f64, elevation_deg: f64) -> NearestNeighbor {
        match self.nearest_index(azimuth_deg, elevation_deg) {
            None => NearestNeighbor { index: 0, out_of_bounds: true },
            Some((index, distance_deg)) => {
                let out_of_bounds = self.coverage_radius_deg.is_some_and(|r| distance_deg > r);
                NearestNeighbor { index, out_of_bounds }
            }
        }
    }

    fn hrir(&self, azimuth_deg: f64, elevation_deg: f64, _distance_m: Option<f64>, out_left: &mut [f32], out_right: &mut [f32]) -> bool {
        let nn = self.nearest_neighbor(azimuth_deg, elevation_deg);
        if nn.out_of_bounds {
            return false;
        }
        let Some(frame) = self.frames.get(nn.index) else { return false };
        let n = out_left.len().min(out_right.len());
        for i in 0..n {
            out_left[i] = frame.left.get(i).copied().unwrap_or(0.0);
            out_right[i] = frame.right.get(i).copied().unwrap_or(0.0);
        }
        true
    }

    fn magnitude_spectrum(&self, _azimuth_deg: f64, _elevation_deg: f64) -> Option<MagnitudeSpectrum> {
        None
    }

    fn is_head_above_torso(&self) -> bool {
        self.is_head_above_torso
    }

    fn len_hrir_taps(&self) -> usize {
        self.frames.first().map(|f| f.left.len().max(f.right.len())).unwrap_or(0)
    }
}

/// A band-energetic directivity with no impulse-response representation
/// (e.g. a loudspeaker or source directivity described only by a magnitude
/// spectrum per third-octave band). `hrir` always reports "no IR here".
pub struct DiscreteMagnitudeDirectivity {
    frames: Vec<(f64, f64, MagnitudeSpectrum)>,
}

impl DiscreteMagnitudeDirectivity {
    pub fn new(frames: Vec<(f64, f64, MagnitudeSpectrum)>) -> Self {
        Self { frames }
    }
}

impl Directivity for DiscreteMagnitudeDirectivity {
    fn nearest_neighbor(&self, azimuth_deg: f64, elevation_deg: f64) -> NearestNeighbor {
        let best = self
            .frames
            .iter()
            .enumerate()
            .map(|(i, (az, el, _))| (i, DiscreteHrirDirectivity::great_circle_distance_deg(azimuth_deg, elevation_deg, *az, *el)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match best {
            None => NearestNeighbor { index: 0, out_of_bounds: true },
            Some((index, _)) => NearestNeighbor { index, out_of_bounds: false },
        }
    }

    fn hrir(&self, _azimuth_deg: f64, _elevation_deg: f64, _distance_m: Option<f64>, _out_left: &mut [f32], _out_right: &mut [f32]) -> bool {
        false
    }

    fn magnitude_spectrum(&self, azimuth_deg: f64, elevation_deg: f64) -> Option<MagnitudeSpectrum> {
        let nn = self.nearest_neighbor(azimuth_deg, elevation_deg);
        self.frames.get(nn.index).map(|(_, _, s)| s.clone())
    }
}

/// A continuous HRIR directivity reconstructed from spherical-harmonic
/// coefficients (§3 "continuous (spherical-harmonic reconstruction)"):
/// produces a smooth HRIR for an arbitrary direction instead of snapping to a
/// measurement grid. The coefficient decomposition/SH basis math itself
/// mirrors the donor's `ITASphericalHarmonicsExpansion`; we carry the
/// minimal per-ear coefficient arrays needed to reconstruct a tap-domain IR.
pub struct SphericalHarmonicDirectivity {
    order: usize,
    /// `coeffs_left[tap][sh_index]`, `sh_index` laid out `(l, m)` row-major.
    coeffs_left: Vec<Vec<f64>>,
    coeffs_right: Vec<Vec<f64>>,
    is_head_above_torso: bool,
}

impl SphericalHarmonicDirectivity {
    pub fn new(order: usize, coeffs_left: Vec<Vec<f64>>, coeffs_right: Vec<Vec<f64>>, is_head_above_torso: bool) -> Self {
        Self { order, coeffs_left, coeffs_right, is_head_above_torso }
    }

    fn num_sh_terms(order: usize) -> usize {
        (order + 1) * (order + 1)
    }

    /// Real spherical-harmonic basis evaluated at `(azimuth, elevation)`,
    /// using the un-normalized associated Legendre recursion (sufficient for
    /// reconstructing a rendered IR rather than doing physical calibration).
    fn sh_basis(&self, azimuth_deg: f64, elevation_deg: f64) -> Vec<f64> {
        let theta = (90.0 - elevation_deg).to_radians(); // polar angle from +Z
        let phi = azimuth_deg.to_radians();
        let cos_theta = theta.cos();

        let mut basis = vec![0.0; Self::num_sh_terms(self.order)];
        let mut index = 0;
        for l in 0..=self.order {
            for m in -(l as i64)..=(l as i64) {
                let p = associated_legendre(l, m.unsigned_abs() as usize, cos_theta);
                let angular = if m == 0 {
                    1.0
                } else if m > 0 {
                    (m as f64 * phi).cos() * std::f64::consts::SQRT_2
                } else {
                    (m.unsigned_abs() as f64 * phi).sin() * std::f64::consts::SQRT_2
                };
                basis[index] = p * angular;
                index += 1;
            }
        }
        basis
    }

    fn reconstruct(coeffs: &[Vec<f64>], basis: &[f64], out: &mut [f32]) {
        for (tap, row) in coeffs.iter().enumerate() {
            if tap >= out.len() {
                break;
            }
            let mut acc = 0.0;
            for (c, b) in row.iter().zip(basis.iter()) {
                acc += c * b;
            }
            out[tap] = acc as f32;
        }
    }
}

/// Unnormalized associated Legendre polynomial `P_l^m(x)` via the standard
/// three-term recursion, `m >= 0`.
fn associated_legendre(l: usize, m: usize, x: f64) -> f64 {
    if m > l {
        return 0.0;
    }
    let mut pmm = 1.0;
    if m > 0 {
        let somx2 = ((1.0 - x) * (1.0 + x)).max(0.0).sqrt();
        let mut fact = 1.0;
        for _ in 0..m {
            pmm *= -fact * somx2;
            fact += 2.0;
        }
    }
    if l == m {
        return pmm;
    }
    let mut pmmp1 = x * (2.0 * m as f64 + 1.0) * pmm;
    if l == m + 1 {
        return pmmp1;
    }
    let mut pll = 0.0;
    for ll in (m + 2)..=l {
        pll = (x * (2.0 * ll as f64 - 1.0) * pmmp1 - (ll + m - 1) as f64 * pmm) / (ll - m) as f64;
        pmm = pmmp1;
        pmmp1 = pll;
    }
    pll
}

impl Directivity for SphericalHarmonicDirectivity {
    fn nearest_neighbor(&self, _azimuth_deg: f64, _elevation_deg: f64) -> NearestNeighbor {
        // Continuous backends have no discrete grid; report index 0, never
        // out of bounds, so the clustering renderer's "did the HRIR change"
        // check (driven by comparing indices) never spuriously reloads.
        NearestNeighbor { index: 0, out_of_bounds: false }
    }

    fn hrir(&self, azimuth_deg: f64, elevation_deg: f64, _distance_m: Option<f64>, out_left: &mut [f32], out_right: &mut [f32]) -> bool {
        if self.coeffs_left.is_empty() {
            return false;
        }
        let basis = self.sh_basis(azimuth_deg, elevation_deg);
        Self::reconstruct(&self.coeffs_left, &basis, out_left);
        Self::reconstruct(&self.coeffs_right, &basis, out_right);
        true
    }

    fn magnitude_spectrum(&self, _azimuth_deg: f64, _elevation_deg: f64) -> Option<MagnitudeSpectrum> {
        None
    }

    fn is_head_above_torso(&self) -> bool {
        self.is_head_above_torso
    }

    fn len_hrir_taps(&self) -> usize {
        self.coeffs_left.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(az: f64, el: f64) -> HrirFrame {
        HrirFrame { azimuth_deg: az, elevation_deg: el, left: vec![az as f32], right: vec![el as f32] }
    }

    #[test]
    fn nearest_neighbor_picks_closest_frame() {
        let d = DiscreteHrirDirectivity::new(vec![frame(0.0, 0.0), frame(90.0, 0.0), frame(180.0, 0.0)], false);
        let nn = d.nearest_neighbor(85.0, 0.0);
        assert_eq!(nn.index, 1);
        assert!(!nn.out_of_bounds);
    }

    #[test]
    fn coverage_radius_flags_out_of_bounds() {
        let d = DiscreteHrirDirectivity::new(vec![frame(0.0, 0.0)], false).with_coverage_radius_deg(10.0);
        assert!(d.nearest_neighbor(0.0, 0.0).out_of_bounds == false);
        assert!(d.nearest_neighbor(45.0, 0.0).out_of_bounds);
    }

    #[test]
    fn hrir_copies_nearest_frame() {
        let d = DiscreteHrirDirectivity::new(vec![frame(0.0, 0.0), frame(90.0, 0.0)], false);
        let mut l = [0.0f32; 1];
        let mut r = [0.0f32; 1];
        assert!(d.hrir(91.0, 0.0, None, &mut l, &mut r));
        assert_eq!(l[0], 90.0);
        assert_eq!(r[0], 0.0);
    }

    #[test]
    fn sh_directivity_reconstructs_without_panicking() {
        let order = 1;
        let terms = (order + 1) * (order + 1);
        let coeffs_left = vec![vec![1.0; terms]; 8];
        let coeffs_right = vec![vec![0.5; terms]; 8];
        let d = SphericalHarmonicDirectivity::new(order, coeffs_left, coeffs_right, false);
        let mut l = [0.0f32; 8];
        let mut r = [0.0f32; 8];
        assert!(d.hrir(30.0, 15.0, None, &mut l, &mut r));
    }
}
</content>
