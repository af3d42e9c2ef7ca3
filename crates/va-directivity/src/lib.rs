//! va-directivity: reference-counted store of directional transfer data (§4.3).
//!
//! Grounded on the donor engine's `CVADirectivityManager` / `IVADirectivity`
//! hierarchy (HRIR vs. third-octave-band energetic directivities, discrete
//! nearest-neighbor lookup vs. continuous spherical-harmonic reconstruction).
//! Identity here is a small integer (`DirectivityId`), matching the donor's
//! `int` directivity handles rather than a string.

mod backend;
mod manager;

pub use backend::{
    DiscreteHrirDirectivity, DiscreteMagnitudeDirectivity, HrirFrame, MagnitudeSpectrum,
    SphericalHarmonicDirectivity,
};
pub use manager::{DirectivityInfo, DirectivityManager};

use va_core::VaResult;

/// Small-integer directivity identity (§3 "Directivity. Identity is a small integer").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct DirectivityId(pub i32);

impl DirectivityId {
    pub const INVALID: Self = Self(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for DirectivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a nearest-neighbor direction lookup (§4.3): the index into the
/// backend's measurement grid, plus whether the query fell outside the
/// backend's covered solid angle (partial-sphere directivities).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearestNeighbor {
    pub index: usize,
    pub out_of_bounds: bool,
}

/// Behavior every directivity backend must provide. A backend is either
/// discrete (nearest-neighbor onto a measurement grid) or continuous
/// (spherical-harmonic reconstruction) — see [`DiscreteHrirDirectivity`] and
/// [`SphericalHarmonicDirectivity`].
pub trait Directivity: Send + Sync {
    /// Nearest measured direction to `(azimuth_deg, elevation_deg)`, used by
    /// the binaural clustering renderer (§4.5 step 2.c) to detect when a
    /// cluster's HRIR needs to change.
    fn nearest_neighbor(&self, azimuth_deg: f64, elevation_deg: f64) -> NearestNeighbor;

    /// Copy the two-channel HRIR for `(azimuth_deg, elevation_deg[, distance_m])`
    /// into `out_left`/`out_right`. Returns `false` (leaving the buffers
    /// untouched) if this backend has no impulse-response representation —
    /// callers fall back to silence per §4.5 "missing directivity → silence".
    fn hrir(&self, azimuth_deg: f64, elevation_deg: f64, distance_m: Option<f64>, out_left: &mut [f32], out_right: &mut [f32]) -> bool;

    /// Energetic magnitude per third-octave band for `(azimuth_deg, elevation_deg)`,
    /// for backends that only carry magnitude-spectrum data.
    fn magnitude_spectrum(&self, azimuth_deg: f64, elevation_deg: f64) -> Option<MagnitudeSpectrum>;

    /// Whether this backend was built from a head-above-torso HRIR variant
    /// (detected via a metadata key at construction, §4.3).
    fn is_head_above_torso(&self) -> bool {
        false
    }

    fn len_hrir_taps(&self) -> usize {
        0
    }
}

/// Marker trait bound used where a backend factory is registered by class
/// name (§9 "creation is via a registry keyed by class name").
pub type BackendFactory = Box<dyn Fn(&DirectivityParams) -> VaResult<Box<dyn Directivity>> + Send + Sync>;

/// Parameters used to construct a directivity backend. File-format parsing
/// itself (DAFF) is out of scope (§1); this struct is the already-decoded
/// handoff shape a loader would populate.
#[derive(Debug, Clone, Default)]
pub struct DirectivityParams {
    pub class_name: String,
    pub file_path: Option<String>,
    pub is_head_above_torso: bool,
}
</content>
