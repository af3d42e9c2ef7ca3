//! Control-thread half of the clustering algorithm (§4.5 steps 1-2): turn the
//! set of wavefronts bound to a receiver into a fresh [`ClusteringState`] of
//! at most `K` principal directions, ready to be swapped into the audio
//! thread's runtime state.

use va_core::Vec3;
use va_directivity::DirectivityId;

/// Renderer-wide tuning knobs, set once at construction from the
/// `Renderer:<id>` configuration section (§6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringConfig {
    /// `K`: the maximum number of principal directions (and therefore
    /// HRIR-convolver pairs) this renderer maintains per receiver.
    pub num_clusters: usize,
    /// Squared-distance error threshold below which a wavefront joins an
    /// already-open cluster rather than opening (or being forced into) a
    /// new one. Defaults to `4/K` (§4.5 step 2).
    pub threshold_sq_error: f64,
    /// Crossfade length, in samples, used when a cluster's nearest HRIR
    /// index changes; capped at `min(B, 32)` by the renderer regardless of
    /// this value (§4.5 step 3.c).
    pub crossfade_samples: usize,
    /// Amplitude calibration factor folded into every wavefront's gain
    /// (§4.5 step 3.a `gain = (1/distance) * source_power * calibration`).
    pub calibration: f64,
    /// Floor applied to source-to-receiver distance before computing gain
    /// and delay (§4.5 "near-zero distance is floored at a configurable
    /// minimum, default 0.25 m").
    pub min_distance_m: f64,
}

impl ClusteringConfig {
    pub fn new(num_clusters: usize) -> Self {
        let num_clusters = num_clusters.max(1);
        Self {
            num_clusters,
            threshold_sq_error: 4.0 / num_clusters as f64,
            crossfade_samples: 32,
            calibration: 1.0,
            min_distance_m: 0.25,
        }
    }
}

/// One wavefront assigned to a principal direction: a sound source's
/// incidence relative to the receiver's head, snapshotted at the
/// `update_scene` call that built this clustering (§4.5 step 2).
#[derive(Debug, Clone, PartialEq)]
pub struct WavefrontMember {
    pub source_id: i32,
    /// Source position relative to the receiver's head, in the receiver's
    /// local frame (`-Z` forward, `+Y` up), at clustering time.
    pub relative_to_head: Vec3,
    pub sound_power: f64,
    pub signal_source_id: Option<String>,
    pub muted: bool,
}

/// One principal direction: a running-mean unit vector plus the wavefronts
/// currently assigned to it (§4.5 "Each direction holds: a mean unit-vector
/// direction; a set of assigned wavefronts").
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalDirection {
    pub mean_direction: Vec3,
    pub members: Vec<WavefrontMember>,
    /// Largest squared-distance error observed among this cluster's
    /// members, tracked for diagnostics (§4.5 step 2 `max_error`).
    pub worst_sq_error: f64,
}

impl PrincipalDirection {
    fn open(direction: Vec3, member: WavefrontMember) -> Self {
        Self { mean_direction: direction, members: vec![member], worst_sq_error: 0.0 }
    }

    /// Running-mean update: `(dir*n + new_dir)/(n+1)`, renormalized to the
    /// unit sphere (§4.5 step 2).
    fn absorb(&mut self, direction: Vec3, member: WavefrontMember, sq_error: f64) {
        let n = self.members.len() as f64;
        let next = (self.mean_direction * n + direction) / (n + 1.0);
        self.mean_direction = if next.norm() > 1e-12 { next.normalize() } else { self.mean_direction };
        self.worst_sq_error = self.worst_sq_error.max(sq_error);
        self.members.push(member);
    }
}

/// A fully built clustering: the result of one `update_scene` rebuild,
/// swapped into the audio thread's runtime state as a single `Arc` (§4.5
/// step 3). Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringState {
    pub directions: Vec<PrincipalDirection>,
    pub receiver_enabled: bool,
    pub receiver_muted: bool,
    pub receiver_directivity_id: Option<DirectivityId>,
}

impl ClusteringState {
    pub fn silent() -> Self {
        Self { directions: Vec::new(), receiver_enabled: false, receiver_muted: false, receiver_directivity_id: None }
    }

    /// Build a clustering state from scratch (§4.5 step 2: "the donor engine
    /// always rebuilds rather than mutating the live one in place").
    /// `wavefronts` carries, for each bound source with a defined origin,
    /// its direction (relative to the receiver's head) and the scene data
    /// the audio thread needs without a second scene lookup.
    pub fn rebuild(
        config: &ClusteringConfig,
        receiver_enabled: bool,
        receiver_muted: bool,
        receiver_directivity_id: Option<DirectivityId>,
        wavefronts: impl IntoIterator<Item = WavefrontMember>,
    ) -> Self {
        let mut directions: Vec<PrincipalDirection> = Vec::new();

        for member in wavefronts {
            let norm = member.relative_to_head.norm();
            if norm < 1e-9 {
                // Origin undefined (source co-located with receiver): skip
                // this wavefront for the clustering that drives this block.
                continue;
            }
            let direction = member.relative_to_head / norm;

            let nearest = directions
                .iter()
                .enumerate()
                .map(|(i, d)| (i, (d.mean_direction - direction).norm_squared()))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match nearest {
                Some((i, sq_error)) if sq_error <= config.threshold_sq_error => {
                    directions[i].absorb(direction, member, sq_error);
                }
                Some((i, sq_error)) if directions.len() >= config.num_clusters => {
                    // Budget exhausted: assign to the closest cluster even
                    // though it is outside the threshold (§4.5 step 2).
                    directions[i].absorb(direction, member, sq_error);
                }
                _ => {
                    directions.push(PrincipalDirection::open(direction, member));
                }
            }
        }

        Self { directions, receiver_enabled, receiver_muted, receiver_directivity_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: i32, relative_to_head: Vec3) -> WavefrontMember {
        WavefrontMember { source_id: id, relative_to_head, sound_power: 1.0, signal_source_id: Some(format!("src{id}")), muted: false }
    }

    #[test]
    fn nearby_wavefronts_share_one_cluster() {
        let config = ClusteringConfig::new(4);
        let state = ClusteringState::rebuild(
            &config,
            true,
            false,
            None,
            vec![member(0, Vec3::new(0.0, 0.0, -1.0)), member(1, Vec3::new(0.01, 0.0, -1.0))],
        );
        assert_eq!(state.directions.len(), 1);
        assert_eq!(state.directions[0].members.len(), 2);
    }

    #[test]
    fn far_apart_wavefronts_open_distinct_clusters() {
        let config = ClusteringConfig::new(4);
        let state = ClusteringState::rebuild(
            &config,
            true,
            false,
            None,
            vec![member(0, Vec3::new(0.0, 0.0, -1.0)), member(1, Vec3::new(1.0, 0.0, 0.0))],
        );
        assert_eq!(state.directions.len(), 2);
    }

    #[test]
    fn budget_forces_assignment_to_closest_once_k_is_reached() {
        let mut config = ClusteringConfig::new(1);
        config.threshold_sq_error = 0.0; // force every wavefront past threshold
        let state = ClusteringState::rebuild(
            &config,
            true,
            false,
            None,
            vec![member(0, Vec3::new(0.0, 0.0, -1.0)), member(1, Vec3::new(1.0, 0.0, 0.0))],
        );
        assert_eq!(state.directions.len(), 1);
        assert_eq!(state.directions[0].members.len(), 2);
    }

    #[test]
    fn wavefront_at_receiver_origin_is_skipped() {
        let config = ClusteringConfig::new(4);
        let state = ClusteringState::rebuild(&config, true, false, None, vec![member(0, Vec3::new(0.0, 0.0, 0.0))]);
        assert!(state.directions.is_empty());
    }

    #[test]
    fn running_mean_renormalizes_to_unit_sphere() {
        let config = ClusteringConfig::new(4);
        let state = ClusteringState::rebuild(
            &config,
            true,
            false,
            None,
            vec![member(0, Vec3::new(0.0, 0.0, -2.0)), member(1, Vec3::new(0.1, 0.0, -2.0))],
        );
        assert_eq!(state.directions.len(), 1);
        assert!((state.directions[0].mean_direction.norm() - 1.0).abs() < 1e-9);
    }
}
