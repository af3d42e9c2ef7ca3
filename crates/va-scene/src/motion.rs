//! Motion state (§3): position/orientation plus the real-world tracked pose
//! and head-above-torso orientation a receiver carries separately from its
//! simulated pose.
//!
//! Per Design Notes §9, the donor's pool-allocated motion state is modeled
//! here as a plain `Copy` value embedded in the (already pooled, see
//! [`crate::SceneStateRecord`]) per-entity record rather than pooled a
//! second time — the surrounding record's Arc/COW sharing already avoids the
//! per-update allocation the donor's pool existed to amortize.

use va_core::{Orientation, Vec3};

/// Position, orientation, and the derived view/up vectors every entity in
/// the scene graph carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    pub position: Vec3,
    pub orientation: Orientation,
    /// Head-tracking pose in real-world (room) coordinates, distinct from
    /// the simulated `position`/`orientation` (§3 receiver "real-world"
    /// pose).
    pub real_world_position: Vec3,
    pub real_world_orientation: Orientation,
    /// Head-above-torso orientation offset (receivers only; zero rotation
    /// for sound sources).
    pub head_above_torso: Orientation,
    /// Core-clock block index at which this motion state was created,
    /// carried verbatim from the donor's per-pool-object creation
    /// timestamp (§3).
    pub created_at_block: u64,
}

impl MotionState {
    pub fn at_origin(created_at_block: u64) -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Orientation::identity(),
            real_world_position: Vec3::zeros(),
            real_world_orientation: Orientation::identity(),
            head_above_torso: Orientation::identity(),
            created_at_block,
        }
    }

    /// Forward-looking "view" vector derived from `orientation`, matching
    /// the donor's convention of `-Z` as the listener's forward axis.
    pub fn view(&self) -> Vec3 {
        self.orientation * Vec3::new(0.0, 0.0, -1.0)
    }

    /// Up vector derived from `orientation`.
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::new(0.0, 1.0, 0.0)
    }

    pub fn with_pose(mut self, position: Vec3, orientation: Orientation) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_orientation_looks_down_negative_z() {
        let m = MotionState::at_origin(0);
        assert!((m.view() - Vec3::new(0.0, 0.0, -1.0)).norm() < 1e-9);
        assert!((m.up() - Vec3::new(0.0, 1.0, 0.0)).norm() < 1e-9);
    }
}
</content>
