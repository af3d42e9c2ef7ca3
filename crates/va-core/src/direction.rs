//! Azimuth/elevation conversions for a local frame (§4.3, §4.5, §4.6): shared
//! by the binaural clustering renderer and the reproduction module's binaural
//! mixdown/CTC variants, both of which query a [`crate::Vec3`] direction
//! against a directivity's nearest-neighbor HRIR grid.
//!
//! Grounded on the donor engine's horizontal-polar convention (0 deg = front,
//! positive = clockwise/right, matching a directivity measurement grid's
//! azimuth axis) but expressed in terms of this workspace's own axes rather
//! than a standalone position type: forward is `-Z` and up is `+Y`, the same
//! convention [`va_scene::MotionState::view`]/`up` already use (that crate
//! depends on this one, not the other way around, so the convention is
//! anchored here), so a vector already in a local frame converts directly
//! with no extra basis change.

use crate::Vec3;

/// Convert a direction vector (local frame, need not be normalized) into
/// `(azimuth_deg, elevation_deg)`: azimuth 0 at `-Z` (front), increasing
/// towards `+X` (right); elevation 0 at the horizontal plane, increasing
/// towards `+Y` (up).
pub fn direction_to_az_el(direction: Vec3) -> (f64, f64) {
    let norm = direction.norm();
    if norm < 1e-12 {
        return (0.0, 0.0);
    }
    let unit = direction / norm;
    let azimuth = unit.x.atan2(-unit.z).to_degrees();
    let elevation = unit.y.clamp(-1.0, 1.0).asin().to_degrees();
    (azimuth, elevation)
}

/// Inverse of [`direction_to_az_el`]: a unit vector in the same local frame
/// for a given azimuth/elevation pair.
pub fn az_el_to_direction(azimuth_deg: f64, elevation_deg: f64) -> Vec3 {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg.to_radians();
    let cos_el = el.cos();
    Vec3::new(az.sin() * cos_el, el.sin(), -az.cos() * cos_el)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_is_zero_azimuth_and_elevation() {
        let (az, el) = direction_to_az_el(Vec3::new(0.0, 0.0, -1.0));
        assert!(az.abs() < 1e-9, "az={az}");
        assert!(el.abs() < 1e-9, "el={el}");
    }

    #[test]
    fn right_is_ninety_degrees_azimuth() {
        let (az, el) = direction_to_az_el(Vec3::new(1.0, 0.0, 0.0));
        assert!((az - 90.0).abs() < 1e-9, "az={az}");
        assert!(el.abs() < 1e-9);
    }

    #[test]
    fn straight_up_has_ninety_degree_elevation() {
        let (_, el) = direction_to_az_el(Vec3::new(0.0, 1.0, 0.0));
        assert!((el - 90.0).abs() < 1e-9, "el={el}");
    }

    #[test]
    fn round_trips_through_az_el() {
        let (az, el) = (37.0, -15.0);
        let dir = az_el_to_direction(az, el);
        let (az2, el2) = direction_to_az_el(dir);
        assert!((az - az2).abs() < 1e-6, "{az} vs {az2}");
        assert!((el - el2).abs() < 1e-6, "{el} vs {el2}");
    }
}
