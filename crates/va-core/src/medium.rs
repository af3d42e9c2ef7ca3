//! The homogeneous propagation medium (§6 `global` / `HomogeneousMedium` config).

use serde::{Deserialize, Serialize};

/// Default speed of sound used wherever a medium has not overridden it, and
/// the spherical-head ITD model's propagation speed (§4.5).
pub const DEFAULT_SPEED_OF_SOUND: f64 = 343.0;

/// Default head radius for the spherical-head ITD/ILD model (§4.5): 9 cm.
pub const DEFAULT_HEAD_RADIUS_M: f64 = 0.09;

/// A homogeneous acoustic medium: temperature/pressure/humidity plus the
/// derived (or overridden) speed of sound, and an optional uniform "wind"
/// (shift velocity) field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomogeneousMedium {
    pub temperature_celsius: f64,
    pub static_pressure_pa: f64,
    pub relative_humidity_percent: f64,
    pub sound_speed_mps: f64,
    pub shift_velocity: [f64; 3],
}

impl Default for HomogeneousMedium {
    fn default() -> Self {
        Self {
            temperature_celsius: 20.0,
            static_pressure_pa: 101_325.0,
            relative_humidity_percent: 50.0,
            sound_speed_mps: DEFAULT_SPEED_OF_SOUND,
            shift_velocity: [0.0, 0.0, 0.0],
        }
    }
}

impl HomogeneousMedium {
    /// Speed of sound from temperature alone (ideal-gas approximation),
    /// used only when a config does not specify `sound_speed_mps` directly.
    pub fn sound_speed_from_temperature(temperature_celsius: f64) -> f64 {
        331.3 * (1.0 + temperature_celsius / 273.15).sqrt()
    }
}
</content>
