//! va-core: shared types, error taxonomy, pooling, and scalar primitives used
//! across the VA real-time workspace.

mod audio_source;
mod auralmode;
mod direction;
mod error;
mod medium;
mod pool;
mod sample;
mod time;

pub use audio_source::*;
pub use auralmode::*;
pub use direction::*;
pub use error::*;
pub use medium::*;
pub use pool::*;
pub use sample::*;
pub use time::*;

/// Standard sample rate options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum SampleRate {
    Hz44100 = 44100,
    Hz48000 = 48000,
    Hz88200 = 88200,
    Hz96000 = 96000,
    Hz176400 = 176400,
    Hz192000 = 192000,
}

impl SampleRate {
    #[inline]
    pub fn as_f64(self) -> f64 {
        self as u32 as f64
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::Hz44100
    }
}

/// Fixed audio block length `B` (§3): the unit of every real-time call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum BufferSize {
    Samples64 = 64,
    Samples128 = 128,
    Samples256 = 256,
    Samples512 = 512,
    Samples1024 = 1024,
}

impl BufferSize {
    #[inline]
    pub fn as_usize(self) -> usize {
        self as u32 as usize
    }

    pub fn latency_ms(self, sample_rate: SampleRate) -> f64 {
        (self.as_usize() as f64 / sample_rate.as_f64()) * 1000.0
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        Self::Samples128
    }
}

/// Decibel value wrapper shared by gain/power parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    pub const ZERO: Self = Self(0.0);
    pub const NEG_INF: Self = Self(f64::NEG_INFINITY);

    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        if gain <= 0.0 { Self::NEG_INF } else { Self(20.0 * gain.log10()) }
    }

    #[inline]
    pub fn to_gain(self) -> f64 {
        if self.0 <= -144.0 { 0.0 } else { 10.0_f64.powf(self.0 / 20.0) }
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A small-integer entity identifier, used for sound sources, receivers,
/// directivities and portals (§3). Newtype rather than bare `i32` so the
/// different id spaces cannot be mixed up at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct EntityId(pub i32);

impl EntityId {
    pub const INVALID: Self = Self(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 3D vector used throughout the scene/motion-state/spatial layers. A thin
/// wrapper over `nalgebra::Vector3<f64>` rather than a hand-rolled struct,
/// matching the rest of the workspace's use of `nalgebra` for spatial math.
pub type Vec3 = nalgebra::Vector3<f64>;
/// Unit orientation quaternion.
pub type Orientation = nalgebra::UnitQuaternion<f64>;
</content>
