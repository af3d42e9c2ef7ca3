//! Time-related types shared by the scene, signal-source and core-thread layers.

use serde::{Deserialize, Serialize};

/// Sample position in a signal source's own timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SamplePosition(pub u64);

impl SamplePosition {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn from_seconds(seconds: f64, sample_rate: f64) -> Self {
        Self((seconds * sample_rate).max(0.0) as u64)
    }

    #[inline]
    pub fn to_seconds(self, sample_rate: f64) -> f64 {
        self.0 as f64 / sample_rate
    }

    #[inline]
    pub fn advance(&mut self, samples: u64) {
        self.0 += samples;
    }
}

impl std::ops::Add<u64> for SamplePosition {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::Sub for SamplePosition {
    type Output = u64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

/// A duration expressed in samples at some (implicit) sample rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleDuration(pub u64);

impl SampleDuration {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn from_seconds(seconds: f64, sample_rate: f64) -> Self {
        Self((seconds * sample_rate).max(0.0) as u64)
    }

    #[inline]
    pub fn from_ms(ms: f64, sample_rate: f64) -> Self {
        Self::from_seconds(ms / 1000.0, sample_rate)
    }

    #[inline]
    pub fn to_seconds(self, sample_rate: f64) -> f64 {
        self.0 as f64 / sample_rate
    }

    #[inline]
    pub fn to_ms(self, sample_rate: f64) -> f64 {
        self.to_seconds(sample_rate) * 1000.0
    }
}

/// The core's monotonic "wall clock", advanced once per audio block by the
/// audio thread and readable by any control thread. Used for diagnostics and
/// the `global/core clock` API surface (§6).
#[derive(Debug, Default)]
pub struct CoreClock {
    blocks: std::sync::atomic::AtomicU64,
}

impl CoreClock {
    pub fn new() -> Self {
        Self { blocks: std::sync::atomic::AtomicU64::new(0) }
    }

    #[inline]
    pub fn advance_block(&self) {
        self.blocks.fetch_add(1, std::sync::atomic::Ordering::Release);
    }

    #[inline]
    pub fn blocks_elapsed(&self) -> u64 {
        self.blocks.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn seconds_elapsed(&self, block_size: usize, sample_rate: f64) -> f64 {
        (self.blocks_elapsed() * block_size as u64) as f64 / sample_rate
    }
}
</content>
