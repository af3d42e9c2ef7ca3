//! Global (unversioned) state (§5, §6 "global"): input/output mute and
//! gain, the global auralization mode, the homogeneous medium, and the
//! core clock. Unlike scene state this is not copy-on-write — it is read
//! fresh by the core thread every tick rather than published through the
//! scene generation counter (§4.9 step 3 "the mask is not versioned").

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;

use va_core::{AuralizationMode, HomogeneousMedium};
use va_rt::GlobalAuralizationModeSource;

/// Bit pattern stashed in an `AtomicU64` to carry an `f64` gain without a
/// lock; gain changes are not on the audio thread's hot path but still
/// avoid blocking a control thread that reads them concurrently.
fn load_f64(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Acquire))
}

fn store_f64(cell: &AtomicU64, value: f64) {
    cell.store(value.to_bits(), Ordering::Release);
}

pub struct GlobalState {
    input_muted: AtomicBool,
    output_muted: AtomicBool,
    input_gain: AtomicU64,
    output_gain: AtomicU64,
    auralization_mode: AtomicU32,
    medium: RwLock<HomogeneousMedium>,
    core_clock: AtomicU64,
}

impl GlobalState {
    pub fn new(medium: HomogeneousMedium) -> Self {
        Self {
            input_muted: AtomicBool::new(false),
            output_muted: AtomicBool::new(false),
            input_gain: AtomicU64::new(1.0_f64.to_bits()),
            output_gain: AtomicU64::new(1.0_f64.to_bits()),
            auralization_mode: AtomicU32::new(AuralizationMode::ALL.0),
            medium: RwLock::new(medium),
            core_clock: AtomicU64::new(0),
        }
    }

    pub fn input_muted(&self) -> bool {
        self.input_muted.load(Ordering::Acquire)
    }

    pub fn set_input_muted(&self, muted: bool) {
        self.input_muted.store(muted, Ordering::Release);
    }

    pub fn output_muted(&self) -> bool {
        self.output_muted.load(Ordering::Acquire)
    }

    pub fn set_output_muted(&self, muted: bool) {
        self.output_muted.store(muted, Ordering::Release);
    }

    pub fn input_gain(&self) -> f64 {
        load_f64(&self.input_gain)
    }

    pub fn set_input_gain(&self, gain: f64) {
        store_f64(&self.input_gain, gain);
    }

    pub fn output_gain(&self) -> f64 {
        load_f64(&self.output_gain)
    }

    pub fn set_output_gain(&self, gain: f64) {
        store_f64(&self.output_gain, gain);
    }

    pub fn auralization_mode(&self) -> AuralizationMode {
        AuralizationMode(self.auralization_mode.load(Ordering::Acquire))
    }

    pub fn set_auralization_mode(&self, mode: AuralizationMode) {
        self.auralization_mode.store(mode.0, Ordering::Release);
    }

    pub fn homogeneous_medium(&self) -> HomogeneousMedium {
        *self.medium.read()
    }

    pub fn set_homogeneous_medium(&self, medium: HomogeneousMedium) {
        *self.medium.write() = medium;
    }

    /// Advanced once per audio block by the driver callback (§6 "core
    /// clock").
    pub fn advance_core_clock(&self) -> u64 {
        self.core_clock.fetch_add(1, Ordering::AcqRel)
    }

    pub fn core_clock(&self) -> u64 {
        self.core_clock.load(Ordering::Acquire)
    }
}

impl GlobalAuralizationModeSource for GlobalState {
    fn current(&self) -> AuralizationMode {
        self.auralization_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_round_trips_through_atomic_bit_storage() {
        let state = GlobalState::new(HomogeneousMedium::default());
        state.set_output_gain(0.25);
        assert_eq!(state.output_gain(), 0.25);
    }

    #[test]
    fn auralization_mode_round_trips() {
        let state = GlobalState::new(HomogeneousMedium::default());
        state.set_auralization_mode(AuralizationMode::NONE);
        assert_eq!(state.current(), AuralizationMode::NONE);
    }
}
</content>
