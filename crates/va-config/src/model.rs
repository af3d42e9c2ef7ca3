//! The typed configuration tree (§4.11, §6) a [`crate::loader::load`] call
//! produces. Every section in the table in §6 has a struct here; unknown
//! keys within a recognized section are preserved in `extra` rather than
//! rejected, since `Renderer:<id>`/`Reproduction:<id>` sections carry
//! class-specific keys this crate has no business validating.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use va_core::{BufferSize, SampleRate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    pub log_level: u8,
    pub trigger_update_milliseconds: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { log_level: 2, trigger_update_milliseconds: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverKind {
    Asio,
    PortAudio,
    Virtual,
    Timeout,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPathConfig {
    pub enabled: bool,
    pub file_name: Option<String>,
    pub base_folder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDriverConfig {
    pub driver: DriverKind,
    pub device: Option<String>,
    pub sample_rate: SampleRate,
    pub buffer_size: BufferSize,
    pub input_channels: u16,
    pub output_channels: u16,
    pub record_input: RecordPathConfig,
    pub record_output: RecordPathConfig,
}

impl Default for AudioDriverConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Virtual,
            device: None,
            sample_rate: SampleRate::default(),
            buffer_size: BufferSize::default(),
            input_channels: 0,
            output_channels: 2,
            record_input: RecordPathConfig::default(),
            record_output: RecordPathConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationMode {
    Db94,
    Db124,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub default_amplitude_calibration_mode: CalibrationMode,
    pub default_distance_m: f64,
    pub default_minimum_distance_m: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { default_amplitude_calibration_mode: CalibrationMode::Db94, default_distance_m: 1.0, default_minimum_distance_m: 0.25 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDeviceConfig {
    pub id: String,
    pub device_type: String,
    pub channels: Vec<usize>,
    pub position: [f64; 3],
    pub view: [f64; 3],
    pub up: [f64; 3],
    pub data_file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub id: String,
    pub devices: Vec<String>,
    pub description: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub id: String,
    pub devices: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    pub id: String,
    pub class: String,
    pub enabled: bool,
    pub reproductions: Vec<String>,
    pub record: RecordPathConfig,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproductionConfig {
    pub id: String,
    pub class: String,
    pub enabled: bool,
    pub outputs: Vec<String>,
    pub extra: BTreeMap<String, String>,
}

/// The full, merged, macro-substituted configuration tree (§4.11).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaConfig {
    pub debug: DebugConfig,
    pub audio_driver: AudioDriverConfig,
    pub paths: Vec<String>,
    pub homogeneous_medium: va_core::HomogeneousMedium,
    pub calibration: CalibrationConfig,
    pub output_devices: Vec<OutputDeviceConfig>,
    pub outputs: Vec<OutputConfig>,
    pub inputs: Vec<InputConfig>,
    pub renderers: Vec<RendererConfig>,
    pub reproductions: Vec<ReproductionConfig>,
}

impl VaConfig {
    pub fn output_device(&self, id: &str) -> Option<&OutputDeviceConfig> {
        self.output_devices.iter().find(|d| d.id == id)
    }

    pub fn renderer(&self, id: &str) -> Option<&RendererConfig> {
        self.renderers.iter().find(|r| r.id == id)
    }

    pub fn reproduction(&self, id: &str) -> Option<&ReproductionConfig> {
        self.reproductions.iter().find(|r| r.id == id)
    }
}
</content>
