//! Ties the raw INI parser, include resolution, macro substitution and
//! typed mapping together into the one entry point embedders call (§4.11).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use va_core::{VaError, VaResult};

use crate::ini::{parse, RawConfig, RawSection};
use crate::macros::MacroTable;
use crate::model::{
    AudioDriverConfig, CalibrationConfig, CalibrationMode, DebugConfig, DriverKind, InputConfig, OutputConfig, OutputDeviceConfig, RecordPathConfig, RendererConfig, ReproductionConfig, VaConfig,
};

/// Something that can produce file contents by path — lets tests substitute
/// an in-memory filesystem without touching disk (§4.11 "Configuration
/// files are read-only inputs").
pub trait ConfigSource {
    fn read(&self, path: &Path) -> VaResult<String>;
}

/// Reads real files from disk via `std::fs`.
pub struct FsConfigSource;

impl ConfigSource for FsConfigSource {
    fn read(&self, path: &Path) -> VaResult<String> {
        std::fs::read_to_string(path).map_err(|_| VaError::file_not_found(path.display().to_string(), &[]))
    }
}

/// Load and fully resolve a configuration rooted at `entry_path`: parse,
/// follow `files`/`paths` includes (relative to the including file's
/// directory), merge every parsed document, substitute `$(Name)` macros
/// (§6 `Macros` section) everywhere a path-shaped value appears, then map
/// the merged raw tree onto [`VaConfig`].
pub fn load(source: &dyn ConfigSource, entry_path: &Path) -> VaResult<VaConfig> {
    tracing::info!(entry=%entry_path.display(), "loading configuration");
    let mut merged = RawConfig::default();
    let mut search_paths = Vec::new();
    let mut visited = Vec::new();
    load_recursive(source, entry_path, &mut merged, &mut search_paths, &mut visited)?;

    let macros = macro_table_from(&merged)?;
    let config = to_typed(&merged, &macros, search_paths)?;
    tracing::debug!(
        outputs = config.outputs.len(),
        renderers = config.renderers.len(),
        reproductions = config.reproductions.len(),
        "configuration resolved"
    );
    Ok(config)
}

fn load_recursive(source: &dyn ConfigSource, path: &Path, merged: &mut RawConfig, search_paths: &mut Vec<String>, visited: &mut Vec<PathBuf>) -> VaResult<()> {
    let canonical = path.to_path_buf();
    if visited.contains(&canonical) {
        return Err(VaError::invalid_parameter(format!("circular config include detected at {}", path.display())));
    }
    visited.push(canonical);

    let text = source.read(path)?;
    let raw = parse(&text)?;

    if let Some(paths_section) = raw.section("Paths") {
        for key in paths_section.keys() {
            if let Some(value) = paths_section.get(key) {
                search_paths.push(value.to_string());
            }
        }
    }

    let includes: Vec<String> = raw.section("files").map(|s| s.keys().filter_map(|k| s.get(k)).map(str::to_string).collect()).unwrap_or_default();

    merged.merge(raw)?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    for include in includes {
        let included = parent.join(&include);
        tracing::debug!(from=%path.display(), included=%included.display(), "following config include");
        load_recursive(source, &included, merged, search_paths, visited)?;
    }
    Ok(())
}

fn macro_table_from(raw: &RawConfig) -> VaResult<MacroTable> {
    let mut macros = MacroTable::new();
    if let Some(section) = raw.section("Macros") {
        for key in section.keys() {
            if let Some(value) = section.get(key) {
                macros.set(key, value);
            }
        }
    }
    Ok(macros)
}

fn sub(macros: &MacroTable, value: Option<&str>) -> VaResult<Option<String>> {
    value.map(|v| macros.substitute(v)).transpose()
}

fn parse_csv(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn parse_vec3(section: &RawSection, key: &str, default: [f64; 3]) -> VaResult<[f64; 3]> {
    let Some(raw) = section.get(key) else { return Ok(default) };
    let parts: Vec<f64> = raw
        .split(',')
        .map(|s| s.trim().parse::<f64>().map_err(|_| VaError::invalid_parameter(format!("'{key}' must be three comma-separated numbers, got '{raw}'"))))
        .collect::<VaResult<_>>()?;
    if parts.len() != 3 {
        return Err(VaError::invalid_parameter(format!("'{key}' must be three comma-separated numbers, got '{raw}'")));
    }
    Ok([parts[0], parts[1], parts[2]])
}

fn parse_bool(section: &RawSection, key: &str, default: bool) -> VaResult<bool> {
    match section.get(key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(VaError::invalid_parameter(format!("'{key}' expected a boolean, got '{other}'"))),
        },
    }
}

fn parse_num<T: std::str::FromStr>(section: &RawSection, key: &str, default: T) -> VaResult<T> {
    match section.get(key) {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|_| VaError::invalid_parameter(format!("'{key}' has an invalid numeric value '{v}'"))),
    }
}

fn to_typed(raw: &RawConfig, macros: &MacroTable, search_paths: Vec<String>) -> VaResult<VaConfig> {
    let mut config = VaConfig { paths: search_paths.into_iter().map(|p| macros.substitute(&p)).collect::<VaResult<_>>()?, ..VaConfig::default() };

    if let Some(section) = raw.section("Debug") {
        config.debug = DebugConfig {
            log_level: parse_num(section, "LogLevel", config.debug.log_level)?,
            trigger_update_milliseconds: parse_num(section, "TriggerUpdateMilliseconds", config.debug.trigger_update_milliseconds)?,
        };
    }

    if let Some(section) = raw.section("Audio driver") {
        let driver = match section.get("Driver").unwrap_or("Virtual").to_ascii_lowercase().as_str() {
            "asio" => DriverKind::Asio,
            "portaudio" => DriverKind::PortAudio,
            "virtual" => DriverKind::Virtual,
            "timeout" => DriverKind::Timeout,
            other => return Err(VaError::invalid_parameter(format!("unknown 'Driver' value '{other}'"))),
        };
        config.audio_driver = AudioDriverConfig {
            driver,
            device: sub(macros, section.get("Device"))?,
            sample_rate: parse_sample_rate(section.get("SampleRate"))?,
            buffer_size: parse_buffer_size(section.get("BufferSize"))?,
            input_channels: parse_num(section, "InputChannels", 0)?,
            output_channels: parse_num(section, "OutputChannels", 2)?,
            record_input: RecordPathConfig {
                enabled: parse_bool(section, "RecordInputEnabled", false)?,
                file_name: sub(macros, section.get("RecordInputFileName"))?,
                base_folder: sub(macros, section.get("RecordInputBaseFolder"))?,
            },
            record_output: RecordPathConfig {
                enabled: parse_bool(section, "RecordOutputEnabled", false)?,
                file_name: sub(macros, section.get("RecordOutputFileName"))?,
                base_folder: sub(macros, section.get("RecordOutputBaseFolder"))?,
            },
        };
    }

    if let Some(section) = raw.section("HomogeneousMedium") {
        config.homogeneous_medium = va_core::HomogeneousMedium {
            temperature_celsius: parse_num(section, "Temperature", config.homogeneous_medium.temperature_celsius)?,
            static_pressure_pa: parse_num(section, "StaticPressure", config.homogeneous_medium.static_pressure_pa)?,
            relative_humidity_percent: parse_num(section, "RelativeHumidity", config.homogeneous_medium.relative_humidity_percent)?,
            sound_speed_mps: parse_num(section, "SoundSpeed", config.homogeneous_medium.sound_speed_mps)?,
            shift_velocity: config.homogeneous_medium.shift_velocity,
        };
    }

    if let Some(section) = raw.section("Calibration") {
        let mode = match section.get("DefaultAmplitudeCalibrationMode").unwrap_or("94dB") {
            "94dB" => CalibrationMode::Db94,
            "124dB" => CalibrationMode::Db124,
            other => return Err(VaError::invalid_parameter(format!("unknown 'DefaultAmplitudeCalibrationMode' value '{other}'"))),
        };
        config.calibration = CalibrationConfig {
            default_amplitude_calibration_mode: mode,
            default_distance_m: parse_num(section, "DefaultDistance", config.calibration.default_distance_m)?,
            default_minimum_distance_m: parse_num(section, "DefaultMinimumDistance", config.calibration.default_minimum_distance_m)?,
        };
    }

    for (header, section) in raw.sections_with_base("OutputDevice") {
        let id = section.id.clone().ok_or_else(|| VaError::invalid_parameter(format!("section '{header}' requires an ':<id>' suffix")))?;
        config.output_devices.push(OutputDeviceConfig {
            id,
            device_type: section.get("Type").unwrap_or("Virtual").to_string(),
            channels: section.get("Channels").map(parse_csv).unwrap_or_default().into_iter().map(|s| s.parse::<usize>().map_err(|_| VaError::invalid_parameter(format!("non-numeric channel in '{header}'")))).collect::<VaResult<_>>()?,
            position: parse_vec3(section, "Position", [0.0; 3])?,
            view: parse_vec3(section, "View", [0.0, 0.0, -1.0])?,
            up: parse_vec3(section, "Up", [0.0, 1.0, 0.0])?,
            data_file_name: sub(macros, section.get("DataFileName"))?,
        });
    }

    for (header, section) in raw.sections_with_base("Output") {
        let id = section.id.clone().ok_or_else(|| VaError::invalid_parameter(format!("section '{header}' requires an ':<id>' suffix")))?;
        config.outputs.push(OutputConfig { id, devices: section.get("Devices").map(parse_csv).unwrap_or_default(), description: section.get("Description").map(str::to_string), enabled: parse_bool(section, "Enabled", true)? });
    }

    for (header, section) in raw.sections_with_base("Input") {
        let id = section.id.clone().ok_or_else(|| VaError::invalid_parameter(format!("section '{header}' requires an ':<id>' suffix")))?;
        config.inputs.push(InputConfig { id, devices: section.get("Devices").map(parse_csv).unwrap_or_default(), active: parse_bool(section, "Active", true)? });
    }

    for (header, section) in raw.sections_with_base("Renderer") {
        let id = section.id.clone().ok_or_else(|| VaError::invalid_parameter(format!("section '{header}' requires an ':<id>' suffix")))?;
        let known = ["Class", "Enabled", "Reproductions", "RecordOutputEnabled", "RecordOutputFileName", "RecordOutputBaseFolder"];
        config.renderers.push(RendererConfig {
            id,
            class: section.get("Class").ok_or_else(|| VaError::invalid_parameter(format!("section '{header}' is missing required key 'Class'")))?.to_string(),
            enabled: parse_bool(section, "Enabled", true)?,
            reproductions: section.get("Reproductions").map(parse_csv).unwrap_or_default(),
            record: RecordPathConfig {
                enabled: parse_bool(section, "RecordOutputEnabled", false)?,
                file_name: sub(macros, section.get("RecordOutputFileName"))?,
                base_folder: sub(macros, section.get("RecordOutputBaseFolder"))?,
            },
            extra: extra_keys(section, &known),
        });
    }

    for (header, section) in raw.sections_with_base("Reproduction") {
        let id = section.id.clone().ok_or_else(|| VaError::invalid_parameter(format!("section '{header}' requires an ':<id>' suffix")))?;
        let known = ["Class", "Enabled", "Outputs"];
        config.reproductions.push(ReproductionConfig {
            id,
            class: section.get("Class").ok_or_else(|| VaError::invalid_parameter(format!("section '{header}' is missing required key 'Class'")))?.to_string(),
            enabled: parse_bool(section, "Enabled", true)?,
            outputs: section.get("Outputs").map(parse_csv).unwrap_or_default(),
            extra: extra_keys(section, &known),
        });
    }

    Ok(config)
}

fn extra_keys(section: &RawSection, known: &[&str]) -> BTreeMap<String, String> {
    section.keys().filter(|k| !known.iter().any(|kn| kn.eq_ignore_ascii_case(k))).filter_map(|k| section.get(k).map(|v| (k.to_string(), v.to_string()))).collect()
}

fn parse_sample_rate(value: Option<&str>) -> VaResult<va_core::SampleRate> {
    use va_core::SampleRate::*;
    Ok(match value {
        None => va_core::SampleRate::default(),
        Some("44100") => Hz44100,
        Some("48000") => Hz48000,
        Some("88200") => Hz88200,
        Some("96000") => Hz96000,
        Some("176400") => Hz176400,
        Some("192000") => Hz192000,
        Some(other) => return Err(VaError::invalid_parameter(format!("unsupported sample rate '{other}'"))),
    })
}

fn parse_buffer_size(value: Option<&str>) -> VaResult<va_core::BufferSize> {
    use va_core::BufferSize::*;
    Ok(match value {
        None => va_core::BufferSize::default(),
        Some("64") => Samples64,
        Some("128") => Samples128,
        Some("256") => Samples256,
        Some("512") => Samples512,
        Some("1024") => Samples1024,
        Some(other) => return Err(VaError::invalid_parameter(format!("unsupported buffer size '{other}'"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;

    struct MemorySource(RefCell<StdHashMap<PathBuf, String>>);

    impl ConfigSource for MemorySource {
        fn read(&self, path: &Path) -> VaResult<String> {
            self.0.borrow().get(path).cloned().ok_or_else(|| VaError::file_not_found(path.display().to_string(), &[]))
        }
    }

    fn source(files: &[(&str, &str)]) -> MemorySource {
        MemorySource(RefCell::new(files.iter().map(|(p, c)| (PathBuf::from(p), c.to_string())).collect()))
    }

    #[test]
    fn loads_a_minimal_config() {
        let src = source(&[("va.ini", "[Debug]\nLogLevel=4\n[Audio driver]\nDriver=Virtual\nSampleRate=48000\nBufferSize=128\n")]);
        let config = load(&src, Path::new("va.ini")).unwrap();
        assert_eq!(config.debug.log_level, 4);
        assert_eq!(config.audio_driver.driver, DriverKind::Virtual);
        assert_eq!(config.audio_driver.sample_rate, va_core::SampleRate::Hz48000);
    }

    #[test]
    fn resolves_included_files_relative_to_parent() {
        let src = source(&[
            ("cfg/main.ini", "[files]\nExtra=extra.ini\n[Debug]\nLogLevel=1\n"),
            ("cfg/extra.ini", "[Calibration]\nDefaultDistance=2.5\n"),
        ]);
        let config = load(&src, Path::new("cfg/main.ini")).unwrap();
        assert_eq!(config.debug.log_level, 1);
        assert_eq!(config.calibration.default_distance_m, 2.5);
    }

    #[test]
    fn macro_substitution_applies_to_device_paths() {
        let src = source(&[("va.ini", "[Macros]\nRoot=/opt/va\n[Audio driver]\nDevice=$(Root)/out.wav\n")]);
        let config = load(&src, Path::new("va.ini")).unwrap();
        assert_eq!(config.audio_driver.device.as_deref(), Some("/opt/va/out.wav"));
    }

    #[test]
    fn indexed_sections_populate_vectors() {
        let src = source(&[(
            "va.ini",
            "[OutputDevice:Main]\nType=Virtual\nChannels=0,1\nPosition=0,1.7,0\n[Output:O1]\nDevices=Main\nEnabled=true\n[Renderer:R1]\nClass=BinauralClustering\nReproductions=Rep1\nMaxClusters=42\n",
        )]);
        let config = load(&src, Path::new("va.ini")).unwrap();
        assert_eq!(config.output_devices[0].channels, vec![0, 1]);
        assert_eq!(config.outputs[0].devices, vec!["Main"]);
        let renderer = config.renderer("R1").unwrap();
        assert_eq!(renderer.extra.get("MaxClusters"), Some(&"42".to_string()));
    }

    #[test]
    fn circular_include_is_rejected() {
        let src = source(&[("a.ini", "[files]\nB=b.ini\n"), ("b.ini", "[files]\nA=a.ini\n")]);
        assert!(load(&src, Path::new("a.ini")).is_err());
    }
}
</content>
