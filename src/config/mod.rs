pub mod path;


use std::{io, path::Path, time::Duration};

use glob_match::glob_match;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, INPUT_PATH, MAX_POLL_INTERVAL_MS};

/// Represents all possible errors loading a [Config]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Top-level daemon configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    pub version: u32,
    pub kind: String,
    pub name: String,
    pub source: SourceConfig,
    pub control_surface: ControlSurfaceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            kind: "TabletPressureConfig".to_string(),
            name: "default".to_string(),
            source: SourceConfig::default(),
            control_surface: ControlSurfaceConfig::default(),
        }
    }
}

impl Config {
    /// Load a [Config] from the given YAML string
    pub fn from_yaml(content: String) -> Result<Config, LoadError> {
        let config: Config = serde_yaml::from_str(content.as_str())?;
        Ok(config)
    }

    /// Load a [Config] from the given YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Config, LoadError> {
        let file = std::fs::File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    /// Load the configuration. An explicitly given path must be readable.
    /// Otherwise the first config file found in the search paths is used, or
    /// the defaults if there is none.
    pub fn load(path: Option<&Path>) -> Result<Config, LoadError> {
        if let Some(path) = path {
            log::debug!("Loading config from {path:?}");
            return Config::from_yaml_file(path);
        }

        for path in path::get_config_paths() {
            if !path.is_file() {
                log::trace!("No config at {path:?}");
                continue;
            }
            log::debug!("Loading config from {path:?}");
            return Config::from_yaml_file(&path);
        }

        log::debug!("No config file found. Using defaults.");
        Ok(Config::default())
    }
}

/// Configuration of the tablet input session
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct SourceConfig {
    /// Directory containing the evdev device nodes
    pub devices_path: String,
    /// Longest time the input thread waits for events before checking
    /// whether it should stop
    pub poll_interval_ms: u64,
    /// Take exclusive access of opened tablets
    pub grab: bool,
    /// Glob patterns matched against the device name. A tablet is used if any
    /// pattern matches.
    pub name_filters: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            devices_path: INPUT_PATH.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            grab: false,
            name_filters: vec!["*".to_string()],
        }
    }
}

impl SourceConfig {
    /// Returns the input loop wait, between 1 ms and [MAX_POLL_INTERVAL_MS] ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(1, MAX_POLL_INTERVAL_MS))
    }

    /// Returns true if a device with the given name passes the name filters
    pub fn matches_name(&self, name: &str) -> bool {
        self.name_filters.iter().any(|filter| {
            log::trace!("Checking name filter: {filter} against {name}");
            glob_match(filter.as_str(), name)
        })
    }
}

/// Configuration of the MIDI control surface
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct ControlSurfaceConfig {
    /// Raw MIDI device to write to (e.g. /dev/snd/midiC1D0). Messages are
    /// discarded if unset.
    pub midi_output: Option<String>,
    pub midi_channel: u8,
    /// Pitch at the left edge of the tablet
    pub lowest_pitch: f32,
    /// Pitch at the right edge of the tablet
    pub highest_pitch: f32,
    /// Pitch bend range of the receiving synthesizer in semitones
    pub pitch_bend_half_range: f32,
    /// How often aftertouch and pitch bend are sent while the pen is down
    pub update_rate_hz: u32,
}

impl Default for ControlSurfaceConfig {
    fn default() -> Self {
        Self {
            midi_output: None,
            midi_channel: 0,
            lowest_pitch: 48.0,
            highest_pitch: 72.0,
            pitch_bend_half_range: 12.0,
            update_rate_hz: 100,
        }
    }
}

impl ControlSurfaceConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.update_rate_hz.max(1) as f64)
    }
}
