use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::Result;

pub mod memory;
pub mod process;

pub use memory::{BankingTechnique, MemoryRequest, Port, PortCounts, PortKind, WriteMode};
pub use process::{FinFetGeometry, PinGeometry, ProcessKind, ProcessProfile, SupplyGeometry};

/// A value that may be spelled either as a JSON/TOML scalar or as a string,
/// e.g. `"flipPins": "true"` and `"flipPins": true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loose<T> {
    Value(T),
    Text(String),
}

impl<T: std::str::FromStr> Loose<T> {
    pub(crate) fn resolve(&self, field: &'static str, context: &str) -> Result<T, ConfigError>
    where
        T: Clone,
    {
        match self {
            Loose::Value(v) => Ok(v.clone()),
            Loose::Text(s) => s
                .trim()
                .to_lowercase()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    field,
                    context: context.to_string(),
                    reason: format!("could not parse `{s}`"),
                }),
        }
    }
}

/// Process section of the configuration file, using the generator's
/// historical key names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProcess {
    pub tech_nm: Option<u32>,
    #[serde(rename = "metalPrefix")]
    pub metal_prefix: Option<String>,
    pub voltage: Option<Loose<f64>>,

    #[serde(rename = "pinWidth_nm")]
    pub pin_width_nm: Option<i64>,
    #[serde(rename = "pinHeight_nm")]
    pub pin_height_nm: Option<i64>,
    #[serde(rename = "pinPitch_nm")]
    pub pin_pitch_nm: Option<i64>,

    #[serde(rename = "lrPinWidth_nm")]
    pub lr_pin_width_nm: Option<i64>,
    #[serde(rename = "lrPinHeight_nm")]
    pub lr_pin_height_nm: Option<i64>,
    #[serde(rename = "lrPinPitch_nm")]
    pub lr_pin_pitch_nm: Option<i64>,
    #[serde(rename = "tbPinWidth_nm")]
    pub tb_pin_width_nm: Option<i64>,
    #[serde(rename = "tbPinHeight_nm")]
    pub tb_pin_height_nm: Option<i64>,
    #[serde(rename = "tbPinPitch_nm")]
    pub tb_pin_pitch_nm: Option<i64>,

    #[serde(rename = "supplyPinWidth_nm")]
    pub supply_pin_width_nm: Option<i64>,
    #[serde(rename = "supplyPinPitch_nm")]
    pub supply_pin_pitch_nm: Option<i64>,

    #[serde(rename = "snapWidth_nm")]
    pub snap_width_nm: Option<i64>,
    #[serde(rename = "snapHeight_nm")]
    pub snap_height_nm: Option<i64>,
    #[serde(rename = "flipPins")]
    pub flip_pins: Option<Loose<bool>>,

    pub fin_pitch_nm: Option<i64>,
    pub metal_track_pitch_nm: Option<i64>,
    pub contacted_poly_pitch_nm: Option<i64>,
    pub column_mux_factor: Option<usize>,
}

/// One entry of the `sram` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMemory {
    pub name: String,
    pub width: usize,
    pub depth: usize,
    #[serde(default)]
    pub banks: Option<usize>,
    #[serde(rename = "type", default)]
    pub cache_type: Option<String>,
    #[serde(default)]
    pub ports: Option<String>,
    #[serde(default)]
    pub rw_ports: Option<usize>,
    #[serde(default)]
    pub r_ports: Option<usize>,
    #[serde(default)]
    pub w_ports: Option<usize>,
    #[serde(default)]
    pub write_granularity: Option<usize>,
    #[serde(default)]
    pub write_mode: Option<String>,
    #[serde(default)]
    pub write_mask: Option<Loose<bool>>,
    #[serde(default)]
    pub banking_technique: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(flatten)]
    pub process: RawProcess,
    #[serde(default)]
    pub sram: Vec<RawMemory>,
}

/// One `sram` entry after validation.
///
/// An entry that fails validation keeps its error so the remaining
/// memories of the configuration can still be generated.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub name: String,
    pub request: Result<MemoryRequest, ConfigError>,
}

/// A configuration with a validated process profile.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeramConfig {
    pub process: ProcessProfile,
    pub memories: Vec<MemoryEntry>,
}

impl FakeramConfig {
    /// Fails only if the process profile is invalid.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let process = ProcessProfile::from_raw(&raw.process)?;
        let memories = raw
            .sram
            .iter()
            .map(|memory| MemoryEntry {
                name: memory.name.clone(),
                request: MemoryRequest::from_raw(memory),
            })
            .collect();
        Ok(Self { process, memories })
    }

    /// Memories that passed validation, in configuration order.
    pub fn requests(&self) -> impl Iterator<Item = &MemoryRequest> {
        self.memories
            .iter()
            .filter_map(|entry| entry.request.as_ref().ok())
    }
}

pub fn parse_raw_config(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Error reading configuration file {path:?}"))?;
    let data = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)?,
        _ => serde_json::from_str(&contents)?,
    };
    Ok(data)
}

pub fn parse_config(path: impl AsRef<Path>) -> Result<FakeramConfig> {
    let raw = parse_raw_config(path)?;
    Ok(FakeramConfig::from_raw(raw)?)
}
