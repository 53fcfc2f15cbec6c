use serde::{Deserialize, Serialize};

use super::RawProcess;
use crate::error::ConfigError;

/// Technology node whose macros are sized by closed-form formulas instead of
/// by running the characterization engine.
pub const FIXED_PROCESS_NM: u32 = 7;

/// Technology node whose tools expect an additional `OVERLAP` obstruction.
pub const LEGACY_OVERLAP_NM: u32 = 45;

/// Width, height, and minimum pitch of the signal pins on one pair of edges.
///
/// All values are in nanometers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PinGeometry {
    /// Extent of the pin along the edge.
    pub width_nm: i64,
    /// Depth of the pin into the macro, measured from the edge.
    pub height_nm: i64,
    pub pitch_nm: i64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SupplyGeometry {
    pub width_nm: i64,
    pub pitch_nm: i64,
}

/// Geometric constants of the fixed FinFET process.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FinFetGeometry {
    pub fin_pitch_nm: i64,
    pub metal_track_pitch_nm: i64,
    pub contacted_poly_pitch_nm: i64,
    pub column_mux_factor: usize,
}

/// Selects how macros in this process are characterized.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    /// Dimensions and timing come from closed-form formulas.
    FinFet(FinFetGeometry),
    /// Dimensions and timing come from the external characterization engine.
    Engine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessProfile {
    pub tech_nm: u32,
    pub kind: ProcessKind,
    pub metal_prefix: String,
    pub voltage: f64,
    /// Pins on the left and right edges.
    pub lr_pins: PinGeometry,
    /// Pins on the top and bottom edges.
    pub tb_pins: PinGeometry,
    pub supply: SupplyGeometry,
    pub snap_width_nm: i64,
    pub snap_height_nm: i64,
    pub flip_pins: bool,
}

const CONTEXT: &str = "process configuration";

fn required<T: Copy>(value: Option<T>, field: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingField {
        field,
        context: CONTEXT.to_string(),
    })
}

fn positive(value: i64, field: &'static str) -> Result<i64, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            context: CONTEXT.to_string(),
            reason: format!("expected a positive value, got {value}"),
        })
    }
}

impl ProcessProfile {
    pub fn from_raw(raw: &RawProcess) -> Result<Self, ConfigError> {
        let tech_nm = required(raw.tech_nm, "tech_nm")?;
        let metal_prefix = raw
            .metal_prefix
            .clone()
            .ok_or(ConfigError::MissingField {
                field: "metalPrefix",
                context: CONTEXT.to_string(),
            })?;
        let voltage = raw
            .voltage
            .as_ref()
            .ok_or(ConfigError::MissingField {
                field: "voltage",
                context: CONTEXT.to_string(),
            })?
            .resolve("voltage", CONTEXT)?;

        let lr_pins = edge_pins(
            raw,
            raw.lr_pin_width_nm,
            raw.lr_pin_height_nm,
            raw.lr_pin_pitch_nm,
        )?;
        let tb_pins = edge_pins(
            raw,
            raw.tb_pin_width_nm,
            raw.tb_pin_height_nm,
            raw.tb_pin_pitch_nm,
        )?;
        let supply = SupplyGeometry {
            width_nm: positive(
                raw.supply_pin_width_nm.unwrap_or(lr_pins.width_nm),
                "supplyPinWidth_nm",
            )?,
            pitch_nm: positive(
                raw.supply_pin_pitch_nm.unwrap_or(lr_pins.pitch_nm),
                "supplyPinPitch_nm",
            )?,
        };

        let flip_pins = match &raw.flip_pins {
            Some(v) => v.resolve("flipPins", CONTEXT)?,
            None => false,
        };

        let kind = if tech_nm == FIXED_PROCESS_NM {
            ProcessKind::FinFet(FinFetGeometry {
                fin_pitch_nm: positive(
                    required(raw.fin_pitch_nm, "fin_pitch_nm")?,
                    "fin_pitch_nm",
                )?,
                metal_track_pitch_nm: positive(
                    required(raw.metal_track_pitch_nm, "metal_track_pitch_nm")?,
                    "metal_track_pitch_nm",
                )?,
                contacted_poly_pitch_nm: positive(
                    required(raw.contacted_poly_pitch_nm, "contacted_poly_pitch_nm")?,
                    "contacted_poly_pitch_nm",
                )?,
                column_mux_factor: match required(raw.column_mux_factor, "column_mux_factor")? {
                    0 => {
                        return Err(ConfigError::InvalidValue {
                            field: "column_mux_factor",
                            context: CONTEXT.to_string(),
                            reason: "must be at least 1".to_string(),
                        })
                    }
                    n => n,
                },
            })
        } else {
            ProcessKind::Engine
        };

        Ok(Self {
            tech_nm,
            kind,
            metal_prefix,
            voltage,
            lr_pins,
            tb_pins,
            supply,
            snap_width_nm: positive(raw.snap_width_nm.unwrap_or(1), "snapWidth_nm")?,
            snap_height_nm: positive(raw.snap_height_nm.unwrap_or(1), "snapHeight_nm")?,
            flip_pins,
        })
    }

    #[inline]
    pub fn tech_um(&self) -> f64 {
        self.tech_nm as f64 / 1000.0
    }

    /// Name of the metal layer with the given index, e.g. `metal(3) == "M3"`
    /// for a prefix of `"M"`.
    pub fn metal(&self, index: usize) -> String {
        format!("{}{}", self.metal_prefix, index)
    }

    #[inline]
    pub fn needs_overlap_obstruction(&self) -> bool {
        self.tech_nm == LEGACY_OVERLAP_NM
    }
}

/// Per-edge values win over the shared `pin*_nm` keys.
/// Pin height defaults to the pin width, giving square pins.
fn edge_pins(
    raw: &RawProcess,
    width: Option<i64>,
    height: Option<i64>,
    pitch: Option<i64>,
) -> Result<PinGeometry, ConfigError> {
    let width_nm = required(width.or(raw.pin_width_nm), "pinWidth_nm")?;
    let height_nm = height.or(raw.pin_height_nm).unwrap_or(width_nm);
    let pitch_nm = required(pitch.or(raw.pin_pitch_nm), "pinPitch_nm")?;
    Ok(PinGeometry {
        width_nm: positive(width_nm, "pinWidth_nm")?,
        height_nm: positive(height_nm, "pinHeight_nm")?,
        pitch_nm: positive(pitch_nm, "pinPitch_nm")?,
    })
}
