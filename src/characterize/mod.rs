use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{MemoryRequest, ProcessKind, ProcessProfile};
use crate::error::CharacterizationError;

pub mod cacti;
pub mod closed_form;

pub use cacti::{
    AttemptError, CactiEngine, CactiSearch, CharacterizationEngine, EngineInput,
    EngineInputBuilder, EngineInputBuilderError, WideningPolicy,
};
pub use closed_form::{ClosedForm, ClosedFormConstants};

/// Input pin capacitance in pF.
pub const CAP_INPUT_PF: f64 = 0.005;
/// Setup time of every input pin in ns.
pub const T_SETUP_NS: f64 = 0.050;
/// Hold time of every input pin in ns.
pub const T_HOLD_NS: f64 = 0.050;

/// Figures reported by one characterization run, before any snapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCharacterization {
    pub tech_node_nm: u32,
    pub associativity: usize,
    pub access_time_ns: f64,
    pub cycle_time_ns: f64,
    pub dynamic_read_energy_nj: f64,
    pub dynamic_write_energy_nj: f64,
    /// Standby leakage of the whole macro.
    pub leakage_mw: f64,
    pub fo4_ps: f64,
    pub width_um: f64,
    pub height_um: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterizationResult {
    pub tech_node_nm: u32,
    pub associativity: usize,
    pub access_time_ns: f64,
    pub cycle_time_ns: f64,
    pub dynamic_read_energy_nj: f64,
    pub dynamic_write_energy_nj: f64,
    pub leakage_mw: f64,
    pub fo4_ps: f64,

    /// Macro width before snapping.
    pub width_um: f64,
    /// Macro height before snapping.
    pub height_um: f64,
    pub snapped_width_nm: i64,
    pub snapped_height_nm: i64,

    /// Word width actually given to the characterization engine.
    /// Equal to the requested width unless the engine needed widening.
    pub fed_width_bits: usize,

    pub cap_input_pf: f64,
    pub t_setup_ns: f64,
    pub t_hold_ns: f64,
    pub pin_dynamic_power_mw: f64,
}

impl CharacterizationResult {
    pub fn new(process: &ProcessProfile, raw: RawCharacterization, fed_width_bits: usize) -> Self {
        Self {
            snapped_width_nm: snap_up(raw.width_um, process.snap_width_nm),
            snapped_height_nm: snap_up(raw.height_um, process.snap_height_nm),
            tech_node_nm: raw.tech_node_nm,
            associativity: raw.associativity,
            access_time_ns: raw.access_time_ns,
            cycle_time_ns: raw.cycle_time_ns,
            dynamic_read_energy_nj: raw.dynamic_read_energy_nj,
            dynamic_write_energy_nj: raw.dynamic_write_energy_nj,
            leakage_mw: raw.leakage_mw,
            fo4_ps: raw.fo4_ps,
            width_um: raw.width_um,
            height_um: raw.height_um,
            fed_width_bits,
            cap_input_pf: CAP_INPUT_PF,
            t_setup_ns: T_SETUP_NS,
            t_hold_ns: T_HOLD_NS,
            pin_dynamic_power_mw: raw.dynamic_write_energy_nj,
        }
    }

    #[inline]
    pub fn tech_node_um(&self) -> f64 {
        self.tech_node_nm as f64 / 1000.0
    }

    #[inline]
    pub fn snapped_width_um(&self) -> f64 {
        self.snapped_width_nm as f64 / 1000.0
    }

    #[inline]
    pub fn snapped_height_um(&self) -> f64 {
        self.snapped_height_nm as f64 / 1000.0
    }

    #[inline]
    pub fn area_um2(&self) -> f64 {
        self.snapped_width_um() * self.snapped_height_um()
    }
}

/// Rounds a length in microns up to the next multiple of `grid_nm`,
/// returning the result in nanometers.
pub fn snap_up(length_um: f64, grid_nm: i64) -> i64 {
    let grid_nm = grid_nm.max(1);
    let units = length_um * 1000.0 / grid_nm as f64;
    // Absorb float noise so that exact multiples stay put.
    let units = (units * 1e6).round() / 1e6;
    units.ceil() as i64 * grid_nm
}

pub trait Characterizer {
    fn characterize(
        &self,
        process: &ProcessProfile,
        request: &MemoryRequest,
    ) -> Result<CharacterizationResult, CharacterizationError>;
}

/// Characterizes `request` using the strategy selected by the process kind.
///
/// `engine` is only invoked for processes without closed-form formulas, in
/// which case its files are written to `work_dir`.
pub fn characterize<E>(
    process: &ProcessProfile,
    request: &MemoryRequest,
    engine: &E,
    work_dir: &Path,
) -> Result<CharacterizationResult, CharacterizationError>
where
    E: CharacterizationEngine + ?Sized,
{
    match process.kind {
        ProcessKind::FinFet(geometry) => {
            ClosedForm::new(geometry, ClosedFormConstants::default())
                .characterize(process, request)
        }
        ProcessKind::Engine => {
            CactiSearch::new(engine, WideningPolicy::default(), work_dir)
                .characterize(process, request)
        }
    }
}
