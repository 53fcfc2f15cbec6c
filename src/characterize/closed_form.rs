use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{CharacterizationResult, Characterizer, RawCharacterization};
use crate::config::{FinFetGeometry, MemoryRequest, ProcessProfile};
use crate::div_ceil;
use crate::error::CharacterizationError;

/// Coefficients of the closed-form macro model.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedFormConstants {
    /// Bitcell width, in contacted poly pitches.
    pub bitcell_width_cpp: i64,
    /// Bitcell height, in fin pitches.
    pub bitcell_height_fins: i64,
    /// Metal tracks reserved on each side of the array for periphery.
    pub periphery_tracks: i64,
    /// Area growth per additional writable port.
    pub write_port_factor: f64,
    /// Area growth per read-only port.
    pub read_port_factor: f64,
    pub wmask_factor: f64,

    pub access_time_ns: f64,
    pub cycle_time_ns: f64,
    pub dynamic_read_energy_nj: f64,
    pub dynamic_write_energy_nj: f64,
    pub leakage_mw: f64,
    pub fo4_ps: f64,
}

impl Default for ClosedFormConstants {
    fn default() -> Self {
        Self {
            bitcell_width_cpp: 2,
            bitcell_height_fins: 10,
            periphery_tracks: 8,
            write_port_factor: 0.5,
            read_port_factor: 0.25,
            wmask_factor: 0.1,
            access_time_ns: 0.2183,
            cycle_time_ns: 0.1566,
            dynamic_read_energy_nj: 0.00108,
            dynamic_write_energy_nj: 0.00134,
            leakage_mw: 0.1289,
            fo4_ps: 9.0632,
        }
    }
}

/// Sizes macros directly from the FinFET process geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClosedForm {
    geometry: FinFetGeometry,
    constants: ClosedFormConstants,
}

impl ClosedForm {
    pub fn new(geometry: FinFetGeometry, constants: ClosedFormConstants) -> Self {
        Self {
            geometry,
            constants,
        }
    }

    /// Scale factor applied to both macro dimensions to account for extra
    /// ports and the write mask.
    pub fn port_multiplier(&self, request: &MemoryRequest) -> f64 {
        let c = &self.constants;
        let ports = &request.ports;
        let mask = if request.has_wmask { c.wmask_factor } else { 0.0 };
        if ports.total() > 1 {
            let extra_writers = (ports.rw + ports.w).saturating_sub(1) as f64;
            1.0 + c.write_port_factor * extra_writers + c.read_port_factor * ports.r as f64 + mask
        } else {
            1.0 + mask
        }
    }

    /// Returns the unsnapped macro `(width, height)` in microns.
    pub fn dimensions_um(&self, request: &MemoryRequest) -> (f64, f64) {
        let g = &self.geometry;
        let c = &self.constants;

        let bitcell_width_nm = c.bitcell_width_cpp * g.contacted_poly_pitch_nm;
        let bitcell_height_nm = c.bitcell_height_fins * g.fin_pitch_nm;
        let rows = div_ceil(request.depth, g.column_mux_factor) as i64;
        let cols = (request.width_bits * g.column_mux_factor) as i64;
        let periphery_nm = 2 * c.periphery_tracks * g.metal_track_pitch_nm;

        let width_nm = cols * bitcell_width_nm + periphery_nm;
        let height_nm = rows * bitcell_height_nm + periphery_nm;
        debug!(
            "{}: {rows} rows x {cols} columns, array with periphery {width_nm} x {height_nm} nm",
            request.name
        );

        let mult = self.port_multiplier(request);
        (
            width_nm as f64 / 1000.0 * mult,
            height_nm as f64 / 1000.0 * mult,
        )
    }
}

impl Characterizer for ClosedForm {
    fn characterize(
        &self,
        process: &ProcessProfile,
        request: &MemoryRequest,
    ) -> Result<CharacterizationResult, CharacterizationError> {
        info!("Sizing {} with the closed-form model", request.name);
        let (width_um, height_um) = self.dimensions_um(request);
        let c = &self.constants;
        let raw = RawCharacterization {
            tech_node_nm: process.tech_nm,
            associativity: 1,
            access_time_ns: c.access_time_ns,
            cycle_time_ns: c.cycle_time_ns,
            dynamic_read_energy_nj: c.dynamic_read_energy_nj,
            dynamic_write_energy_nj: c.dynamic_write_energy_nj,
            leakage_mw: c.leakage_mw,
            fo4_ps: c.fo4_ps,
            width_um,
            height_um,
        };
        Ok(CharacterizationResult::new(
            process,
            raw,
            request.width_bits,
        ))
    }
}
