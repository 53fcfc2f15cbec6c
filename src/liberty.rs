use std::path::Path;

use serde::{Deserialize, Serialize};
use tera::Context;

use crate::characterize::CharacterizationResult;
use crate::config::{MemoryRequest, ProcessProfile, WriteMode};
use crate::{Result, TEMPLATES};

/// Clock pins load the driver this many times more than other inputs.
const CLK_CAP_FACTOR: f64 = 5.0;
/// The asynchronous read path of a write-through macro is this fraction of clock-to-q.
const COMBINATIONAL_DELAY_FACTOR: f64 = 0.7;
const MIN_SLEW_FO4: f64 = 1.0;
const MAX_SLEW_FO4: f64 = 25.0;
const MAX_LOAD_FACTOR: f64 = 100.0;

/// Cell-wide values, already formatted the way they appear in the library.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LibertyCell {
    pub name: String,
    pub voltage: String,
    pub area: String,
    pub addr_width: usize,
    pub word_width: usize,
    pub wmask_width: usize,
    pub has_wmask: bool,
    pub write_through: bool,

    pub cap_input: String,
    pub clk_cap: String,
    pub max_load: String,
    pub min_period: String,
    pub min_slew: String,
    pub max_slew: String,
    pub slew_indices: String,
    pub load_indices: String,

    pub t_setup: String,
    pub t_hold: String,
    pub tcq: String,
    pub tcq_comb: String,

    pub clk_power: String,
    pub pin_power: String,
    pub leakage: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LibertyPort {
    pub name: String,
    pub can_read: bool,
    pub can_write: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LibertyParams {
    pub cell: LibertyCell,
    pub ports: Vec<LibertyPort>,
}

fn fmt3(value: f64) -> String {
    format!("{value:.3}")
}

impl LibertyParams {
    pub fn new(
        process: &ProcessProfile,
        request: &MemoryRequest,
        result: &CharacterizationResult,
    ) -> Self {
        let fo4_ns = result.fo4_ps / 1e3;
        let min_slew = MIN_SLEW_FO4 * fo4_ns;
        let max_slew = MAX_SLEW_FO4 * fo4_ns;
        let min_load = result.cap_input_pf;
        let max_load = MAX_LOAD_FACTOR * result.cap_input_pf;

        let cell = LibertyCell {
            name: request.name.clone(),
            voltage: process.voltage.to_string(),
            area: fmt3(result.area_um2()),
            addr_width: request.addr_width(),
            word_width: request.width_bits,
            wmask_width: request.wmask_width(),
            has_wmask: request.has_wmask,
            write_through: request.write_mode == WriteMode::WriteThrough,

            cap_input: fmt3(result.cap_input_pf),
            clk_cap: fmt3(result.cap_input_pf * CLK_CAP_FACTOR),
            max_load: fmt3(max_load),
            min_period: fmt3(result.cycle_time_ns),
            min_slew: fmt3(min_slew),
            max_slew: fmt3(max_slew),
            slew_indices: format!("{min_slew:.3}, {max_slew:.3}"),
            load_indices: format!("{min_load:.3}, {max_load:.3}"),

            t_setup: fmt3(result.t_setup_ns),
            t_hold: fmt3(result.t_hold_ns),
            tcq: fmt3(result.access_time_ns),
            tcq_comb: fmt3(result.access_time_ns * COMBINATIONAL_DELAY_FACTOR),

            // mW to uW, and the per-pin share of a clock event
            clk_power: fmt3(result.pin_dynamic_power_mw * 1e3),
            pin_power: fmt3(result.pin_dynamic_power_mw * 1e1),
            leakage: fmt3(result.leakage_mw * 1e3),
        };

        let ports = request
            .ports
            .all_ports()
            .into_iter()
            .map(|port| LibertyPort {
                name: port.to_string(),
                can_read: port.kind.can_read(),
                can_write: port.kind.can_write(),
            })
            .collect();

        Self { cell, ports }
    }
}

pub fn generate_lib(
    process: &ProcessProfile,
    request: &MemoryRequest,
    result: &CharacterizationResult,
) -> Result<String> {
    let params = LibertyParams::new(process, request, result);
    Ok(TEMPLATES.render("sram.lib", &Context::from_serialize(params)?)?)
}

pub fn save_lib(
    path: impl AsRef<Path>,
    process: &ProcessProfile,
    request: &MemoryRequest,
    result: &CharacterizationResult,
) -> Result<()> {
    let lib = generate_lib(process, request, result)?;

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, lib)?;

    Ok(())
}
