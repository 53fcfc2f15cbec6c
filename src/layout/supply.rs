use serde::{Deserialize, Serialize};

use super::tracks::EDGE_OFFSET_TRACKS;
use super::Rect;
use crate::config::ProcessProfile;

/// Metal layer index carrying the supply straps.
pub const SUPPLY_LAYER: usize = 4;
/// Metal layers fully blocked by the macro.
pub const OBSTRUCTED_LAYERS: [usize; 4] = [1, 2, 3, 4];
pub const OVERLAP_LAYER: &str = "OVERLAP";

/// Supply strap width, in supply pin widths.
const STRAP_WIDTH_FACTOR: i64 = 4;
/// Supply strap pitch, in supply pin pitches.
const STRAP_PITCH_FACTOR: i64 = 8;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SupplyStraps {
    pub layer: String,
    pub vertical: bool,
    pub vdd: Vec<Rect>,
    pub vss: Vec<Rect>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Obstruction {
    pub layer: String,
    pub rect: Rect,
}

/// Lays out alternating VSS and VDD straps across the macro.
///
/// Straps run vertically when pins are flipped and horizontally otherwise.
/// Each net repeats every two strap pitches, with VSS first.
pub fn supply_straps(process: &ProcessProfile, width_nm: i64, height_nm: i64) -> SupplyStraps {
    let strap_width = process.supply.width_nm * STRAP_WIDTH_FACTOR;
    let strap_pitch = process.supply.pitch_nm * STRAP_PITCH_FACTOR;
    let half = strap_width / 2;
    let x_offset = EDGE_OFFSET_TRACKS * process.tb_pins.pitch_nm;
    let y_offset = EDGE_OFFSET_TRACKS * process.lr_pins.pitch_nm;
    let vertical = process.flip_pins;

    let (start, limit) = if vertical {
        (x_offset, width_nm - x_offset)
    } else {
        (y_offset, height_nm - y_offset)
    };
    let strap = |center: i64| {
        if vertical {
            Rect::new(center - half, y_offset, center - half + strap_width, height_nm - y_offset)
        } else {
            Rect::new(x_offset, center - half, width_nm - x_offset, center - half + strap_width)
        }
    };

    let mut vss = Vec::new();
    let mut vdd = Vec::new();
    // The first strap must not cross the near edge of the macro.
    let mut center = start.max(half);
    let mut index = 0;
    while center - half + strap_width <= limit {
        if index % 2 == 0 {
            vss.push(strap(center));
        } else {
            vdd.push(strap(center));
        }
        center += strap_pitch;
        index += 1;
    }

    SupplyStraps {
        layer: process.metal(SUPPLY_LAYER),
        vertical,
        vdd,
        vss,
    }
}

/// Full-macro blockages on the lower metal layers.
pub fn obstructions(process: &ProcessProfile, width_nm: i64, height_nm: i64) -> Vec<Obstruction> {
    let rect = Rect::new(0, 0, width_nm, height_nm);
    let mut obs = OBSTRUCTED_LAYERS
        .iter()
        .map(|&i| Obstruction {
            layer: process.metal(i),
            rect,
        })
        .collect::<Vec<_>>();
    if process.needs_overlap_obstruction() {
        obs.push(Obstruction {
            layer: OVERLAP_LAYER.to_string(),
            rect,
        });
    }
    obs
}
