use std::fmt::Display;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::characterize::CharacterizationResult;
use crate::config::{MemoryRequest, PinGeometry, ProcessProfile};
use crate::error::LayoutError;

pub mod pins;
pub mod supply;
pub mod tracks;

pub use pins::{assign_pins, LogicalPin, PinGroup, Signal};
pub use supply::{Obstruction, SupplyStraps};

use tracks::{available_tracks, group_spacing_tracks, track_multiplier, EDGE_OFFSET_TRACKS};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];

    /// Position of this edge in [`Edge::ALL`].
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Edge::Left => 0,
            Edge::Right => 1,
            Edge::Top => 2,
            Edge::Bottom => 3,
        }
    }

    /// Whether pins on this edge are stacked along the y axis.
    #[inline]
    pub fn is_side(&self) -> bool {
        matches!(self, Edge::Left | Edge::Right)
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Edge::Left => "left",
            Edge::Right => "right",
            Edge::Top => "top",
            Edge::Bottom => "bottom",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
}

/// An axis-aligned rectangle in integer nanometers.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl Rect {
    #[inline]
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PinPlacement {
    pub name: String,
    pub direction: PinDirection,
    pub edge: Edge,
    pub layer: String,
    pub rect: Rect,
}

/// Track usage on one edge of the macro.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EdgeTracks {
    pub edge: Edge,
    pub available: usize,
    pub pins: usize,
    pub groups: usize,
    pub multiplier: usize,
    pub pin_pitch_nm: i64,
    pub group_pitch_nm: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PinLayoutPlan {
    pub width_nm: i64,
    pub height_nm: i64,
    pub pins: Vec<PinPlacement>,
    /// Track usage of each edge, in [`Edge::ALL`] order.
    pub edges: Vec<EdgeTracks>,
    pub supply: SupplyStraps,
    pub obstructions: Vec<Obstruction>,
}

impl PinLayoutPlan {
    pub fn edge(&self, edge: Edge) -> Option<&EdgeTracks> {
        self.edges.iter().find(|t| t.edge == edge)
    }

    pub fn pins_on(&self, edge: Edge) -> impl Iterator<Item = &PinPlacement> {
        self.pins.iter().filter(move |p| p.edge == edge)
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width_nm, self.height_nm)
    }
}

fn edge_geometry(process: &ProcessProfile, edge: Edge) -> &PinGeometry {
    if edge.is_side() {
        &process.lr_pins
    } else {
        &process.tb_pins
    }
}

/// Metal layer carrying the signal pins of an edge.
pub fn pin_layer(process: &ProcessProfile, edge: Edge) -> String {
    let index = match (edge.is_side(), process.flip_pins) {
        (true, false) => 4,
        (true, true) => 3,
        (false, false) => 3,
        (false, true) => 2,
    };
    process.metal(index)
}

fn pin_rect(edge: Edge, geometry: &PinGeometry, center: i64, width: i64, height: i64) -> Rect {
    let lo = center - geometry.width_nm / 2;
    let hi = lo + geometry.width_nm;
    let depth = geometry.height_nm;
    match edge {
        Edge::Left => Rect::new(0, lo, depth, hi),
        Edge::Right => Rect::new(width - depth, lo, width, hi),
        Edge::Top => Rect::new(lo, height - depth, hi, height),
        Edge::Bottom => Rect::new(lo, 0, hi, depth),
    }
}

/// Computes pin positions, supply straps, and obstructions for a macro.
///
/// Every edge is checked for feasibility before any pin is placed.
pub fn plan_layout(
    process: &ProcessProfile,
    request: &MemoryRequest,
    result: &CharacterizationResult,
) -> Result<PinLayoutPlan, LayoutError> {
    let width = result.snapped_width_nm;
    let height = result.snapped_height_nm;
    let groups = assign_pins(request);

    let mut edges = Vec::with_capacity(Edge::ALL.len());
    for edge in Edge::ALL {
        let geometry = edge_geometry(process, edge);
        let length = if edge.is_side() { height } else { width };
        let available = available_tracks(length, geometry.pitch_nm);
        let (pins, group_count) = groups
            .iter()
            .filter(|g| g.edge == edge)
            .fold((0, 0), |(n, g), group| (n + group.pins.len(), g + 1));

        let multiplier = track_multiplier(pins, available).ok_or(LayoutError::Infeasible {
            edge,
            pins,
            available,
        })?;
        let spacing = group_spacing_tracks(pins, multiplier, available, group_count);
        let tracks = EdgeTracks {
            edge,
            available,
            pins,
            groups: group_count,
            multiplier,
            pin_pitch_nm: geometry.pitch_nm * multiplier as i64,
            group_pitch_nm: geometry.pitch_nm * spacing as i64,
        };
        debug!(
            "{}: {edge} edge has {pins} pins in {group_count} groups on {available} tracks (x{multiplier})",
            request.name
        );
        edges.push(tracks);
    }

    // Groups are walked in global order with one cursor per edge.
    let mut cursors = edges
        .iter()
        .map(|t| EDGE_OFFSET_TRACKS * edge_geometry(process, t.edge).pitch_nm)
        .collect::<Vec<_>>();
    let mut placed_groups = vec![0usize; edges.len()];
    let layers = Edge::ALL.map(|edge| pin_layer(process, edge));

    let mut pins = Vec::with_capacity(groups.iter().map(|g| g.pins.len()).sum());
    for group in &groups {
        let i = group.edge.index();
        let tracks = &edges[i];
        let geometry = edge_geometry(process, group.edge);
        if placed_groups[i] > 0 {
            cursors[i] += tracks.group_pitch_nm;
        }
        placed_groups[i] += 1;

        for pin in &group.pins {
            pins.push(PinPlacement {
                name: pin.name.clone(),
                direction: pin.direction,
                edge: group.edge,
                layer: layers[i].clone(),
                rect: pin_rect(group.edge, geometry, cursors[i], width, height),
            });
            cursors[i] += tracks.pin_pitch_nm;
        }
    }

    info!(
        "{}: placed {} pins on a {:.3} x {:.3} um macro",
        request.name,
        pins.len(),
        width as f64 / 1000.0,
        height as f64 / 1000.0
    );

    Ok(PinLayoutPlan {
        width_nm: width,
        height_nm: height,
        pins,
        edges,
        supply: supply::supply_straps(process, width, height),
        obstructions: supply::obstructions(process, width, height),
    })
}
