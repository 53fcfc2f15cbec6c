use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{Edge, PinDirection};
use crate::bus_bit;
use crate::config::{MemoryRequest, Port};
use crate::div_ceil;

/// Per-port signals of a macro.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Signal {
    WmaskIn,
    WdIn,
    RdOut,
    AddrIn,
    WeIn,
    CeIn,
    Clk,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WmaskIn => "wmask_in",
            Self::WdIn => "wd_in",
            Self::RdOut => "rd_out",
            Self::AddrIn => "addr_in",
            Self::WeIn => "we_in",
            Self::CeIn => "ce_in",
            Self::Clk => "clk",
        }
    }

    pub fn direction(&self) -> PinDirection {
        match self {
            Self::RdOut => PinDirection::Output,
            _ => PinDirection::Input,
        }
    }
}

/// A pin that has been assigned to an edge but not yet placed.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LogicalPin {
    pub name: String,
    pub direction: PinDirection,
}

/// Consecutive pins of one port and signal that share an edge.
///
/// Placement inserts the edge's group spacing between neighboring groups.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PinGroup {
    pub edge: Edge,
    pub port: Port,
    pub signal: Signal,
    pub pins: Vec<LogicalPin>,
}

fn bus_group(port: Port, signal: Signal, edge: Edge, bits: Range<usize>) -> Option<PinGroup> {
    if bits.is_empty() {
        return None;
    }
    let name = port.signal(signal.as_str());
    Some(PinGroup {
        edge,
        port,
        signal,
        pins: bits
            .map(|i| LogicalPin {
                name: bus_bit(&name, i),
                direction: signal.direction(),
            })
            .collect(),
    })
}

/// Splits an `n`-bit bus into quarter, quarter, and half sections.
fn quarter_split(n: usize) -> [Range<usize>; 3] {
    let q = div_ceil(n, 4);
    let h = div_ceil(n, 2);
    [0..q, q..h, h..n]
}

fn half_split(n: usize) -> [Range<usize>; 2] {
    let h = div_ceil(n, 2);
    [0..h, h..n]
}

/// Assigns every signal pin of `request` to an edge.
///
/// Groups are returned in placement order: write masks, write data, read
/// data, addresses, then control and clock pins.
pub fn assign_pins(request: &MemoryRequest) -> Vec<PinGroup> {
    let width = request.width_bits;
    let addr_width = request.addr_width();
    let ports = &request.ports;
    let mut groups = Vec::new();

    if request.has_wmask {
        for port in ports.write_ports() {
            let [left, right, top] = quarter_split(request.wmask_width());
            groups.extend(bus_group(port, Signal::WmaskIn, Edge::Left, left));
            groups.extend(bus_group(port, Signal::WmaskIn, Edge::Right, right));
            groups.extend(bus_group(port, Signal::WmaskIn, Edge::Top, top));
        }
    }

    for port in ports.write_ports() {
        let [left, right, bottom] = quarter_split(width);
        groups.extend(bus_group(port, Signal::WdIn, Edge::Left, left));
        groups.extend(bus_group(port, Signal::WdIn, Edge::Right, right));
        groups.extend(bus_group(port, Signal::WdIn, Edge::Bottom, bottom));
    }

    for port in ports.read_ports() {
        let [bottom, top] = half_split(width);
        groups.extend(bus_group(port, Signal::RdOut, Edge::Bottom, bottom));
        groups.extend(bus_group(port, Signal::RdOut, Edge::Top, top));
    }

    for port in ports.all_ports() {
        let [left, right] = half_split(addr_width);
        groups.extend(bus_group(port, Signal::AddrIn, Edge::Left, left));
        groups.extend(bus_group(port, Signal::AddrIn, Edge::Right, right));
    }

    for port in ports.all_ports() {
        let signals: &[Signal] = if port.kind.can_write() {
            &[Signal::WeIn, Signal::CeIn, Signal::Clk]
        } else {
            &[Signal::CeIn, Signal::Clk]
        };
        groups.extend(signals.iter().map(|&signal| PinGroup {
            edge: Edge::Top,
            port,
            signal,
            pins: vec![LogicalPin {
                name: port.signal(signal.as_str()),
                direction: signal.direction(),
            }],
        }));
    }

    groups
}
