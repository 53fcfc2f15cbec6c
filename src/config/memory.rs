use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RawMemory;
use crate::error::ConfigError;
use crate::{clog2, div_ceil};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    ReadWrite,
    Read,
    Write,
}

impl PortKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::ReadWrite => "rw",
            Self::Read => "r",
            Self::Write => "w",
        }
    }

    #[inline]
    pub fn can_read(&self) -> bool {
        matches!(self, Self::ReadWrite | Self::Read)
    }

    #[inline]
    pub fn can_write(&self) -> bool {
        matches!(self, Self::ReadWrite | Self::Write)
    }
}

/// One physical port of a macro, e.g. `rw0` or `r1`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub kind: PortKind,
    /// Index among the ports of the same kind.
    pub index: usize,
}

impl Port {
    /// Name of a signal belonging to this port, e.g. `rw0_addr_in`.
    pub fn signal(&self, signal: &str) -> String {
        format!("{self}_{signal}")
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PortCounts {
    pub rw: usize,
    pub r: usize,
    pub w: usize,
}

impl PortCounts {
    #[inline]
    pub fn total(&self) -> usize {
        self.rw + self.r + self.w
    }

    pub fn count(&self, kind: PortKind) -> usize {
        match kind {
            PortKind::ReadWrite => self.rw,
            PortKind::Read => self.r,
            PortKind::Write => self.w,
        }
    }

    /// All ports of the given kinds, grouped by kind in the order given.
    pub fn ports(&self, kinds: &[PortKind]) -> Vec<Port> {
        kinds
            .iter()
            .flat_map(|&kind| (0..self.count(kind)).map(move |index| Port { kind, index }))
            .collect()
    }

    /// Ports that accept write data: read-write ports, then write-only ports.
    pub fn write_ports(&self) -> Vec<Port> {
        self.ports(&[PortKind::ReadWrite, PortKind::Write])
    }

    /// Ports that drive read data: read-write ports, then read-only ports.
    pub fn read_ports(&self) -> Vec<Port> {
        self.ports(&[PortKind::ReadWrite, PortKind::Read])
    }

    /// Every port, in the order used by all generated views.
    pub fn all_ports(&self) -> Vec<Port> {
        self.ports(&[PortKind::ReadWrite, PortKind::Write, PortKind::Read])
    }

    fn from_config(name: &str, ports: &str) -> Result<Self, ConfigError> {
        let counts = match ports.trim().to_lowercase().as_str() {
            "1rw" => Self { rw: 1, r: 0, w: 0 },
            "1rw1r" | "1r1rw" => Self { rw: 1, r: 1, w: 0 },
            "1r1w" => Self { rw: 0, r: 1, w: 1 },
            "2r1w" => Self { rw: 0, r: 2, w: 1 },
            _ => {
                return Err(ConfigError::UnknownPortConfig {
                    name: name.to_string(),
                    ports: ports.to_string(),
                })
            }
        };
        Ok(counts)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    WriteFirst,
    ReadFirst,
    WriteThrough,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteFirst => "write_first",
            Self::ReadFirst => "read_first",
            Self::WriteThrough => "write_through",
        }
    }
}

impl FromStr for WriteMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "write_first" => Ok(Self::WriteFirst),
            "read_first" => Ok(Self::ReadFirst),
            "write_through" => Ok(Self::WriteThrough),
            _ => Err(()),
        }
    }
}

/// How a multi-bank memory is split into banks.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankingTechnique {
    Width,
    #[default]
    Depth,
}

impl FromStr for BankingTechnique {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "width" => Ok(Self::Width),
            "depth" => Ok(Self::Depth),
            _ => Err(()),
        }
    }
}

/// A normalized request for one macro.
///
/// `width_bits` and `depth` describe a single bank: for multi-bank requests
/// the configured dimension has already been divided by the bank count.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MemoryRequest {
    pub name: String,
    pub width_bits: usize,
    pub depth: usize,
    pub num_banks: usize,
    pub cache_type: String,
    pub ports: PortCounts,
    pub write_granularity: usize,
    pub write_mode: WriteMode,
    pub has_wmask: bool,
    pub banking: BankingTechnique,
}

impl MemoryRequest {
    pub fn from_raw(raw: &RawMemory) -> Result<Self, ConfigError> {
        let name = raw.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "name",
                context: "memory entry".to_string(),
            });
        }
        let context = format!("memory `{name}`");
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidValue {
            field,
            context: context.clone(),
            reason: reason.to_string(),
        };

        if raw.width == 0 {
            return Err(invalid("width", "width must be at least 1 bit"));
        }
        if raw.depth < 2 {
            return Err(invalid("depth", "depth must be at least 2 words"));
        }

        let num_banks = raw.banks.unwrap_or(1);
        if num_banks == 0 || (num_banks > 1 && num_banks % 2 != 0) {
            return Err(ConfigError::UnsupportedBankCount {
                name,
                banks: num_banks,
            });
        }
        let banking = match &raw.banking_technique {
            Some(t) => t
                .parse()
                .map_err(|_| ConfigError::UnknownBankingTechnique {
                    name: name.clone(),
                    technique: t.clone(),
                })?,
            None => BankingTechnique::default(),
        };
        let (width_bits, depth) = match (num_banks, banking) {
            (1, _) => (raw.width, raw.depth),
            (n, BankingTechnique::Width) => (div_ceil(raw.width, n), raw.depth),
            (n, BankingTechnique::Depth) => (raw.width, div_ceil(raw.depth, n)),
        };
        if depth < 2 {
            return Err(invalid("depth", "depth per bank must be at least 2 words"));
        }

        let mut ports = match &raw.ports {
            Some(p) => PortCounts::from_config(&name, p)?,
            None => PortCounts { rw: 1, r: 0, w: 0 },
        };
        if raw.rw_ports.is_some() || raw.r_ports.is_some() || raw.w_ports.is_some() {
            ports = PortCounts {
                rw: raw.rw_ports.unwrap_or(0),
                r: raw.r_ports.unwrap_or(0),
                w: raw.w_ports.unwrap_or(0),
            };
        }
        if ports.rw + ports.w == 0 {
            return Err(invalid("ports", "at least one writable port is required"));
        }
        if ports.rw + ports.r == 0 {
            return Err(invalid("ports", "at least one readable port is required"));
        }

        let write_granularity = raw.write_granularity.unwrap_or(1);
        if write_granularity == 0 || write_granularity > width_bits {
            return Err(invalid(
                "write_granularity",
                "must be between 1 and the word width",
            ));
        }
        let write_mode = match &raw.write_mode {
            Some(m) => m.parse().map_err(|_| ConfigError::UnknownWriteMode {
                name: name.clone(),
                mode: m.clone(),
            })?,
            None => WriteMode::default(),
        };
        let has_wmask = match &raw.write_mask {
            Some(v) => v.resolve("write_mask", &context)?,
            None => false,
        };

        Ok(Self {
            cache_type: raw.cache_type.clone().unwrap_or_else(|| "cache".to_string()),
            name,
            width_bits,
            depth,
            num_banks,
            ports,
            write_granularity,
            write_mode,
            has_wmask,
            banking,
        })
    }

    #[inline]
    pub fn width_in_bytes(&self) -> usize {
        div_ceil(self.width_bits, 8)
    }

    #[inline]
    pub fn total_size(&self) -> usize {
        self.width_in_bytes() * self.depth
    }

    #[inline]
    pub fn addr_width(&self) -> usize {
        clog2(self.depth)
    }

    /// Number of write mask bits per write port.
    #[inline]
    pub fn wmask_width(&self) -> usize {
        div_ceil(self.width_bits, self.write_granularity)
    }
}
