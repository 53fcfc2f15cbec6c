use std::path::Path;

use serde::{Deserialize, Serialize};
use tera::Context;

use crate::config::{MemoryRequest, WriteMode};
use crate::{Result, TEMPLATES};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VerilogPort {
    pub name: String,
    pub can_read: bool,
    pub can_write: bool,
}

/// Data bits controlled by one write mask bit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MaskSlice {
    pub bit: usize,
    pub msb: usize,
    pub lsb: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SramParams {
    pub name: String,
    pub num_words: usize,
    pub data_width: usize,
    pub addr_width: usize,
    pub wmask_width: usize,
    pub has_wmask: bool,
    pub read_first: bool,
    pub mask_slices: Vec<MaskSlice>,
    pub ports: Vec<VerilogPort>,
}

impl SramParams {
    pub fn new(request: &MemoryRequest) -> Self {
        let granularity = request.write_granularity;
        let mask_slices = (0..request.wmask_width())
            .map(|bit| MaskSlice {
                bit,
                lsb: bit * granularity,
                msb: ((bit + 1) * granularity).min(request.width_bits) - 1,
            })
            .collect();

        Self {
            name: request.name.clone(),
            num_words: request.depth,
            data_width: request.width_bits,
            addr_width: request.addr_width(),
            wmask_width: request.wmask_width(),
            has_wmask: request.has_wmask,
            read_first: request.write_mode == WriteMode::ReadFirst,
            mask_slices,
            ports: request
                .ports
                .all_ports()
                .into_iter()
                .map(|port| VerilogPort {
                    name: port.to_string(),
                    can_read: port.kind.can_read(),
                    can_write: port.kind.can_write(),
                })
                .collect(),
        }
    }
}

pub fn generate_verilog(request: &MemoryRequest) -> Result<String> {
    let params = SramParams::new(request);
    Ok(TEMPLATES.render("sram.v", &Context::from_serialize(params)?)?)
}

pub fn generate_verilog_bb(request: &MemoryRequest) -> Result<String> {
    let params = SramParams::new(request);
    Ok(TEMPLATES.render("sram.bb.v", &Context::from_serialize(params)?)?)
}

pub fn save_verilog(path: impl AsRef<Path>, request: &MemoryRequest) -> Result<()> {
    save(path.as_ref(), generate_verilog(request)?)
}

pub fn save_verilog_bb(path: impl AsRef<Path>, request: &MemoryRequest) -> Result<()> {
    save(path.as_ref(), generate_verilog_bb(request)?)
}

fn save(path: &Path, contents: String) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::memory::tests::raw_memory;
    use crate::config::{Loose, RawMemory};

    fn masked(width: usize, granularity: usize) -> MemoryRequest {
        MemoryRequest::from_raw(&RawMemory {
            write_mask: Some(Loose::Value(true)),
            write_granularity: Some(granularity),
            ..raw_memory("fakeram_masked", width, 64)
        })
        .unwrap()
    }

    #[test]
    fn test_mask_slices() {
        let params = SramParams::new(&masked(32, 8));
        assert_eq!(params.wmask_width, 4);
        assert_eq!(params.mask_slices[0], MaskSlice { bit: 0, msb: 7, lsb: 0 });
        assert_eq!(params.mask_slices[3], MaskSlice { bit: 3, msb: 31, lsb: 24 });

        // The last slice is truncated to the word.
        let params = SramParams::new(&masked(20, 8));
        assert_eq!(params.wmask_width, 3);
        assert_eq!(params.mask_slices[2], MaskSlice { bit: 2, msb: 19, lsb: 16 });
    }

    #[test]
    fn test_generate_verilog() {
        let request = MemoryRequest::from_raw(&raw_memory("fakeram45_256x32", 32, 256)).unwrap();
        let v = generate_verilog(&request).unwrap();

        assert!(v.starts_with("module fakeram45_256x32"));
        assert!(v.contains("parameter BITS = 32;"));
        assert!(v.contains("parameter WORD_DEPTH = 256;"));
        assert!(v.contains("parameter ADDR_WIDTH = 8;"));
        assert!(v.contains("always @(posedge rw0_clk) begin"));
        assert!(v.contains("mem[rw0_addr_in] <= rw0_wd_in;"));
        assert!(v.contains("rw0_rd_out <= 'x;"));
        assert!(!v.contains("wmask"));
        assert!(v.trim_end().ends_with("endmodule"));

        // Write-first reads after the write.
        let write = v.find("// Write port").unwrap();
        let read = v.find("// Read port").unwrap();
        assert!(write < read);
    }

    #[test]
    fn test_generate_masked_verilog() {
        let v = generate_verilog(&masked(32, 8)).unwrap();
        assert!(v.contains("input  [3:0]  rw0_wmask_in;"));
        assert!(v.contains("if (rw0_wmask_in[3])"));
        assert!(v.contains("mem[rw0_addr_in][31:24] <= rw0_wd_in[31:24];"));
    }

    #[test]
    fn test_read_first_and_ports() {
        let raw = RawMemory {
            ports: Some("1r1w".to_string()),
            write_mode: Some("read_first".to_string()),
            ..raw_memory("fakeram_2p", 16, 32)
        };
        let request = MemoryRequest::from_raw(&raw).unwrap();
        let v = generate_verilog(&request).unwrap();
        assert!(v.contains("always @(posedge w0_clk) begin"));
        assert!(v.contains("always @(posedge r0_clk) begin"));
        assert!(v.contains("// Read-first"));
        assert!(!v.contains("w0_rd_out"));
        assert!(!v.contains("r0_we_in"));
    }

    #[test]
    fn test_generate_blackbox() {
        let request = MemoryRequest::from_raw(&raw_memory("fakeram45_64x8", 8, 64)).unwrap();
        let bb = generate_verilog_bb(&request).unwrap();
        assert!(bb.contains("output reg [BITS-1:0]    rw0_rd_out;"));
        assert!(bb.contains("rw0_addr_in\n);"));
        assert!(!bb.contains("always"));
        assert!(!bb.contains("specify"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fakeram45_64x8.bb.v");
        save_verilog_bb(&path, &request).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), bb);
    }
}
