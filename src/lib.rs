pub use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use tera::Tera;

pub mod characterize;
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod lef;
pub mod liberty;
pub mod paths;
pub mod plan;
#[cfg(test)]
mod tests;
pub mod verilog;

lazy_static! {
    pub static ref TEMPLATES: Tera =
        match Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/*")) {
            Ok(t) => t,
            Err(e) => panic!("Error parsing templates: {e}"),
        };
}

pub fn bus_bit(name: &str, index: usize) -> String {
    format!("{name}[{index}]")
}

#[inline]
pub(crate) fn clog2(x: usize) -> usize {
    (x as f64).log2().ceil() as usize
}

/// Integer division, rounding up.
#[inline]
pub(crate) fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}
