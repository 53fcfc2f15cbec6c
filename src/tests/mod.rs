use std::collections::HashSet;

use crate::characterize::cacti::tests::FakeEngine;
use crate::characterize::{
    CactiSearch, CharacterizationResult, Characterizer, RawCharacterization, WideningPolicy,
};
use crate::config::memory::tests::raw_memory;
use crate::config::process::tests::{raw_45nm, raw_7nm};
use crate::config::{FakeramConfig, MemoryRequest, ProcessProfile, RawConfig, RawMemory};
use crate::error::{ConfigError, LayoutError};
use crate::layout::plan_layout;
use crate::paths::{out_lef, out_lib, out_verilog, out_verilog_bb};
use crate::plan::{generate_all, TaskKey};

#[cfg(unix)]
mod engine;

/// A characterization of a 32-bit memory with the given unsnapped size.
pub(crate) fn result_with_size(
    process: &ProcessProfile,
    width_um: f64,
    height_um: f64,
) -> CharacterizationResult {
    let raw = RawCharacterization {
        tech_node_nm: process.tech_nm,
        associativity: 1,
        access_time_ns: 0.3,
        cycle_time_ns: 0.25,
        dynamic_read_energy_nj: 0.01,
        dynamic_write_energy_nj: 0.02,
        leakage_mw: 1.0,
        fo4_ps: 14.0,
        width_um,
        height_um,
    };
    CharacterizationResult::new(process, raw, 32)
}

fn count_pins(names: &[&str], signal: &str) -> usize {
    names.iter().filter(|name| name.contains(signal)).count()
}

#[test]
fn test_single_port_pin_set() {
    let process = ProcessProfile::from_raw(&raw_45nm()).unwrap();
    let request = MemoryRequest::from_raw(&raw_memory("fakeram45_256x32", 32, 256)).unwrap();
    assert_eq!(request.addr_width(), 8);

    let result = result_with_size(&process, 50.0, 40.0);
    let plan = plan_layout(&process, &request, &result).unwrap();
    let names = plan.pins.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();

    assert_eq!(count_pins(&names, "_wd_in["), 32);
    assert_eq!(count_pins(&names, "_rd_out["), 32);
    assert_eq!(count_pins(&names, "_addr_in["), 8);
    let control = names
        .iter()
        .filter(|name| !name.contains('['))
        .collect::<HashSet<_>>();
    assert_eq!(control, HashSet::from([&"rw0_we_in", &"rw0_ce_in", &"rw0_clk"]));

    assert_eq!(names.len(), 75);
    assert_eq!(names.iter().collect::<HashSet<_>>().len(), names.len());
}

#[test]
fn test_width_banking() {
    let raw = RawMemory {
        banks: Some(4),
        banking_technique: Some("width".to_string()),
        ..raw_memory("fakeram45_256x64", 64, 256)
    };
    let request = MemoryRequest::from_raw(&raw).unwrap();
    assert_eq!(request.width_bits, 16);
    assert_eq!(request.depth, 256);
    assert_eq!(request.num_banks, 4);
}

#[test]
fn test_generate_all_views() {
    let config = FakeramConfig::from_raw(RawConfig {
        process: raw_45nm(),
        sram: vec![
            raw_memory("fakeram45_256x32", 32, 256),
            raw_memory("fakeram45_16x1024", 1024, 16),
        ],
    })
    .unwrap();
    let engine = FakeEngine::new(0);
    let dir = tempfile::tempdir().unwrap();
    let tasks = HashSet::from([TaskKey::All]);

    let outcomes = generate_all(&config, &engine, dir.path(), &tasks, false);
    assert_eq!(outcomes.len(), 2);

    let ok = &outcomes[0];
    let plan = ok.result.as_ref().unwrap();
    assert_eq!(ok.work_dir, dir.path().join("fakeram45_256x32"));
    assert_eq!(plan.result.snapped_width_nm, 70_870);
    assert_eq!(plan.result.snapped_height_nm, 60_200);
    for path in [
        out_lef(&ok.work_dir, &ok.name),
        out_lib(&ok.work_dir, &ok.name),
        out_verilog(&ok.work_dir, &ok.name),
        out_verilog_bb(&ok.work_dir, &ok.name),
    ] {
        assert!(path.is_file(), "missing {path:?}");
    }
    let lef = std::fs::read_to_string(out_lef(&ok.work_dir, &ok.name)).unwrap();
    assert!(lef.contains("rw0_clk"));

    // 1024 data pins cannot fit along a 70 um edge.
    let failed = &outcomes[1];
    let err = failed.result.as_ref().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LayoutError>(),
        Some(LayoutError::Infeasible { .. })
    ));
    assert!(!out_lef(&failed.work_dir, &failed.name).exists());
}

#[test]
fn test_selected_views_only() {
    let config = FakeramConfig::from_raw(RawConfig {
        process: raw_45nm(),
        sram: vec![raw_memory("fakeram45_64x8", 8, 64)],
    })
    .unwrap();
    let engine = FakeEngine::new(0);
    let dir = tempfile::tempdir().unwrap();
    let tasks = HashSet::from([TaskKey::GenerateLib]);

    let outcomes = generate_all(&config, &engine, dir.path(), &tasks, false);
    let outcome = &outcomes[0];
    assert!(outcome.result.is_ok());
    assert!(out_lib(&outcome.work_dir, &outcome.name).is_file());
    assert!(!out_lef(&outcome.work_dir, &outcome.name).exists());
    assert!(!out_verilog(&outcome.work_dir, &outcome.name).exists());
}

#[test]
fn test_fixed_process_pipeline() {
    let config = FakeramConfig::from_raw(RawConfig {
        process: raw_7nm(),
        sram: vec![raw_memory("fakeram7_256x32", 32, 256)],
    })
    .unwrap();
    let engine = FakeEngine::new(usize::MAX);
    let dir = tempfile::tempdir().unwrap();

    let tasks = HashSet::from([TaskKey::All]);

    let outcomes = generate_all(&config, &engine, dir.path(), &tasks, false);
    let plan = outcomes[0].result.as_ref().unwrap();

    assert!(engine.widths.borrow().is_empty());
    assert_eq!(plan.layout.width_nm, 4_032);
    assert_eq!(plan.layout.height_nm, 69_696);
    assert!(plan.layout.pins.iter().all(|p| p.layer == "M4" || p.layer == "M3"));

    let lib = std::fs::read_to_string(out_lib(&outcomes[0].work_dir, "fakeram7_256x32")).unwrap();
    assert!(lib.contains("nom_voltage : 0.7;"));
}

#[test]
fn test_invalid_entry_does_not_block_others() {
    let config = FakeramConfig::from_raw(RawConfig {
        process: raw_45nm(),
        sram: vec![
            raw_memory("good_256x32", 32, 256),
            RawMemory {
                banks: Some(3),
                ..raw_memory("bad", 32, 256)
            },
        ],
    })
    .unwrap();
    let engine = FakeEngine::new(0);
    let dir = tempfile::tempdir().unwrap();
    let tasks = HashSet::from([TaskKey::All]);

    let outcomes = generate_all(&config, &engine, dir.path(), &tasks, false);
    assert_eq!(outcomes.len(), 2);

    let good = &outcomes[0];
    assert!(good.result.is_ok());
    assert!(out_lef(&good.work_dir, &good.name).is_file());

    let bad = &outcomes[1];
    assert_eq!(bad.name, "bad");
    let err = bad.result.as_ref().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::UnsupportedBankCount { banks: 3, .. })
    ));
    assert!(!bad.work_dir.exists());
    // Only the valid memory reaches the engine.
    assert_eq!(*engine.widths.borrow(), [32]);
}

#[test]
fn test_widened_memory_keeps_original_pins() {
    let process = ProcessProfile::from_raw(&raw_45nm()).unwrap();
    let request = MemoryRequest::from_raw(&raw_memory("fakeram45_256x30", 30, 256)).unwrap();
    let engine = FakeEngine::new(40);
    let dir = tempfile::tempdir().unwrap();

    let search = CactiSearch::new(&engine, WideningPolicy::default(), dir.path());
    let result = search.characterize(&process, &request).unwrap();
    assert_eq!(result.fed_width_bits, 38);
    assert_eq!(*engine.widths.borrow(), [32, 40]);
    approx::assert_relative_eq!(result.width_um, 70.8263 * 30.0 / 38.0, max_relative = 1e-12);

    let plan = plan_layout(&process, &request, &result).unwrap();
    let names = plan.pins.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(count_pins(&names, "_wd_in["), 30);
    assert_eq!(count_pins(&names, "_rd_out["), 30);
    assert!(!names.iter().any(|name| name.contains("[30]")));
}
