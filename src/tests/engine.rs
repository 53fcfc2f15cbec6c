use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use approx::assert_relative_eq;

use crate::characterize::cacti::tests::SAMPLE_OUTPUT;
use crate::characterize::{characterize, CactiEngine};
use crate::config::memory::tests::raw_memory;
use crate::config::process::tests::raw_45nm;
use crate::config::{MemoryRequest, ProcessProfile};
use crate::error::CharacterizationError;
use crate::paths::{out_cacti_cfg, out_cacti_csv};

/// Installs a shell script standing in for the CACTI executable.
fn install_engine(dir: &Path, body: &str) {
    let path = dir.join("cacti");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_engine_subprocess() {
    let engine_dir = tempfile::tempdir().unwrap();
    // Writes the sample output next to the input file given after -infile.
    install_engine(
        engine_dir.path(),
        &format!("cat > \"$2.out\" <<'EOF'\n{}EOF", SAMPLE_OUTPUT),
    );
    let work_dir = tempfile::tempdir().unwrap();

    let process = ProcessProfile::from_raw(&raw_45nm()).unwrap();
    let request = MemoryRequest::from_raw(&raw_memory("fakeram45_256x32", 32, 256)).unwrap();
    let engine = CactiEngine::new(engine_dir.path());
    let result = characterize(&process, &request, &engine, work_dir.path()).unwrap();

    assert_eq!(result.fed_width_bits, 32);
    assert_relative_eq!(result.access_time_ns, 0.272534);
    assert_relative_eq!(result.width_um, 70.8263);

    let cfg = fs::read_to_string(out_cacti_cfg(work_dir.path())).unwrap();
    assert!(cfg.contains("-size (bytes) 1024"));
    assert!(out_cacti_csv(work_dir.path()).is_file());
}

#[test]
fn test_engine_rejects_every_width() {
    let engine_dir = tempfile::tempdir().unwrap();
    install_engine(engine_dir.path(), "exit 1");
    let work_dir = tempfile::tempdir().unwrap();

    let process = ProcessProfile::from_raw(&raw_45nm()).unwrap();
    let request = MemoryRequest::from_raw(&raw_memory("fakeram45_256x32", 32, 256)).unwrap();
    let engine = CactiEngine::new(engine_dir.path());
    let err = characterize(&process, &request, &engine, work_dir.path()).unwrap_err();

    assert!(matches!(
        err,
        CharacterizationError::Exhausted {
            original: 32,
            last: 48,
            ..
        }
    ));
    // The last attempt's input is left behind for inspection.
    let cfg = fs::read_to_string(out_cacti_cfg(work_dir.path())).unwrap();
    assert!(cfg.contains("-size (bytes) 1536"));
}
