use std::path::{Path, PathBuf};

/// Directory holding every generated file of one memory.
pub fn out_results_dir(output_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(output_dir.as_ref()).join(name)
}

pub fn out_cacti_cfg(work_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join("cacti.cfg")
}

/// The engine appends `.out` to the name of its input file.
pub fn out_cacti_csv(work_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join("cacti.cfg.out")
}

pub fn out_verilog(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.v"))
}

pub fn out_verilog_bb(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.bb.v"))
}

pub fn out_lef(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.lef"))
}

pub fn out_lib(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.lib"))
}
