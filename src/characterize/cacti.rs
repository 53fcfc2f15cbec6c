use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use derive_builder::Builder;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tera::Context;

use super::{CharacterizationResult, Characterizer, RawCharacterization};
use crate::config::{MemoryRequest, ProcessProfile};
use crate::error::CharacterizationError;
use crate::paths::{out_cacti_cfg, out_cacti_csv};
use crate::{div_ceil, TEMPLATES};

/// Name of the engine executable inside its build directory.
pub const ENGINE_BINARY: &str = "cacti";

/// Number of comma-separated fields in a line of engine output.
const OUTPUT_FIELDS: usize = 14;

/// Everything the engine needs to characterize one memory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct EngineInput {
    #[builder(setter(into))]
    pub name: String,
    /// Directory receiving the engine input and output files.
    #[builder(setter(into))]
    pub work_dir: PathBuf,
    pub total_size_bytes: usize,
    pub block_size_bytes: usize,
    pub rw_ports: usize,
    pub r_ports: usize,
    pub w_ports: usize,
    pub tech_um: f64,
    pub output_width_bits: usize,
    pub num_banks: usize,
    #[builder(setter(into))]
    pub cache_type: String,
}

/// Outcome of a failed characterization attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// The engine did not accept this configuration. The caller may retry
    /// with a different word width.
    Rejected,
    Fatal(CharacterizationError),
}

impl From<CharacterizationError> for AttemptError {
    fn from(value: CharacterizationError) -> Self {
        Self::Fatal(value)
    }
}

impl From<std::io::Error> for AttemptError {
    fn from(value: std::io::Error) -> Self {
        Self::Fatal(value.into())
    }
}

pub trait CharacterizationEngine {
    fn evaluate(&self, input: &EngineInput) -> Result<RawCharacterization, AttemptError>;
}

/// Bounds the width search performed when the engine rejects a configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct WideningPolicy {
    /// Bits added to the word width after each rejection.
    pub step_bits: usize,
    /// Maximum number of widening steps.
    pub max_steps: usize,
}

impl Default for WideningPolicy {
    fn default() -> Self {
        Self {
            step_bits: 8,
            max_steps: 2,
        }
    }
}

impl WideningPolicy {
    /// Word widths to try for a request, in order.
    pub fn widths(&self, original: usize) -> impl Iterator<Item = usize> {
        let step = self.step_bits;
        (0..=self.max_steps).map(move |i| original + i * step)
    }
}

/// Characterizes memories by searching for a word width the engine accepts.
pub struct CactiSearch<'a, E: ?Sized> {
    engine: &'a E,
    policy: WideningPolicy,
    /// Directory receiving the engine files of the memory being characterized.
    work_dir: PathBuf,
}

impl<'a, E> CactiSearch<'a, E>
where
    E: CharacterizationEngine + ?Sized,
{
    pub fn new(engine: &'a E, policy: WideningPolicy, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            policy,
            work_dir: work_dir.into(),
        }
    }

    /// Runs the engine once with the word width set to `fed_width`.
    ///
    /// The request itself is left untouched.
    pub fn attempt(
        &self,
        process: &ProcessProfile,
        request: &MemoryRequest,
        fed_width: usize,
    ) -> Result<RawCharacterization, AttemptError> {
        let width_in_bytes = div_ceil(fed_width, 8);
        let input = EngineInputBuilder::default()
            .name(request.name.as_str())
            .work_dir(self.work_dir.as_path())
            .total_size_bytes(width_in_bytes * request.depth)
            .block_size_bytes(width_in_bytes)
            .rw_ports(request.ports.rw)
            .r_ports(request.ports.r)
            .w_ports(request.ports.w)
            .tech_um(process.tech_um())
            .output_width_bits(width_in_bytes * 8)
            .num_banks(request.num_banks)
            .cache_type(request.cache_type.as_str())
            .build()
            .map_err(CharacterizationError::from)?;
        self.engine.evaluate(&input)
    }
}

impl<'a, E> Characterizer for CactiSearch<'a, E>
where
    E: CharacterizationEngine + ?Sized,
{
    fn characterize(
        &self,
        process: &ProcessProfile,
        request: &MemoryRequest,
    ) -> Result<CharacterizationResult, CharacterizationError> {
        let original = request.width_bits;
        let mut last = original;

        for fed_width in self.policy.widths(original) {
            last = fed_width;
            info!(
                "Characterizing {} ({} x {} bits)",
                request.name, request.depth, fed_width
            );
            match self.attempt(process, request, fed_width) {
                Ok(mut raw) => {
                    if fed_width != original {
                        let scale = original as f64 / fed_width as f64;
                        debug!(
                            "{}: rescaling width {} um by {original}/{fed_width}",
                            request.name, raw.width_um
                        );
                        raw.width_um *= scale;
                    }
                    return Ok(CharacterizationResult::new(process, raw, fed_width));
                }
                Err(AttemptError::Rejected) => {
                    warn!(
                        "{}: engine rejected a word width of {fed_width} bits",
                        request.name
                    );
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }

        Err(CharacterizationError::Exhausted {
            name: request.name.clone(),
            original,
            last,
        })
    }
}

/// Runs the CACTI executable as a blocking subprocess.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CactiEngine {
    cacti_dir: PathBuf,
}

impl CactiEngine {
    pub fn new(cacti_dir: impl Into<PathBuf>) -> Self {
        Self {
            cacti_dir: cacti_dir.into(),
        }
    }

    #[inline]
    pub fn binary(&self) -> PathBuf {
        self.cacti_dir.join(ENGINE_BINARY)
    }
}

impl CharacterizationEngine for CactiEngine {
    fn evaluate(&self, input: &EngineInput) -> Result<RawCharacterization, AttemptError> {
        let binary = self.binary();
        if !binary.is_file() {
            return Err(CharacterizationError::EngineNotFound(binary).into());
        }

        fs::create_dir_all(&input.work_dir)?;
        let work_dir = fs::canonicalize(&input.work_dir)?;
        let cfg_path = out_cacti_cfg(&work_dir);
        let out_path = out_cacti_csv(&work_dir);
        save_engine_input(&cfg_path, input)?;
        if out_path.exists() {
            fs::remove_file(&out_path)?;
        }

        let log_file = fs::File::create(work_dir.join("cacti.log"))?;
        let status = Command::new(&binary)
            .arg("-infile")
            .arg(&cfg_path)
            .stdin(Stdio::null())
            .stdout(log_file.try_clone()?)
            .stderr(log_file)
            .current_dir(&self.cacti_dir)
            .status()
            .map_err(CharacterizationError::Launch)?;
        if !status.success() {
            warn!("{}: characterization engine exited with {status}", input.name);
        }

        if !out_path.is_file() {
            return Err(AttemptError::Rejected);
        }
        Ok(parse_engine_output(&out_path)?)
    }
}

pub fn render_engine_input(input: &EngineInput) -> Result<String, CharacterizationError> {
    Ok(TEMPLATES.render("cacti.cfg", &Context::from_serialize(input)?)?)
}

pub fn save_engine_input(
    path: impl AsRef<Path>,
    input: &EngineInput,
) -> Result<(), CharacterizationError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_engine_input(input)?)?;
    Ok(())
}

/// Parses the last line of an engine output file.
pub fn parse_engine_output(path: &Path) -> Result<RawCharacterization, CharacterizationError> {
    let contents = fs::read_to_string(path)?;
    parse_engine_line(&contents).map_err(|reason| CharacterizationError::MalformedOutput {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_engine_line(contents: &str) -> Result<RawCharacterization, String> {
    let line = contents
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| "file is empty".to_string())?;
    let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
    if fields.len() < OUTPUT_FIELDS {
        return Err(format!(
            "expected {OUTPUT_FIELDS} fields, found {}",
            fields.len()
        ));
    }

    fn field<T: FromStr>(fields: &[&str], index: usize, what: &str) -> Result<T, String> {
        fields[index]
            .parse()
            .map_err(|_| format!("could not parse {what} from `{}`", fields[index]))
    }

    // Integer columns are sometimes printed with a fractional part.
    let tech_node_nm = field::<f64>(&fields, 0, "technology node")?.round() as u32;
    let associativity = field::<f64>(&fields, 2, "associativity")?.round() as usize;

    Ok(RawCharacterization {
        tech_node_nm,
        associativity,
        access_time_ns: field(&fields, 4, "access time")?,
        cycle_time_ns: field(&fields, 5, "cycle time")?,
        dynamic_read_energy_nj: field(&fields, 7, "read energy")?,
        dynamic_write_energy_nj: field(&fields, 8, "write energy")?,
        leakage_mw: field(&fields, 9, "leakage")?,
        fo4_ps: field(&fields, 11, "fo4 delay")?,
        width_um: field(&fields, 12, "width")?,
        height_um: field(&fields, 13, "height")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use approx::assert_relative_eq;

    use super::*;
    use crate::config::memory::tests::raw_memory;
    use crate::config::process::tests::raw_45nm;

    pub(crate) const SAMPLE_OUTPUT: &str = "\
Tech node (nm), Capacity (bytes), Associativity, Output width (bits), Access time (ns), Random cycle time (ns), Dynamic search energy (nJ), Dynamic read energy (nJ), Dynamic write energy (nJ), Standby leakage per bank(mW), Area (mm2), FO4 (ps), Width (um), Height (um)
45, 1024, 1, 32, 0.272534, 0.189474, 0, 0.00456277, 0.00521833, 0.823613, 0.00421935, 15.7154, 70.8263, 59.5741
";

    /// Accepts only word widths of at least `accept_from` bits.
    pub(crate) struct FakeEngine {
        pub accept_from: usize,
        pub widths: RefCell<Vec<usize>>,
    }

    impl FakeEngine {
        pub(crate) fn new(accept_from: usize) -> Self {
            Self {
                accept_from,
                widths: RefCell::new(Vec::new()),
            }
        }
    }

    impl CharacterizationEngine for FakeEngine {
        fn evaluate(&self, input: &EngineInput) -> Result<RawCharacterization, AttemptError> {
            self.widths.borrow_mut().push(input.output_width_bits);
            if input.output_width_bits < self.accept_from {
                return Err(AttemptError::Rejected);
            }
            parse_engine_line(SAMPLE_OUTPUT)
                .map_err(|_| AttemptError::Rejected)
        }
    }

    fn setup() -> (ProcessProfile, MemoryRequest) {
        let process = ProcessProfile::from_raw(&raw_45nm()).unwrap();
        let request = MemoryRequest::from_raw(&raw_memory("fakeram45_256x32", 32, 256)).unwrap();
        (process, request)
    }

    #[test]
    fn test_parse_engine_line() {
        let raw = parse_engine_line(SAMPLE_OUTPUT).unwrap();
        assert_eq!(raw.tech_node_nm, 45);
        assert_eq!(raw.associativity, 1);
        assert_relative_eq!(raw.access_time_ns, 0.272534);
        assert_relative_eq!(raw.cycle_time_ns, 0.189474);
        assert_relative_eq!(raw.dynamic_read_energy_nj, 0.00456277);
        assert_relative_eq!(raw.dynamic_write_energy_nj, 0.00521833);
        assert_relative_eq!(raw.leakage_mw, 0.823613);
        assert_relative_eq!(raw.fo4_ps, 15.7154);
        assert_relative_eq!(raw.width_um, 70.8263);
        assert_relative_eq!(raw.height_um, 59.5741);

        assert!(parse_engine_line("").is_err());
        assert!(parse_engine_line("45, 1024, 1").is_err());
        assert!(parse_engine_line("45, 1024, 1, 32, fast, 0.1, 0, 0, 0, 0, 0, 0, 1, 1").is_err());
    }

    #[test]
    fn test_accepted_on_first_attempt() {
        let (process, request) = setup();
        let engine = FakeEngine::new(0);
        let dir = tempfile::tempdir().unwrap();
        let search = CactiSearch::new(&engine, WideningPolicy::default(), dir.path());
        let result = search.characterize(&process, &request).unwrap();

        assert_eq!(*engine.widths.borrow(), vec![32]);
        assert_eq!(result.fed_width_bits, 32);
        assert_relative_eq!(result.width_um, 70.8263);
    }

    #[test]
    fn test_widening_rescales_width() {
        let (process, request) = setup();
        let engine = FakeEngine::new(40);
        let dir = tempfile::tempdir().unwrap();
        let search = CactiSearch::new(&engine, WideningPolicy::default(), dir.path());
        let result = search.characterize(&process, &request).unwrap();

        assert_eq!(*engine.widths.borrow(), vec![32, 40]);
        assert_eq!(result.fed_width_bits, 40);
        assert_eq!(request.width_bits, 32);
        assert_relative_eq!(result.width_um, 70.8263 * 32.0 / 40.0, max_relative = 1e-12);
        assert_relative_eq!(result.height_um, 59.5741);
    }

    #[test]
    fn test_search_is_bounded() {
        let (process, request) = setup();
        let engine = FakeEngine::new(usize::MAX);
        let dir = tempfile::tempdir().unwrap();
        let search = CactiSearch::new(&engine, WideningPolicy::default(), dir.path());
        let err = search.characterize(&process, &request).unwrap_err();

        assert_eq!(*engine.widths.borrow(), vec![32, 40, 48]);
        assert!(matches!(
            err,
            CharacterizationError::Exhausted {
                original: 32,
                last: 48,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_engine_binary() {
        let (process, request) = setup();
        let cacti_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        let engine = CactiEngine::new(cacti_dir.path());
        let search = CactiSearch::new(&engine, WideningPolicy::default(), work_dir.path());
        let err = search.characterize(&process, &request).unwrap_err();
        assert!(matches!(err, CharacterizationError::EngineNotFound(_)));
    }

    #[test]
    fn test_render_engine_input() {
        let input = EngineInputBuilder::default()
            .name("fakeram45_256x32")
            .work_dir("/tmp")
            .total_size_bytes(1024)
            .block_size_bytes(4)
            .rw_ports(1)
            .r_ports(0)
            .w_ports(0)
            .tech_um(0.045)
            .output_width_bits(32)
            .num_banks(1)
            .cache_type("cache")
            .build()
            .unwrap();
        let cfg = render_engine_input(&input).unwrap();
        assert!(cfg.contains("-size (bytes) 1024"));
        assert!(cfg.contains("-block size (bytes) 4"));
        assert!(cfg.contains("-read-write port 1"));
        assert!(cfg.contains("-technology (u) 0.045"));
        assert!(cfg.contains("-output/input bus width 32"));
        assert!(cfg.contains("-UCA bank count 1"));
        assert!(cfg.contains("-cache type \"cache\""));
    }
}
