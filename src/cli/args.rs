use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// Path to a JSON or TOML configuration file.
    #[arg(short, long, default_value = "fakeram.json")]
    pub config: PathBuf,

    /// Directory under which one folder per memory is created.
    #[arg(short, long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Directory containing the CACTI executable.
    #[arg(long, env = "CACTI_BUILD_DIR")]
    pub cacti_dir: Option<PathBuf>,

    /// Generate LEF (used in place and route).
    #[arg(long)]
    pub lef: bool,

    /// Generate LIB (setup, hold, and delay timing information).
    #[arg(long)]
    pub lib: bool,

    /// Generate the behavioral and black box Verilog models.
    #[arg(long)]
    pub verilog: bool,

    /// Generate every view. This is the default when no view is selected.
    #[arg(short, long)]
    pub all: bool,
}
