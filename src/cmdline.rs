//! Command-line argument parsing for the compiler driver.

use argh::FromArgs;
use std::path::{Path, PathBuf};

#[derive(FromArgs)]
/// The flow graph compiler
pub struct Opts {
    /// input flow file
    #[argh(positional, from_str_fn(read_path))]
    pub file: PathBuf,

    /// output file; defaults to stdout
    #[argh(option, short = 'o')]
    pub output: Option<PathBuf>,

    /// batch size substituted for unknown leading dimensions
    #[argh(option, default = "1")]
    pub batch_size: i32,

    /// operation type to eliminate as a no-op; can be given repeatedly
    #[argh(option, long = "noop")]
    pub noops: Vec<String>,

    /// fusion rule of the form `First:Second:Combined`; can be given
    /// repeatedly
    #[argh(option, long = "combine")]
    pub combinations: Vec<String>,

    /// print the IR after analysis
    #[argh(switch, long = "dump-ir")]
    pub dump_ir: bool,

    /// verify graph consistency after analysis
    #[argh(switch)]
    pub check: bool,

    /// set the log level
    #[argh(option, long = "log-level", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

impl Opts {
    /// Parse the command line.
    pub fn get_opts() -> Self {
        argh::from_env()
    }
}

fn read_path(path: &str) -> Result<PathBuf, String> {
    Ok(Path::new(path).into())
}
