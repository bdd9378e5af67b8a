use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;
use smlpipe_delivery::Shutdown;

pub mod dump;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the meter and forward readings to the configured sinks.
    Run(RunArgs),
    /// Print decoded readings straight from the meter or a capture.
    Dump(DumpArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, verbose: u8) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, verbose),
        Command::Dump(args) => dump::run(args, verbose),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE", env = "SMLPIPE_CONFIG")]
    pub config: PathBuf,
    /// Serial device, overriding the config file.
    #[arg(long, short = 'd', value_name = "PATH")]
    pub device: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Serial device to read.
    #[arg(
        long,
        short = 'd',
        value_name = "PATH",
        conflicts_with = "replay",
        required_unless_present = "replay"
    )]
    pub device: Option<PathBuf>,
    /// Read a captured byte stream instead of a device; stops at its end.
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,
    /// Exit after N frames.
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
    /// Output format.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,
    /// Line speed of the serial device.
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
    /// Skip transport checksum verification.
    #[arg(long)]
    pub no_crc: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Trigger `shutdown` on Ctrl-C.
fn install_ctrlc_handler(shutdown: Shutdown) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.trigger()).map_err(|err| {
        CliError::new(
            INTERNAL,
            crate::exit::ERR_INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
