mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use clap::{ArgAction, Parser};

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "smlpipe", version, about = "Smart meter SML reader")]
struct Cli {
    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        global = true,
        env = "SMLPIPE_LOG_FORMAT"
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        env = "SMLPIPE_LOG_LEVEL"
    )]
    log_level: LogLevel,

    /// More output: -v debug logs and frame hex dumps, -vv trace logs.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit::USAGE
            } else {
                exit::SUCCESS
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.log_format, cli.log_level.with_verbosity(cli.verbose));

    match cmd::run(cli.command, cli.verbose) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{}", err.fatal_line(chrono::Local::now()));
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "smlpipe",
            "run",
            "--config",
            "/etc/smlpipe.toml",
            "--device",
            "/dev/ttyUSB1",
        ])
        .expect("run args should parse");

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.device.unwrap().to_str(), Some("/dev/ttyUSB1"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn counts_verbosity_after_subcommand() {
        let cli = Cli::try_parse_from(["smlpipe", "dump", "--replay", "cap.bin", "-vv"])
            .expect("dump args should parse");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level.with_verbosity(cli.verbose), LogLevel::Trace);
    }

    #[test]
    fn dump_requires_a_source() {
        let err = Cli::try_parse_from(["smlpipe", "dump"]).expect_err("missing source should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_conflicting_sources() {
        let err = Cli::try_parse_from([
            "smlpipe",
            "dump",
            "--device",
            "/dev/ttyUSB0",
            "--replay",
            "cap.bin",
        ])
        .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_json_log_format() {
        let cli = Cli::try_parse_from(["smlpipe", "--log-format", "json", "version"])
            .expect("version args should parse");
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Command::Version(_)));
    }
}
