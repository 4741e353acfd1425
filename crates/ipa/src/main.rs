mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ipa", version, about = "Interactive path analysis client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_subcommand() {
        let cli = Cli::try_parse_from([
            "ipa",
            "paths",
            "--port",
            "61555",
            "--path-num",
            "20",
            "--path-type",
            "hold",
            "--flat",
        ])
        .expect("paths args should parse");

        match cli.command {
            Command::Paths(args) => {
                assert_eq!(args.port, 61555);
                assert_eq!(args.path_num, 20);
                assert_eq!(args.path_type, "hold");
                assert!(args.flat);
                assert_eq!(args.timeout, "5s");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_path_type() {
        let err = Cli::try_parse_from(["ipa", "paths", "--port", "1", "--path-type", "recovery"])
            .expect_err("unknown path type should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn highlight_requires_items() {
        let err = Cli::try_parse_from(["ipa", "highlight", "--port", "1"])
            .expect_err("missing items should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ipa",
            "watch",
            "--port",
            "1",
            "--count",
            "3",
            "--log-level",
            "debug",
            "--format",
            "json",
        ])
        .expect("watch args should parse");
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Watch(_)));
    }
}
