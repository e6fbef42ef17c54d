mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "nsqwire", version, about = "NSQ wire protocol client")]
struct Cli {
    /// Output format. Defaults to pretty on a terminal, json otherwise.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "NSQWIRE_LOG_LEVEL",
        global = true
    )]
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
    fn parses_pub_subcommand() {
        let cli = Cli::try_parse_from([
            "nsqwire",
            "pub",
            "127.0.0.1:4150",
            "events",
            "--data",
            "hello",
            "--timeout",
            "500ms",
        ])
        .expect("pub args should parse");

        match cli.command {
            Command::Pub(args) => {
                assert_eq!(args.topic, "events");
                assert_eq!(args.conn.timeout, "500ms");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pub_requires_a_payload() {
        let err = Cli::try_parse_from(["nsqwire", "pub", "127.0.0.1:4150", "events"])
            .expect_err("missing payload should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "nsqwire",
            "pub",
            "127.0.0.1:4150",
            "events",
            "--data",
            "hello",
            "--file",
            "/tmp/body",
        ])
        .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn mpub_collects_repeated_data() {
        let cli = Cli::try_parse_from([
            "nsqwire", "mpub", "nsqd:4150", "events", "--data", "a", "--data", "b",
        ])
        .expect("mpub args should parse");

        match cli.command {
            Command::Mpub(args) => assert_eq!(args.data, vec!["a", "b"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn check_name_needs_names() {
        let err = Cli::try_parse_from(["nsqwire", "check-name"]).expect_err("no names");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
