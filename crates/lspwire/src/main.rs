mod calculator;
mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "lspwire", version, about = "Content-Length framed JSON-RPC tool")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "LSPWIRE_LOG_LEVEL",
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
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use lspwire_frame::Charset;

    use super::*;

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "lspwire",
            "serve",
            "--socket",
            "/tmp/lspwire.sock",
            "--max-concurrent",
            "4",
            "--charset",
            "utf-16",
        ])
        .expect("serve args should parse");

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.max_concurrent, 4);
                assert_eq!(args.charset, Some(Charset::Utf16Le));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_body_args() {
        let err = Cli::try_parse_from([
            "lspwire",
            "encode",
            "--json",
            "{}",
            "--file",
            "body.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_unknown_charset() {
        let err = Cli::try_parse_from(["lspwire", "encode", "--charset", "ebcdic"])
            .expect_err("unknown charset should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_decode_with_global_format() {
        let cli = Cli::try_parse_from(["lspwire", "decode", "frames.bin", "--format", "pretty"])
            .expect("decode args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Pretty)));
        assert!(matches!(cli.command, Command::Decode(_)));
    }
}
