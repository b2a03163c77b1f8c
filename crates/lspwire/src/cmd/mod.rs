use clap::{Args, Subcommand};
use lspwire_frame::Charset;
use std::path::PathBuf;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the built-in calculator over stdio or a Unix socket.
    Serve(ServeArgs),
    /// Decode framed messages from a file or stdin.
    Decode(DecodeArgs),
    /// Frame one JSON-RPC message and write it to stdout.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Version(args) => version::run(args),
    }
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Unix socket path to listen on. Default: stdin/stdout.
    #[arg(long, value_name = "PATH", env = "LSPWIRE_SOCKET")]
    pub socket: Option<PathBuf>,
    /// Calls allowed to execute at once per connection.
    #[arg(long, default_value = "64", env = "LSPWIRE_MAX_CONCURRENT")]
    pub max_concurrent: usize,
    /// Body charset for outgoing messages (utf-8, utf8, utf-16, ...).
    #[arg(long, value_name = "NAME", env = "LSPWIRE_CHARSET")]
    pub charset: Option<Charset>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File containing framed messages. Default: stdin.
    pub file: Option<PathBuf>,
    /// Largest accepted body in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_content_length: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON-RPC message body.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the body from a file. Without --json or --file, stdin is used.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Body charset.
    #[arg(long, value_name = "NAME")]
    pub charset: Option<Charset>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
