use clap::{ArgGroup, Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod check;
pub mod publish;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish one message to a topic.
    Pub(PubArgs),
    /// Publish several messages to a topic in one command.
    Mpub(MpubArgs),
    /// Check topic and channel names.
    CheckName(CheckNameArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Pub(args) => publish::run_pub(args, format),
        Command::Mpub(args) => publish::run_mpub(args, format),
        Command::CheckName(args) => check::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection options shared by the publishing commands.
#[derive(Args, Debug)]
pub struct ConnArgs {
    /// Daemon address (host:port or [v6]:port). Port defaults to 4150.
    pub addr: String,
    /// Connect, read and write timeout (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
    /// Send IDENTIFY with this client id before publishing.
    #[arg(long, env = "NSQWIRE_CLIENT_ID")]
    pub client_id: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["data", "file"])))]
pub struct PubArgs {
    #[command(flatten)]
    pub conn: ConnArgs,
    /// Topic to publish to.
    pub topic: String,
    /// Message body.
    #[arg(long)]
    pub data: Option<String>,
    /// Read the message body from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["data", "file"])))]
pub struct MpubArgs {
    #[command(flatten)]
    pub conn: ConnArgs,
    /// Topic to publish to.
    pub topic: String,
    /// Message body; repeat for each message.
    #[arg(long)]
    pub data: Vec<String>,
    /// Read one message per line from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckNameArgs {
    /// Names to check.
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
