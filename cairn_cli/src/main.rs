use std::path::PathBuf;

use anyhow::Context;
use cairn_core::Hash;
use clap::{ArgAction, Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;

use crate::cmd::config::CmdConfig;

mod cmd;
mod config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the per-user default
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Modify the cairn config
    Config {
        #[command(subcommand)]
        cmd: CmdConfig,
    },
    /// Store and inspect DAG nodes
    Block {
        #[command(subcommand)]
        cmd: BlockCmd,
    },
    /// Protect blocks from garbage collection
    Pin {
        #[command(subcommand)]
        cmd: PinCmd,
    },
    /// Delete every block that is not pinned
    Gc {
        /// Also keep this node and whatever can still be resolved below it
        #[arg(long = "best-effort", value_name = "HASH")]
        best_effort: Vec<Hash>,
        /// Only print errors
        #[arg(short, long, action = ArgAction::SetTrue)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum BlockCmd {
    /// Store a file as a DAG node and print its key
    Put {
        path: PathBuf,
        /// Key of a child node (repeatable, order is kept)
        #[arg(short, long = "link", value_name = "HASH")]
        links: Vec<Hash>,
    },
    /// Print a node's links and write its data out
    Get {
        hash: Hash,
        /// Write the node data to this file instead of stdout
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// List every stored key
    Ls,
}

#[derive(Subcommand)]
enum PinCmd {
    /// Pin a node recursively (or only itself with --direct)
    Add {
        hash: Hash,
        #[arg(long, action = ArgAction::SetTrue)]
        direct: bool,
    },
    /// Remove a recursive pin (or a direct one with --direct)
    Rm {
        hash: Hash,
        #[arg(long, action = ArgAction::SetTrue)]
        direct: bool,
    },
    /// List pinned keys
    Ls {
        /// recursive, direct, indirect or all
        #[arg(short = 't', long = "type", default_value = "all")]
        filter: cairn_pin::PinFilter,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    // Configs under ~/.config/cairn/cairn.toml, data under ~/.local/share/cairn/
    let dirs =
        ProjectDirs::from("", "", "cairn").context("failed to determine config directory path")?;
    let config_file = cli
        .config
        .unwrap_or_else(|| dirs.config_dir().join(config::CONFIG_FILE_NAME));

    cmd::run_command(config_file, dirs.data_dir(), cli.cmd).await
}
