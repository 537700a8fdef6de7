// src/cli.rs
//! CLI definitions for pacrepack
//!
//! Flags given here override the configuration file.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pacrepack")]
#[command(version)]
#[command(about = "Rebuild pacman packages from the installed system", long_about = None)]
pub struct Cli {
    /// Packages to reassemble
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Directory to write archives into
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Maximum number of packages reassembled at once
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Show archiver diagnostics and more logging (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Compression codec: none, gz, xz, zst
    #[arg(short, long, value_name = "CODEC")]
    pub compression: Option<String>,

    /// Archive backend: native or bsdtar
    #[arg(long, value_name = "BACKEND")]
    pub archiver: Option<String>,

    /// Alternate pacman database location
    #[arg(short = 'b', long, value_name = "PATH")]
    pub dbpath: Option<PathBuf>,

    /// Alternate installation root
    #[arg(short, long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Parent directory for temporary workspaces
    #[arg(long, value_name = "DIR")]
    pub tmpdir: Option<PathBuf>,

    /// Configuration file (default: /etc/pacrepack.toml if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
