// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("pacrepack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rebuild pacman packages from the installed system")
        .arg(
            Arg::new("packages")
                .required(true)
                .num_args(1..)
                .value_name("PACKAGE")
                .help("Packages to reassemble"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory to write archives into"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .help("Maximum number of packages reassembled at once"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Show archiver diagnostics and more logging (repeat for debug output)"),
        )
        .arg(
            Arg::new("compression")
                .short('c')
                .long("compression")
                .value_name("CODEC")
                .help("Compression codec: none, gz, xz, zst"),
        )
        .arg(
            Arg::new("archiver")
                .long("archiver")
                .value_name("BACKEND")
                .help("Archive backend: native or bsdtar"),
        )
        .arg(
            Arg::new("dbpath")
                .short('b')
                .long("dbpath")
                .value_name("PATH")
                .help("Alternate pacman database location"),
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("PATH")
                .help("Alternate installation root"),
        )
        .arg(
            Arg::new("tmpdir")
                .long("tmpdir")
                .value_name("DIR")
                .help("Parent directory for temporary workspaces"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: /etc/pacrepack.toml if present)"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pacrepack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
