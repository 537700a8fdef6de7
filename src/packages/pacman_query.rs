// src/packages/pacman_query.rs

//! Query installed pacman packages from the system database
//!
//! The reassembly engine only needs two answers from the package manager:
//! which version of a package is installed, and which paths it owns. Both
//! sit behind the [`PackageManager`] trait so the engine can run against a
//! fake database in tests; [`Pacman`] answers them with the `pacman` tool.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::debug;

/// Package manager queries consumed by the reassembly engine
pub trait PackageManager: Send + Sync {
    /// Installed version string for `name`, or `None` when not installed
    fn installed_version(&self, name: &str) -> Result<Option<String>>;

    /// Every path owned by `name`, one absolute path per entry
    ///
    /// Directories keep their trailing `/`, as pacman lists them.
    fn owned_files(&self, name: &str) -> Result<Vec<String>>;
}

/// `pacman` command-line backend
#[derive(Debug, Clone, Default)]
pub struct Pacman {
    dbpath: Option<PathBuf>,
    root: Option<PathBuf>,
}

impl Pacman {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query an alternate database location (`--dbpath`)
    pub fn with_dbpath(mut self, dbpath: impl Into<PathBuf>) -> Self {
        self.dbpath = Some(dbpath.into());
        self
    }

    /// Query an alternate installation root (`--root`)
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn run(&self, package: &str, args: &[&str]) -> Result<Output> {
        let mut command = Command::new("pacman");
        if let Some(dbpath) = &self.dbpath {
            command.arg("--dbpath").arg(dbpath);
        }
        if let Some(root) = &self.root {
            command.arg("--root").arg(root);
        }
        command
            .args(args)
            .arg(package)
            .output()
            .map_err(|e| Error::ManagerQueryFailed {
                package: package.to_string(),
                reason: format!("failed to run pacman: {}. Is pacman installed?", e),
            })
    }
}

impl PackageManager for Pacman {
    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        debug!("Querying installed version: {}", name);

        let output = self.run(name, &["-Q"])?;
        if !output.status.success() {
            // pacman exits non-zero for packages that are not installed
            return Ok(None);
        }

        let version = parse_version_line(&String::from_utf8_lossy(&output.stdout), name);
        if version.is_none() {
            debug!("{} resolved to a different installed package, treating as not installed", name);
        }
        Ok(version)
    }

    fn owned_files(&self, name: &str) -> Result<Vec<String>> {
        debug!("Querying files for package: {}", name);

        let output = self.run(name, &["-Qlq"])?;
        if !output.status.success() {
            return Err(Error::ManagerQueryFailed {
                package: name.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let files = parse_file_list(&String::from_utf8_lossy(&output.stdout));
        debug!("Found {} paths for package {}", files.len(), name);
        Ok(files)
    }
}

/// Parse `pacman -Q` output ("name version") into the version of `name`
///
/// pacman answers a query for a provided name (`sh`) with the providing
/// package (`bash 5.2-1`); that line does not count as `name` being installed.
fn parse_version_line(output: &str, name: &str) -> Option<String> {
    let mut fields = output.lines().next()?.split_whitespace();
    if fields.next()? != name {
        return None;
    }
    fields.next().map(str::to_string)
}

/// Parse `pacman -Qlq` output into owned paths
fn parse_file_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_line() {
        assert_eq!(parse_version_line("gzip 1.10-1\n", "gzip"), Some("1.10-1".to_string()));
        assert_eq!(
            parse_version_line("linux-firmware 20240312.3b128b60-1\n", "linux-firmware"),
            Some("20240312.3b128b60-1".to_string())
        );
        assert_eq!(parse_version_line("", "gzip"), None);
        assert_eq!(parse_version_line("gzip", "gzip"), None);
    }

    #[test]
    fn test_parse_version_line_provider_is_not_installed() {
        assert_eq!(parse_version_line("bash 5.2.026-2\n", "sh"), None);
        assert_eq!(parse_version_line("gzip-utils 1.0-1\n", "gzip"), None);
    }

    #[test]
    fn test_parse_file_list() {
        let output = "/usr/\n/usr/bin/\n/usr/bin/gzip\n\n/usr/share/man/man1/gzip.1.gz\n";
        let files = parse_file_list(output);
        assert_eq!(
            files,
            vec![
                "/usr/",
                "/usr/bin/",
                "/usr/bin/gzip",
                "/usr/share/man/man1/gzip.1.gz"
            ]
        );
    }

    #[test]
    fn test_pacman_builder() {
        let pacman = Pacman::new().with_dbpath("/tmp/db").with_root("/mnt");
        assert_eq!(pacman.dbpath, Some(PathBuf::from("/tmp/db")));
        assert_eq!(pacman.root, Some(PathBuf::from("/mnt")));
    }
}
