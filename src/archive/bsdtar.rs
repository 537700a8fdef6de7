// src/archive/bsdtar.rs

//! Archiver backed by the system `bsdtar`
//!
//! bsdtar writes an uncompressed stream to stdout which is compressed
//! in-process, so codec selection works the same as for the native backend.
//! Unreadable members are only visible through bsdtar's diagnostic text.

use super::{ArchiveReport, ArchiveRequest, Archiver, SkippedMember};
use crate::compression::create_encoder;
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Diagnostic text bsdtar prints for unreadable members
const PERMISSION_DENIED: &str = "Permission denied";

/// `bsdtar -cnf - --uid 0 --gid 0 -T <list>` driver
#[derive(Debug, Clone)]
pub struct BsdtarArchiver {
    program: PathBuf,
}

impl Default for BsdtarArchiver {
    fn default() -> Self {
        Self {
            program: PathBuf::from("bsdtar"),
        }
    }
}

impl BsdtarArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific bsdtar binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Archiver for BsdtarArchiver {
    fn name(&self) -> &'static str {
        "bsdtar"
    }

    fn create(&self, request: &ArchiveRequest<'_>) -> Result<ArchiveReport> {
        if request.root != Path::new("/") {
            return Err(Error::Config(
                "the bsdtar archiver only supports the host root '/'".to_string(),
            ));
        }

        let assembly_failed = |reason: String| Error::AssemblyFailed {
            package: request.package.to_string(),
            reason,
        };

        let mut child = Command::new(&self.program)
            .args(["-cnf", "-", "--uid", "0", "--gid", "0", "--uname", "root", "--gname", "root"])
            .arg("-T")
            .arg(request.list_file)
            .current_dir(request.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| assembly_failed(format!("failed to run {}: {}", self.program.display(), e)))?;

        let (Some(mut stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(assembly_failed("bsdtar pipes unavailable".to_string()));
        };

        // Drain stderr concurrently so a chatty bsdtar cannot block on a full pipe.
        // The child is reaped on every path, including a failed output file.
        let echo = (request.verbosity >= 1).then_some(request.progress);
        let (written, status, report) = thread::scope(|scope| {
            let diagnostics = scope.spawn(move || scan_diagnostics(BufReader::new(stderr), echo));
            let written = write_compressed(&mut stdout, request);
            drop(stdout);
            let status = child.wait();
            (written, status, diagnostics.join())
        });

        let report =
            report.map_err(|_| assembly_failed("bsdtar diagnostics reader panicked".to_string()))?;
        written?;
        let status = status?;

        debug!(
            "{}: bsdtar exited with {} ({} diagnostics)",
            request.package,
            status,
            report.skipped.len()
        );

        // A non-zero exit with per-member diagnostics means members were skipped
        // and the archive is still usable; without any it is a real failure
        if !status.success() && report.skipped.is_empty() {
            return Err(assembly_failed(format!("bsdtar exited with {}", status)));
        }
        Ok(report)
    }
}

/// Compress bsdtar's uncompressed stream into the output file
fn write_compressed<R: Read>(stream: &mut R, request: &ArchiveRequest<'_>) -> Result<()> {
    let file = File::create(request.output)?;
    let mut encoder = create_encoder(BufWriter::new(file), request.compression)?;
    io::copy(stream, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Collect skipped members from bsdtar's stderr, echoing lines when given a tracker
fn scan_diagnostics<R: BufRead>(reader: R, echo: Option<&dyn ProgressTracker>) -> ArchiveReport {
    let mut report = ArchiveReport::default();
    for line in reader.lines().map_while(|line| line.ok()) {
        if let Some(progress) = echo {
            progress.println(&line);
        }
        if line.contains(PERMISSION_DENIED) {
            report.permission_denied = true;
        }
        if let Some(skipped) = parse_diagnostic(&line) {
            report.skipped.push(skipped);
        }
    }
    report
}

/// Parse `bsdtar: <path>: <message>`
fn parse_diagnostic(line: &str) -> Option<SkippedMember> {
    let rest = line.strip_prefix("bsdtar: ")?;
    let (path, reason) = rest.rsplit_once(": ")?;
    Some(SkippedMember {
        path: path.to_string(),
        reason: reason.to_string(),
    })
}
