// src/packages/pkginfo.rs

//! Translation from the local database descriptor to `.PKGINFO`
//!
//! The local database stores package metadata as `%KEY%` marker lines, each
//! followed by zero or more value lines:
//!
//! ```text
//! %NAME%
//! gzip
//!
//! %DEPENDS%
//! glibc
//! bash
//! ```
//!
//! Package archives carry the same data as `key = value` lines, one per
//! value, under partly different key names. Install-time fields
//! (`installdate`, `validation`) have no meaning inside an archive and are
//! dropped.

use tracing::debug;

/// Database key → archive key, compared case-insensitively
///
/// Keys missing from this table pass through lower-cased.
pub const KEY_MAP: &[(&str, &str)] = &[
    ("name", "pkgname"),
    ("version", "pkgver"),
    ("desc", "pkgdesc"),
    ("groups", "group"),
    ("depends", "depend"),
    ("optdepends", "optdepend"),
    ("conflicts", "conflict"),
];

/// Archive keys that only describe the installation and are never emitted
pub const DROPPED_KEYS: &[&str] = &["installdate", "validation"];

/// Synthetic marker carrying the backup list
pub const BACKUP_KEY: &str = "BACKUP";

/// Resolve the archive key for a database marker key
pub fn archive_key(marker: &str) -> String {
    let folded = marker.to_ascii_lowercase();
    KEY_MAP
        .iter()
        .find(|(from, _)| *from == folded)
        .map(|(_, to)| to.to_string())
        .unwrap_or(folded)
}

/// Marker key of a `%KEY%` line, if the line is one
fn marker_key(line: &str) -> Option<&str> {
    line.strip_prefix('%')
        .and_then(|rest| rest.strip_suffix('%'))
        .filter(|key| !key.is_empty() && !key.contains('%'))
}

/// One marker and the value lines that follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub key: String,
    pub values: Vec<String>,
}

impl RawField {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            values: Vec::new(),
        }
    }
}

/// Parser position within a descriptor
enum ParseState {
    /// No marker seen yet; stray value lines are discarded
    AwaitingMarker,
    /// Value lines belong to `field`
    AccumulatingValue { field: RawField },
}

/// Parsed local database descriptor, fields in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDescriptor {
    fields: Vec<RawField>,
}

impl RawDescriptor {
    /// Parse `%KEY%` / value blocks; empty lines are discarded first
    pub fn parse(content: &str) -> Self {
        let mut fields = Vec::new();
        let mut state = ParseState::AwaitingMarker;

        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            if let Some(key) = marker_key(line.trim()) {
                if let ParseState::AccumulatingValue { field } =
                    std::mem::replace(&mut state, ParseState::AwaitingMarker)
                {
                    fields.push(field);
                }
                state = ParseState::AccumulatingValue {
                    field: RawField::new(key),
                };
                continue;
            }

            match &mut state {
                ParseState::AwaitingMarker => {
                    debug!("Discarding value line before any marker: {}", line);
                }
                ParseState::AccumulatingValue { field } => field.values.push(line.to_string()),
            }
        }

        if let ParseState::AccumulatingValue { field } = state {
            fields.push(field);
        }

        Self { fields }
    }

    /// Append the backup list as a trailing synthetic `%BACKUP%` field
    pub fn with_backup(mut self, backup: &[String]) -> Self {
        self.fields.push(RawField {
            key: BACKUP_KEY.to_string(),
            values: backup.to_vec(),
        });
        self
    }

    pub fn fields(&self) -> &[RawField] {
        &self.fields
    }
}

/// A single `key = value` line of `.PKGINFO`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorLine {
    pub key: String,
    pub value: String,
}

/// The archive-native package descriptor (`.PKGINFO`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    lines: Vec<DescriptorLine>,
}

impl ArchiveDescriptor {
    /// Translate a database descriptor, keeping field and value order
    pub fn translate(raw: &RawDescriptor) -> Self {
        let mut lines: Vec<DescriptorLine> = raw
            .fields()
            .iter()
            .flat_map(|field| {
                let key = archive_key(&field.key);
                field.values.iter().map(move |value| DescriptorLine {
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect();

        lines.retain(|line| !DROPPED_KEYS.contains(&line.key.as_str()));
        Self { lines }
    }

    pub fn lines(&self) -> &[DescriptorLine] {
        &self.lines
    }

    /// First value recorded for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.key == key)
            .map(|line| line.value.as_str())
    }

    /// All values recorded for `key`, in order
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.lines
            .iter()
            .filter(move |line| line.key == key)
            .map(|line| line.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lines.iter().any(|line| line.key == key)
    }

    /// Render as `.PKGINFO` text
    pub fn render(&self) -> String {
        let mut out = format!("# Generated by pacrepack {}\n", env!("CARGO_PKG_VERSION"));
        for line in &self.lines {
            out.push_str(&line.key);
            out.push_str(" = ");
            out.push_str(&line.value);
            out.push('\n');
        }
        out
    }
}
