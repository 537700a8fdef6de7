// src/packages/mod.rs

//! Installed-package sources for reassembly
//!
//! Reads what pacman already knows about an installed package (its local
//! database record and owned files) and turns it into archive members.

pub mod file_set;
pub mod local_db;
pub mod pacman_query;
pub mod pkginfo;

pub use file_set::{FileManifest, DESCRIPTOR_MEMBER};
pub use local_db::{read_record, ArtifactKind, ArtifactSet, LocalRecord, PackageRecord};
pub use pacman_query::{PackageManager, Pacman};
pub use pkginfo::{ArchiveDescriptor, RawDescriptor};
