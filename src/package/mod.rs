//! Package management module
//!
//! Installed packages and cached downloads both live in a directory with one
//! subdirectory per package identity. This module parses version queries,
//! loads those directories, gates packages on host compatibility and picks
//! the best candidate for a query. Package directories are packed into
//! archives by [`build_package`].

mod build;
mod cache;
mod compat;
mod error;
mod meta;
mod query;
mod record;
mod set;
mod staging;

pub use build::{BuiltArchive, DIST_DIR, archive_stem, build_package};
pub use cache::CacheStore;
pub use compat::{CompatibilityGate, HostApp};
pub use error::PackageError;
pub use meta::{ArchiveRef, JsonCodec, META_FILENAME, MetadataCodec, PackageMeta};
pub use query::{Constraint, Op, VersionQuery, parse_constraints, precedence};
pub use record::{PackageRecord, compute_ident};
pub use set::PackageSet;
pub use staging::TMP_SUFFIX;
