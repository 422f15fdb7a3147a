use semver::Version;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::PackageError;
use super::meta::PackageMeta;

/// One installed or cached package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRecord {
    meta: PackageMeta,
    version: Version,
    ident: String,
    path: Option<PathBuf>,
}

/// The fields that make up a package's identity. Descriptions, licenses,
/// archive references and paths are deliberately absent.
#[derive(Serialize)]
struct IdentFields<'a> {
    name: &'a str,
    version: &'a str,
    compatibility: &'a BTreeMap<String, String>,
}

impl PackageRecord {
    pub fn new(meta: PackageMeta, path: Option<PathBuf>) -> Result<Self, PackageError> {
        meta.validate()?;
        let version = Version::parse(&meta.version)
            .map_err(|e| PackageError::MetadataCorrupt(e.to_string()))?;
        let ident = compute_ident(&meta);
        Ok(Self {
            meta,
            version,
            ident,
            path,
        })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn meta(&self) -> &PackageMeta {
        &self.meta
    }

    pub fn compatibility(&self) -> &BTreeMap<String, String> {
        &self.meta.compatibility
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.meta.name, self.version)
    }
}

/// Identity of a package: sha256 over the canonical JSON encoding of its
/// name, version and compatibility map.
pub fn compute_ident(meta: &PackageMeta) -> String {
    let fields = IdentFields {
        name: &meta.name,
        version: &meta.version,
        compatibility: &meta.compatibility,
    };
    // Serializing borrowed strings and a BTreeMap cannot fail.
    let canonical = serde_json::to_vec(&fields).unwrap_or_default();
    hex::encode(Sha256::digest(canonical))
}
