use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::PackageError;
use super::query::parse_constraints;

/// Well-known name of the metadata file inside every package directory.
pub const META_FILENAME: &str = "meta.json";

/// Package metadata as stored in `meta.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Host application name -> semver range, e.g. `{"host": ">=1.0.0"}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compatibility: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveRef>,
}

/// Reference to the archive a cached package was obtained from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl PackageMeta {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_compatibility(mut self, host: impl Into<String>, range: impl Into<String>) -> Self {
        self.compatibility.insert(host.into(), range.into());
        self
    }

    /// Check the fields every package must carry.
    pub fn validate(&self) -> Result<(), PackageError> {
        let corrupt = |reason: String| PackageError::MetadataCorrupt(reason);

        if self.name.trim().is_empty() {
            return Err(corrupt("missing package name".into()));
        }
        semver::Version::parse(&self.version).map_err(|e| {
            corrupt(format!(
                "{}: invalid version {:?}: {}",
                self.name, self.version, e
            ))
        })?;
        for (host, range) in &self.compatibility {
            parse_constraints(range).map_err(|e| {
                corrupt(format!(
                    "{}: invalid compatibility range for {}: {}",
                    self.name, host, e
                ))
            })?;
        }
        Ok(())
    }
}

/// Reads and writes the per-package metadata file.
#[cfg_attr(test, mockall::automock)]
pub trait MetadataCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PackageMeta>;
    fn encode(&self, meta: &PackageMeta) -> Result<Vec<u8>>;
}

/// JSON metadata codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl MetadataCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PackageMeta> {
        let meta: PackageMeta = serde_json::from_slice(bytes)
            .map_err(|e| PackageError::MetadataCorrupt(e.to_string()))?;
        meta.validate()?;
        Ok(meta)
    }

    fn encode(&self, meta: &PackageMeta) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(meta)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrupt(result: Result<PackageMeta>) -> bool {
        matches!(
            result.unwrap_err().downcast_ref::<PackageError>(),
            Some(PackageError::MetadataCorrupt(_))
        )
    }

    #[test]
    fn test_decode_minimal() {
        let meta = JsonCodec
            .decode(br#"{"name": "abc", "version": "1.0.0"}"#)
            .unwrap();
        assert_eq!(meta, PackageMeta::new("abc", "1.0.0"));
        assert!(meta.compatibility.is_empty());
        assert!(meta.archive.is_none());
    }

    #[test]
    fn test_decode_full() {
        let meta = JsonCodec
            .decode(
                br#"{
                    "name": "abc",
                    "version": "2.1.0-rc.1",
                    "description": "A test package",
                    "license": "MIT",
                    "compatibility": {"host": ">=1.0.0,<2.0.0"},
                    "archive": {"filename": "abc-2.1.0.tar.gz", "checksum": "00ff"}
                }"#,
            )
            .unwrap();
        assert_eq!(meta.description.as_deref(), Some("A test package"));
        assert_eq!(meta.compatibility["host"], ">=1.0.0,<2.0.0");
        assert_eq!(
            meta.archive,
            Some(ArchiveRef {
                filename: "abc-2.1.0.tar.gz".into(),
                checksum: Some("00ff".into()),
            })
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(corrupt(JsonCodec.decode(b"not json")));
        assert!(corrupt(JsonCodec.decode(br#"{"version": "1.0.0"}"#)));
        assert!(corrupt(JsonCodec.decode(br#"{"name": "", "version": "1.0.0"}"#)));
        assert!(corrupt(JsonCodec.decode(br#"{"name": "abc", "version": "one"}"#)));
        assert!(corrupt(JsonCodec.decode(
            br#"{"name": "abc", "version": "1.0.0", "compatibility": {"host": ">=x"}}"#
        )));
    }

    #[test]
    fn test_encode_skips_empty_fields() {
        let bytes = JsonCodec.encode(&PackageMeta::new("abc", "1.0.0")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"name\": \"abc\""));
        assert!(!text.contains("compatibility"));
        assert!(!text.contains("archive"));
    }

    #[test]
    fn test_encode_decode_preserves_compatibility() {
        let meta = PackageMeta::new("abc", "1.0.0").with_compatibility("host", ">=0.9.0");
        let decoded = JsonCodec.decode(&JsonCodec.encode(&meta).unwrap()).unwrap();
        assert_eq!(decoded, meta);
    }
}
