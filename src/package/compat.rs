//! Host application compatibility checks.

use log::warn;
use semver::Version;

use super::PackageError;
use super::query::parse_constraints;
use super::record::PackageRecord;

/// The application packages are installed for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostApp {
    pub name: String,
    pub version: Option<String>,
}

impl HostApp {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    pub fn version_str(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }
}

/// Decides whether a package may be used by the configured host.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityGate {
    host: HostApp,
}

impl CompatibilityGate {
    pub fn new(host: HostApp) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &HostApp {
        &self.host
    }

    /// A package without a compatibility map runs anywhere. A package that
    /// has one but does not list this host, or lists it with an empty range,
    /// is incompatible. So is any package checked against a host whose
    /// version is unknown.
    pub fn is_compatible(&self, record: &PackageRecord) -> bool {
        let compatibility = record.compatibility();
        if compatibility.is_empty() || self.host.name.is_empty() {
            return true;
        }

        let Some(range) = compatibility.get(&self.host.name) else {
            return false;
        };
        if range.trim().is_empty() {
            return false;
        }

        let host_version = match self.host.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => return false,
        };
        let host_version = match Version::parse(host_version) {
            Ok(v) => v,
            Err(e) => {
                warn!("Host version {:?} is not valid semver: {}", host_version, e);
                return false;
            }
        };

        // Ranges are validated in `PackageRecord::new`
        parse_constraints(range)
            .is_ok_and(|constraints| constraints.iter().all(|c| c.allows(&host_version)))
    }

    /// Human readable requirement of `record` for error messages.
    pub fn requirement(&self, record: &PackageRecord) -> String {
        match record.compatibility().get(&self.host.name) {
            Some(range) => format!("{} {}", self.host.name, range),
            None => record
                .compatibility()
                .iter()
                .map(|(host, range)| format!("{} {}", host, range))
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }

    /// Fails with [`PackageError::PackageNotCompatible`] unless compatible.
    pub fn check(&self, record: &PackageRecord) -> Result<(), PackageError> {
        if self.is_compatible(record) {
            return Ok(());
        }
        Err(PackageError::PackageNotCompatible {
            package: record.to_string(),
            host_name: self.host.name.clone(),
            host_version: self.host.version_str().to_string(),
            required: self.requirement(record),
        })
    }
}
