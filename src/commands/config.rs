use anyhow::{Context, Result, bail};
use log::debug;
use std::path::PathBuf;

use crate::package::{HostApp, PackageError};
use crate::runtime::Runtime;

use super::paths::default_root;

/// Resolved settings shared by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root: PathBuf,
    pub host: HostApp,
}

impl Config {
    /// Resolve the data root and the host application.
    ///
    /// `root` falls back to `~/.hangar`. An explicitly empty root is a
    /// configuration error, as is a host version that is not semver.
    pub fn new<R: Runtime>(
        runtime: &R,
        root: Option<PathBuf>,
        app_name: Option<String>,
        app_version: Option<String>,
    ) -> Result<Self> {
        let root = match root {
            Some(path) if path.as_os_str().is_empty() => {
                bail!(PackageError::InvalidDataPath(path))
            }
            Some(path) => path,
            None => default_root(runtime)?,
        };
        debug!("Using data root: {:?}", root);

        let app_version = app_version.filter(|v| !v.trim().is_empty());
        if let Some(version) = &app_version {
            semver::Version::parse(version)
                .with_context(|| format!("Invalid application version {:?}", version))?;
        }

        Ok(Self {
            root,
            host: HostApp::new(app_name.unwrap_or_default(), app_version),
        })
    }

    /// `<root>/packages`
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    /// `<root>/cache`
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }
}
