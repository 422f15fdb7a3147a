//! A directory of packages, one subdirectory per package identity.
//!
//! The directory is the source of truth: every mutation is followed by a
//! full rescan, and nothing in memory outlives a [`PackageSet::load`].

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveHandler;
use crate::runtime::Runtime;

use super::compat::{CompatibilityGate, HostApp};
use super::meta::{JsonCodec, META_FILENAME, MetadataCodec, PackageMeta};
use super::query::{VersionQuery, precedence};
use super::record::PackageRecord;
use super::staging::{Staging, TMP_SUFFIX, is_pending, pending_path};
use super::PackageError;

pub struct PackageSet<'a, R: Runtime, C: MetadataCodec = JsonCodec> {
    pub(super) runtime: &'a R,
    pub(super) codec: C,
    root: PathBuf,
    gate: CompatibilityGate,
    packages: BTreeMap<String, PackageRecord>,
}

impl<'a, R: Runtime> PackageSet<'a, R> {
    /// Open the package directory at `root` and load it.
    pub fn new(runtime: &'a R, root: impl Into<PathBuf>, host: HostApp) -> Result<Self> {
        Self::with_codec(runtime, root, host, JsonCodec)
    }
}

impl<'a, R: Runtime, C: MetadataCodec> PackageSet<'a, R, C> {
    pub fn with_codec(
        runtime: &'a R,
        root: impl Into<PathBuf>,
        host: HostApp,
        codec: C,
    ) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() || (runtime.exists(&root) && !runtime.is_dir(&root)) {
            bail!(PackageError::InvalidDataPath(root));
        }

        let mut set = Self {
            runtime,
            codec,
            root,
            gate: CompatibilityGate::new(host),
            packages: BTreeMap::new(),
        };
        set.load()?;
        Ok(set)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn host(&self) -> &HostApp {
        self.gate.host()
    }

    pub fn gate(&self) -> &CompatibilityGate {
        &self.gate
    }

    pub fn is_compatible(&self, record: &PackageRecord) -> bool {
        self.gate.is_compatible(record)
    }

    /// Look a record up by identity.
    pub fn find(&self, ident: &str) -> Option<&PackageRecord> {
        self.packages.get(ident)
    }

    /// Rescan the directory and replace the in-memory records.
    #[tracing::instrument(skip(self))]
    pub fn load(&mut self) -> Result<()> {
        if !self.runtime.exists(&self.root) {
            self.runtime.create_dir_all(&self.root)?;
        }

        let mut packages = BTreeMap::new();
        for dir in self.runtime.read_dir(&self.root)? {
            if let Some(record) = self.read_package(&dir)? {
                packages.insert(record.ident().to_string(), record);
            }
        }

        debug!("Loaded {} package(s) from {:?}", packages.len(), self.root);
        self.packages = packages;
        Ok(())
    }

    /// Read one package directory. Anything that is not a complete package
    /// (pending removal, no metadata, gone mid-scan, corrupt) yields `None`.
    fn read_package(&self, dir: &Path) -> Result<Option<PackageRecord>> {
        if is_pending(dir) || !self.runtime.is_dir(dir) {
            return Ok(None);
        }

        let meta_path = dir.join(META_FILENAME);
        if !self.runtime.is_file(&meta_path) {
            return Ok(None);
        }

        let bytes = match self.runtime.read(&meta_path) {
            Ok(bytes) => bytes,
            Err(e) if !self.runtime.exists(&meta_path) => {
                debug!("{:?} disappeared during scan: {}", dir, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let record = self
            .codec
            .decode(&bytes)
            .and_then(|meta| PackageRecord::new(meta, Some(dir.to_path_buf())).map_err(Into::into));
        match record {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Skipping {:?}: {}", dir, e);
                Ok(None)
            }
        }
    }

    /// Records matching `query` (all records when `None`), optionally only
    /// those the host can use. Ordered by name, then ascending version.
    pub fn list(&self, query: Option<&str>, check_compatibility: bool) -> Result<Vec<&PackageRecord>> {
        let query = query
            .filter(|q| !q.trim().is_empty())
            .map(VersionQuery::parse)
            .transpose()?;

        let mut records: Vec<&PackageRecord> = self
            .packages
            .values()
            .filter(|r| query.as_ref().is_none_or(|q| q.matches(r.name(), r.version())))
            .filter(|r| !check_compatibility || self.gate.is_compatible(r))
            .collect();

        records.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then_with(|| precedence(a.version(), b.version()))
        });
        Ok(records)
    }

    /// Every record, compatible with the host or not.
    pub fn list_all(&self, query: Option<&str>) -> Result<Vec<&PackageRecord>> {
        self.list(query, false)
    }

    /// The preferred record for `query`.
    ///
    /// Candidates are ranked by compatibility first and version second. When
    /// the best candidate is incompatible this fails with
    /// [`PackageError::PackageNotCompatible`] rather than returning an older
    /// release, so callers learn that an upgrade of the host is required.
    pub fn get(&self, query: &str) -> Result<&PackageRecord> {
        let parsed = VersionQuery::parse(query)?;

        let mut candidates: Vec<(bool, &PackageRecord)> = self
            .packages
            .values()
            .filter(|r| parsed.matches(r.name(), r.version()))
            .map(|r| (self.gate.is_compatible(r), r))
            .collect();

        candidates.sort_by(|(compat_a, a), (compat_b, b)| {
            compat_a
                .cmp(compat_b)
                .then_with(|| precedence(a.version(), b.version()))
        });

        let Some((_, best)) = candidates.pop() else {
            bail!(PackageError::PackageNotFound(query.to_string()));
        };

        self.gate.check(best)?;
        Ok(best)
    }

    /// Remove an installed package.
    ///
    /// The directory is first renamed to `<path>.tmp`, which scans ignore, and
    /// only then deleted, so a concurrent reader never sees a half-deleted
    /// package under its real name.
    #[tracing::instrument(skip(self, record), fields(package = %record))]
    pub fn remove(&mut self, record: &PackageRecord) -> Result<()> {
        let path = match record.path() {
            Some(path) if self.runtime.is_dir(path) => path.to_path_buf(),
            other => bail!(PackageError::NotInstalled(
                other.map(Path::to_path_buf).unwrap_or_default()
            )),
        };

        let pending = pending_path(&path);
        if self.runtime.exists(&pending) {
            debug!("Removing leftover {:?}", pending);
            self.runtime.remove_dir_all(&pending)?;
        }

        info!("Pending remove {:?}", path);
        self.runtime.rename(&path, &pending)?;
        info!("Remove {:?}", path);
        self.runtime.remove_dir_all(&pending)?;

        self.load()
    }

    /// Remove every package the host can use. Returns how many were removed.
    pub fn purge(&mut self) -> Result<usize> {
        info!("Purging packages in {:?}", self.root);
        let targets: Vec<PackageRecord> = self.list(None, true)?.into_iter().cloned().collect();
        for record in &targets {
            self.remove(record)?;
        }
        Ok(targets.len())
    }

    pub(super) fn read_meta(&self, meta_path: &Path) -> Result<PackageMeta> {
        let bytes = self
            .runtime
            .read(meta_path)
            .with_context(|| format!("Missing package metadata {:?}", meta_path))?;
        self.codec.decode(&bytes)
    }

    /// Unpack `archive` into a staging directory under the root and decode
    /// its metadata. The staging directory vanishes when the guard drops.
    pub(super) fn extract_staged<A: ArchiveHandler>(
        &self,
        handler: &A,
        archive: &Path,
    ) -> Result<(Staging<'a, R>, PackageMeta)>
    where
        R: 'static,
    {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Invalid archive path {:?}", archive))?;
        let staging_path = self
            .root
            .join(format!("{}-{}{}", file_name, std::process::id(), TMP_SUFFIX));

        let staging = Staging::create(self.runtime, staging_path)?;
        handler.materialize(self.runtime, archive, staging.path())?;
        let meta = self.read_meta(&staging.path().join(META_FILENAME))?;
        Ok((staging, meta))
    }

    /// Install a package archive into this set.
    ///
    /// Installing a package that is already present is a no-op; installing a
    /// new version replaces every other installed version of that package.
    #[tracing::instrument(skip(self, handler))]
    pub fn install<A: ArchiveHandler>(&mut self, handler: &A, archive: &Path) -> Result<PackageRecord>
    where
        R: 'static,
    {
        let (staging, meta) = self.extract_staged(handler, archive)?;
        let candidate = PackageRecord::new(meta, None)?;
        self.gate.check(&candidate)?;

        if let Some(existing) = self.packages.get(candidate.ident()) {
            info!("{} is already installed", existing);
            return Ok(existing.clone());
        }

        let target = self.root.join(candidate.ident());
        if self.runtime.exists(&target) {
            debug!("Replacing incomplete package directory {:?}", target);
            self.runtime.remove_dir_all(&target)?;
        }
        staging.commit(&target)?;
        info!("Installed {} to {:?}", candidate, target);

        let superseded: Vec<PackageRecord> = self
            .packages
            .values()
            .filter(|r| r.name() == candidate.name())
            .cloned()
            .collect();
        for old in &superseded {
            info!("Removing superseded {}", old);
            self.remove(old)?;
        }

        self.load()?;
        self.packages
            .get(candidate.ident())
            .cloned()
            .ok_or_else(|| anyhow!("{} disappeared right after installation", candidate))
    }
}
