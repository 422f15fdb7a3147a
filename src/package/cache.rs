//! Download cache: the same lookup rules as an installed [`PackageSet`],
//! plus [`CacheStore::update`] to admit freshly obtained packages.

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::archive::ArchiveHandler;
use crate::runtime::Runtime;

use super::compat::HostApp;
use super::meta::{ArchiveRef, JsonCodec, META_FILENAME, MetadataCodec, PackageMeta};
use super::record::PackageRecord;
use super::set::PackageSet;
use super::staging::{Staging, pending_path};

pub struct CacheStore<'a, R: Runtime, C: MetadataCodec = JsonCodec> {
    packages: PackageSet<'a, R, C>,
}

impl<'a, R: Runtime> CacheStore<'a, R> {
    pub fn new(runtime: &'a R, root: impl Into<PathBuf>, host: HostApp) -> Result<Self> {
        Ok(Self {
            packages: PackageSet::new(runtime, root, host)?,
        })
    }
}

impl<'a, R: Runtime, C: MetadataCodec> CacheStore<'a, R, C> {
    pub fn with_codec(
        runtime: &'a R,
        root: impl Into<PathBuf>,
        host: HostApp,
        codec: C,
    ) -> Result<Self> {
        Ok(Self {
            packages: PackageSet::with_codec(runtime, root, host, codec)?,
        })
    }

    /// The underlying package set.
    pub fn packages(&self) -> &PackageSet<'a, R, C> {
        &self.packages
    }

    pub fn load(&mut self) -> Result<()> {
        self.packages.load()
    }

    pub fn list(&self, query: Option<&str>) -> Result<Vec<&PackageRecord>> {
        self.packages.list(query, true)
    }

    pub fn list_all(&self, query: Option<&str>) -> Result<Vec<&PackageRecord>> {
        self.packages.list_all(query)
    }

    pub fn get(&self, query: &str) -> Result<&PackageRecord> {
        self.packages.get(query)
    }

    pub fn remove(&mut self, record: &PackageRecord) -> Result<()> {
        self.packages.remove(record)
    }

    pub fn purge(&mut self) -> Result<usize> {
        self.packages.purge()
    }

    /// Where the archive of a cached record lives, if it was cached with one.
    pub fn archive_path(&self, record: &PackageRecord) -> Option<PathBuf> {
        let dir = record.path()?;
        let filename = archive_filename(record.meta())?;
        let path = dir.join(filename);
        self.packages.runtime.is_file(&path).then_some(path)
    }

    /// Admit a package into the cache.
    ///
    /// Packages the host cannot use are never stored (`Ok(None)`). A package
    /// that is already cached is returned as is. Otherwise the entry is built
    /// under `<ident>.tmp`, with `meta.json` written after the payload, and
    /// renamed into place.
    #[tracing::instrument(skip(self, meta), fields(package = %meta.name, version = %meta.version))]
    pub fn update(
        &mut self,
        mut meta: PackageMeta,
        archive: Option<&Path>,
    ) -> Result<Option<PackageRecord>> {
        if meta.archive.is_none()
            && let Some(name) = archive.and_then(Path::file_name)
        {
            meta.archive = Some(ArchiveRef {
                filename: name.to_string_lossy().into_owned(),
                checksum: None,
            });
        }

        let record = PackageRecord::new(meta, None)?;
        if !self.packages.is_compatible(&record) {
            info!(
                "Not caching {}: requires {}",
                record,
                self.packages.gate().requirement(&record)
            );
            return Ok(None);
        }

        if let Some(existing) = self.packages.find(record.ident()) {
            debug!("{} is already cached", existing);
            return Ok(Some(existing.clone()));
        }

        let runtime = self.packages.runtime;
        let target = self.packages.root().join(record.ident());
        if runtime.exists(&target) {
            debug!("Replacing incomplete cache entry {:?}", target);
            runtime.remove_dir_all(&target)?;
        }

        let staging = Staging::create(runtime, pending_path(&target))?;
        if let Some(source) = archive {
            let filename = archive_filename(record.meta())
                .ok_or_else(|| anyhow!("Invalid archive file name for {}", record))?;
            runtime
                .copy(source, &staging.path().join(filename))
                .with_context(|| format!("Failed to cache archive {:?}", source))?;
        }
        let encoded = self.packages.codec.encode(record.meta())?;
        runtime.write(&staging.path().join(META_FILENAME), &encoded)?;
        staging.commit(&target)?;
        info!("Cached {} in {:?}", record, target);

        self.packages.load()?;
        Ok(self.packages.find(record.ident()).cloned())
    }

    /// Read the metadata out of a local archive and cache it together with
    /// the archive itself.
    #[tracing::instrument(skip(self, handler))]
    pub fn add_archive<A: ArchiveHandler>(
        &mut self,
        handler: &A,
        archive: &Path,
    ) -> Result<Option<PackageRecord>>
    where
        R: 'static,
    {
        let (staging, mut meta) = self.packages.extract_staged(handler, archive)?;
        drop(staging);

        let filename = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Invalid archive path {:?}", archive))?;
        meta.archive = Some(ArchiveRef {
            filename,
            checksum: Some(sha256_file(self.packages.runtime, archive)?),
        });

        self.update(meta, Some(archive))
    }
}

/// Final path component of the archive file name, so a crafted name cannot
/// escape the cache entry.
fn archive_filename(meta: &PackageMeta) -> Option<&std::ffi::OsStr> {
    meta.archive
        .as_ref()
        .and_then(|a| Path::new(&a.filename).file_name())
}

fn sha256_file<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)
        .with_context(|| format!("Failed to hash {:?}", path))?;
    Ok(hex::encode(hasher.finalize()))
}
