//! Packing a package directory into an installable `.tar.gz` archive.

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::{Builder, Header};

use crate::runtime::Runtime;

use super::meta::{META_FILENAME, MetadataCodec, PackageMeta};
use super::staging::pending_path;

/// Output directory used when none is given: `<package dir>/dist`.
pub const DIST_DIR: &str = "dist";

/// An archive produced by [`build_package`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltArchive {
    pub meta: PackageMeta,
    pub path: PathBuf,
}

/// `<name>-<version>`, the archive's file stem and its top-level directory.
pub fn archive_stem(meta: &PackageMeta) -> String {
    format!("{}-{}", meta.name, meta.version)
}

/// Pack `source` into `<out_dir>/<name>-<version>.tar.gz`.
///
/// `meta.json` is decoded and validated first, so a directory that would
/// not install never becomes an archive. Entries are stored under a
/// `<name>-<version>/` prefix. `out_dir` itself is left out when it lives
/// inside `source`.
#[tracing::instrument(skip(runtime, codec))]
pub fn build_package<R: Runtime, C: MetadataCodec>(
    runtime: &R,
    codec: &C,
    source: &Path,
    out_dir: &Path,
) -> Result<BuiltArchive> {
    if !runtime.is_dir(source) {
        bail!("Package directory not found: {:?}", source);
    }

    let meta_path = source.join(META_FILENAME);
    let bytes = runtime
        .read(&meta_path)
        .with_context(|| format!("Missing package metadata {:?}", meta_path))?;
    let meta = codec.decode(&bytes)?;

    let stem = archive_stem(&meta);
    let archive = out_dir.join(format!("{}.tar.gz", stem));
    let partial = pending_path(&archive);
    runtime.create_dir_all(out_dir)?;

    debug!("Packing {:?} into {:?}", source, partial);
    let writer = runtime.create_file(&partial)?;
    let mut tar = Builder::new(GzEncoder::new(writer, Compression::default()));
    append_tree(runtime, &mut tar, source, Path::new(&stem), out_dir)?;
    let mut writer = tar
        .into_inner()
        .context("Failed to finish tar stream")?
        .finish()
        .context("Failed to finish gzip stream")?;
    writer.flush()?;
    drop(writer);

    runtime.rename(&partial, &archive)?;
    info!("Built {} {} at {:?}", meta.name, meta.version, archive);

    Ok(BuiltArchive {
        meta,
        path: archive,
    })
}

fn append_tree<R: Runtime, W: Write>(
    runtime: &R,
    tar: &mut Builder<W>,
    dir: &Path,
    prefix: &Path,
    skip: &Path,
) -> Result<()> {
    let mut entries = runtime.read_dir(dir)?;
    entries.sort();

    for entry in entries {
        if entry == skip {
            debug!("Skipping output directory {:?}", entry);
            continue;
        }
        let Some(name) = entry.file_name() else {
            continue;
        };
        let archived = prefix.join(name);

        if runtime.is_dir(&entry) {
            append_tree(runtime, tar, &entry, &archived, skip)?;
        } else if runtime.is_file(&entry) {
            let data = runtime.read(&entry)?;
            let mut header = Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(runtime.file_mode(&entry)?);
            tar.append_data(&mut header, &archived, data.as_slice())
                .with_context(|| format!("Failed to add {:?} to archive", entry))?;
        } else {
            debug!("Skipping {:?}: not a regular file", entry);
        }
    }
    Ok(())
}
