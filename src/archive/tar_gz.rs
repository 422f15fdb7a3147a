use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::path::{Component, Path};
use tar::Archive;

use super::{ArchiveHandler, flatten_into, unpack_dir};

/// Handler for .tar.gz / .tgz archives
pub struct TarGzHandler;

impl ArchiveHandler for TarGzHandler {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn materialize<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        dest: &Path,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", dest);
        let unpacked = unpack_dir(dest);
        if runtime.exists(&unpacked) {
            runtime.remove_dir_all(&unpacked)?;
        }
        runtime.create_dir_all(&unpacked)?;

        let result = self
            .unpack(runtime, archive_path, &unpacked)
            .and_then(|_| flatten_into(runtime, archive_path, &unpacked, dest));
        let cleanup = runtime.remove_dir_all(&unpacked);
        result?;
        cleanup?;

        info!("Extraction complete.");
        Ok(())
    }
}

impl TarGzHandler {
    fn unpack<R: Runtime>(&self, runtime: &R, archive_path: &Path, unpacked: &Path) -> Result<()> {
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        let mut archive = Archive::new(GzDecoder::new(file));

        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?
        {
            let mut entry = entry.context("Failed to read tar entry")?;
            let entry_path = entry.path()?.into_owned();

            if entry_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                debug!("Skipping entry with invalid path {:?}", entry_path);
                continue;
            }

            let full_path = unpacked.join(&entry_path);
            let entry_type = entry.header().entry_type();

            if entry_type.is_dir() {
                runtime.create_dir_all(&full_path)?;
            } else if entry_type.is_file() {
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                let mut dest_file = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;

                #[cfg(unix)]
                if let Ok(mode) = entry.header().mode()
                    && let Err(e) = runtime.set_permissions(&full_path, mode)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
            } else {
                debug!("Skipping unsupported entry {:?}", entry_path);
            }
        }

        Ok(())
    }
}
