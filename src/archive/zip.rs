use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::{ArchiveHandler, flatten_into, unpack_dir};

/// Handler for .zip archives
pub struct ZipHandler;

impl ArchiveHandler for ZipHandler {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    fn materialize<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        dest: &Path,
    ) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", dest);
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

impl ZipHandler {
    fn unpack<R: Runtime>(&self, runtime: &R, archive_path: &Path, unpacked: &Path) -> Result<()> {
        let mut file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // zip needs Read + Seek, Runtime::open only gives Read
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;
        let mut archive = ZipArchive::new(std::io::Cursor::new(buffer))
            .with_context(|| "Failed to parse ZIP archive")?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            let entry_path = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    debug!("Skipping entry with invalid path");
                    continue;
                }
            };

            let full_path = unpacked.join(&entry_path);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
            } else {
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                let mut dest_file = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;

                #[cfg(unix)]
                if let Some(mode) = entry.unix_mode()
                    && let Err(e) = runtime.set_permissions(&full_path, mode)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
            }
        }

        Ok(())
    }
}
