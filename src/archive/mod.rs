mod tar_gz;
mod zip;

use crate::package::TMP_SUFFIX;
use crate::runtime::Runtime;
use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

pub use tar_gz::TarGzHandler;
pub use zip::ZipHandler;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Unsupported archive format: {0:?}")]
    Unsupported(PathBuf),

    #[error("Archive appears to be empty: {0:?}")]
    Empty(PathBuf),
}

/// Turns a package archive into a payload directory.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveHandler {
    /// Check if this handler can read the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Unpack the archive into `dest`, which must already exist.
    fn materialize<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        dest: &Path,
    ) -> Result<()>;
}

/// Dispatcher that selects the handler matching the archive's extension.
pub struct ArchiveHandlerImpl {
    tar_gz: TarGzHandler,
    zip: ZipHandler,
}

impl Default for ArchiveHandlerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveHandlerImpl {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzHandler,
            zip: ZipHandler,
        }
    }
}

impl ArchiveHandler for ArchiveHandlerImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    #[tracing::instrument(skip(self, runtime, archive_path, dest))]
    fn materialize<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        dest: &Path,
    ) -> Result<()> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.materialize(runtime, archive_path, dest);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.materialize(runtime, archive_path, dest);
        }
        Err(ArchiveError::Unsupported(archive_path.to_path_buf()).into())
    }
}

/// Move the unpacked entries from `unpacked` into `dest`.
///
/// Archives usually wrap their content in a single top-level directory
/// (`abc-1.0.0/meta.json`); that directory is flattened away.
pub(crate) fn flatten_into<R: Runtime>(
    runtime: &R,
    archive_path: &Path,
    unpacked: &Path,
    dest: &Path,
) -> Result<()> {
    let entries = runtime.read_dir(unpacked)?;
    let source_dir = match entries.as_slice() {
        [] => return Err(ArchiveError::Empty(archive_path.to_path_buf()).into()),
        [only] if runtime.is_dir(only) => only.clone(),
        _ => unpacked.to_path_buf(),
    };

    debug!("Moving contents from {:?} to {:?}", source_dir, dest);
    for item in runtime.read_dir(&source_dir)? {
        if let Some(name) = item.file_name() {
            runtime.rename(&item, &dest.join(name))?;
        }
    }
    Ok(())
}

/// `<dest>.unpack.tmp`: sibling directory the raw archive entries land in.
/// The `.tmp` suffix keeps package scans away from it.
pub(crate) fn unpack_dir(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".unpack");
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use anyhow::Result;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::{self, File};
    use tar::Builder;
    use tempfile::tempdir;

    fn create_test_archive(path: &Path, files: &[(&str, &str)]) -> Result<()> {
        let file = File::create(path)?;
        let enc = GzEncoder::new(file, Compression::default());
        let mut tar = Builder::new(enc);

        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name)?;
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            tar.append(&header, content.as_bytes())?;
        }

        tar.into_inner()?.finish()?;
        Ok(())
    }

    #[test]
    fn test_handler_impl_can_handle() {
        let handler = ArchiveHandlerImpl::new();
        assert!(handler.can_handle(Path::new("abc-1.0.0.tar.gz")));
        assert!(handler.can_handle(Path::new("abc-1.0.0.tgz")));
        assert!(handler.can_handle(Path::new("abc-1.0.0.zip")));
        assert!(!handler.can_handle(Path::new("abc-1.0.0.rar")));
    }

    #[test]
    fn test_handler_impl_dispatches_to_tar_gz() -> Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("abc-1.0.0.tar.gz");
        let dest = dir.path().join("dest");
        fs::create_dir(&dest)?;

        create_test_archive(
            &archive_path,
            &[("abc-1.0.0/meta.json", "{}"), ("abc-1.0.0/data/model.bin", "bin")],
        )?;

        ArchiveHandlerImpl::new().materialize(&RealRuntime, &archive_path, &dest)?;

        assert_eq!(fs::read_to_string(dest.join("meta.json"))?, "{}");
        assert_eq!(fs::read_to_string(dest.join("data/model.bin"))?, "bin");
        assert!(!unpack_dir(&dest).exists());
        Ok(())
    }

    #[test]
    fn test_handler_impl_unsupported() {
        let dir = tempdir().unwrap();
        let err = ArchiveHandlerImpl::new()
            .materialize(&RealRuntime, &dir.path().join("abc.rar"), dir.path())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArchiveError>(),
            Some(ArchiveError::Unsupported(_))
        ));
    }
}
