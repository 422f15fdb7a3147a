use anyhow::Result;
use log::{debug, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Suffix marking directories that scans must ignore: packages being
/// removed, and packages still being assembled.
pub const TMP_SUFFIX: &str = ".tmp";

/// `<path>.tmp`
pub fn pending_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

pub fn is_pending(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(TMP_SUFFIX))
}

/// RAII guard for a directory that is assembled in place and then renamed
/// to its final name. Dropped without [`Staging::commit`], it removes the
/// directory again.
pub struct Staging<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    armed: bool,
}

impl<'a, R: Runtime> Staging<'a, R> {
    /// Create an empty staging directory, clearing leftovers from an
    /// interrupted run.
    pub fn create(runtime: &'a R, path: PathBuf) -> Result<Self> {
        if runtime.exists(&path) {
            debug!("Removing stale staging directory {:?}", path);
            runtime.remove_dir_all(&path)?;
        }
        runtime.create_dir_all(&path)?;
        Ok(Self {
            runtime,
            path,
            armed: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged directory to `target`.
    pub fn commit(mut self, target: &Path) -> Result<()> {
        debug!("Committing {:?} to {:?}", self.path, target);
        self.runtime.rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl<R: Runtime> Drop for Staging<'_, R> {
    fn drop(&mut self) {
        if self.armed && self.runtime.exists(&self.path) {
            debug!("Cleaning up: {:?}", self.path);
            if let Err(e) = self.runtime.remove_dir_all(&self.path) {
                warn!("Failed to clean up {:?}: {}", self.path, e);
            }
        }
    }
}
