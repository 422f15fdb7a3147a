use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Name of the per-user data directory under the home directory.
const DEFAULT_DIR_NAME: &str = ".hangar";

/// Get the default data root directory: `~/.hangar`
#[tracing::instrument(skip(runtime))]
pub fn default_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(DEFAULT_DIR_NAME))
}
