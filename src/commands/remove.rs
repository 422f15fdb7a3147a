use anyhow::{Result, bail};
use log::debug;

use crate::{
    package::{PackageError, PackageRecord, PackageSet},
    runtime::Runtime,
};

use super::config::Config;

/// Remove every installed package matching a query
#[tracing::instrument(skip(runtime, config))]
pub fn remove<R: Runtime>(runtime: R, query: &str, config: Config) -> Result<()> {
    debug!("Removing {:?}", query);
    let mut set = PackageSet::new(&runtime, config.packages_dir(), config.host)?;

    let targets: Vec<PackageRecord> = set.list_all(Some(query))?.into_iter().cloned().collect();
    if targets.is_empty() {
        bail!(PackageError::PackageNotFound(query.to_string()));
    }

    for record in &targets {
        set.remove(record)?;
        println!("Removed {} {}", record.name(), record.version());
    }
    Ok(())
}
