use anyhow::Result;
use log::debug;

use crate::{package::PackageSet, runtime::Runtime};

use super::config::Config;

/// Show the installed package that best satisfies a query
#[tracing::instrument(skip(runtime, config))]
pub fn find<R: Runtime>(runtime: R, query: &str, config: Config) -> Result<()> {
    debug!("Looking up {:?}", query);
    let set = PackageSet::new(&runtime, config.packages_dir(), config.host)?;
    let record = set.get(query)?;

    println!("{} {}", record.name(), record.version());
    if let Some(description) = &record.meta().description {
        println!("  {}", description);
    }
    if let Some(path) = record.path() {
        println!("  {}", path.display());
    }
    Ok(())
}
