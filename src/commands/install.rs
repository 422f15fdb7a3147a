use anyhow::{Result, anyhow};
use log::debug;
use std::path::Path;

use crate::{
    archive::ArchiveHandlerImpl,
    package::{CacheStore, PackageSet},
    runtime::Runtime,
};

use super::config::Config;

/// Install a package, either from a local archive or from the best cached
/// package matching a query
#[tracing::instrument(skip(runtime, config))]
pub fn install<R: Runtime + 'static>(runtime: R, target: &str, config: Config) -> Result<()> {
    let handler = ArchiveHandlerImpl::new();
    let archive_arg = Path::new(target);

    let archive = if runtime.is_file(archive_arg) {
        debug!("Installing from archive {:?}", archive_arg);
        archive_arg.to_path_buf()
    } else {
        debug!("Resolving {:?} from the cache", target);
        let cache = CacheStore::new(&runtime, config.cache_dir(), config.host.clone())?;
        let record = cache.get(target)?;
        cache
            .archive_path(record)
            .ok_or_else(|| anyhow!("Cached package {} has no archive", record))?
    };

    let mut set = PackageSet::new(&runtime, config.packages_dir(), config.host)?;
    let record = set.install(&handler, &archive)?;

    match record.path() {
        Some(path) => println!(
            "Installed {} {} to {}",
            record.name(),
            record.version(),
            path.display()
        ),
        None => println!("Installed {} {}", record.name(), record.version()),
    }
    Ok(())
}
