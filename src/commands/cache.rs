use anyhow::Result;
use log::debug;
use std::path::Path;

use crate::{archive::ArchiveHandlerImpl, package::CacheStore, runtime::Runtime};

use super::config::Config;

/// List cached packages, optionally filtered by a version query
#[tracing::instrument(skip(runtime, config))]
pub fn cache_list<R: Runtime>(
    runtime: R,
    query: Option<&str>,
    all: bool,
    config: Config,
) -> Result<()> {
    let cache = CacheStore::new(&runtime, config.cache_dir(), config.host)?;
    let records = if all {
        cache.list_all(query)?
    } else {
        cache.list(query)?
    };

    if records.is_empty() {
        println!("No packages cached.");
        return Ok(());
    }

    debug!("Found {} cached package(s)", records.len());
    for record in records {
        let archive = cache
            .archive_path(record)
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "-".to_string());
        println!("{} {} {}", record.name(), record.version(), archive);
    }
    Ok(())
}

/// Add a local package archive to the cache
#[tracing::instrument(skip(runtime, config))]
pub fn cache_add<R: Runtime + 'static>(runtime: R, archive: &Path, config: Config) -> Result<()> {
    let host = config.host.clone();
    let mut cache = CacheStore::new(&runtime, config.cache_dir(), config.host)?;

    match cache.add_archive(&ArchiveHandlerImpl::new(), archive)? {
        Some(record) => println!("Cached {} {}", record.name(), record.version()),
        None => println!(
            "Skipped {}: not compatible with {} {}",
            archive.display(),
            host.name,
            host.version_str()
        ),
    }
    Ok(())
}

/// Remove every cached package the host application can use
#[tracing::instrument(skip(runtime, config))]
pub fn cache_purge<R: Runtime>(runtime: R, config: Config) -> Result<()> {
    let mut cache = CacheStore::new(&runtime, config.cache_dir(), config.host)?;
    let removed = cache.purge()?;
    println!("Removed {} cached package(s).", removed);
    Ok(())
}
