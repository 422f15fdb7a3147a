use anyhow::Result;
use log::debug;

use crate::{package::PackageSet, runtime::Runtime};

use super::config::Config;

/// Remove every installed package the host application can use
#[tracing::instrument(skip(runtime, config))]
pub fn purge<R: Runtime>(runtime: R, config: Config) -> Result<()> {
    let root = config.packages_dir();
    debug!("Purging packages in {:?}", root);

    let mut set = PackageSet::new(&runtime, root, config.host)?;
    let removed = set.purge()?;
    println!("Removed {} package(s).", removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{HostApp, JsonCodec, META_FILENAME, MetadataCodec, PackageMeta, PackageRecord};
    use crate::runtime::RealRuntime;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn write_package(packages: &Path, meta: &PackageMeta) -> PathBuf {
        let record = PackageRecord::new(meta.clone(), None).unwrap();
        let dir = packages.join(record.ident());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(META_FILENAME), JsonCodec.encode(meta).unwrap()).unwrap();
        dir
    }

    #[test]
    fn test_purge_keeps_incompatible_packages() {
        let dir = tempdir().unwrap();
        let cfg = Config {
            root: dir.path().to_path_buf(),
            host: HostApp::new("test", Some("1.0.0".into())),
        };
        let usable = write_package(&cfg.packages_dir(), &PackageMeta::new("abc", "1.0.0"));
        let other = write_package(
            &cfg.packages_dir(),
            &PackageMeta::new("xyz", "1.0.0").with_compatibility("test", ">=3.0.0"),
        );

        purge(RealRuntime, cfg).unwrap();

        assert!(!usable.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_purge_empty() {
        let dir = tempdir().unwrap();
        let cfg = Config {
            root: dir.path().join("fresh"),
            host: HostApp::default(),
        };

        purge(RealRuntime, cfg.clone()).unwrap();
        assert!(cfg.packages_dir().is_dir());
    }
}
