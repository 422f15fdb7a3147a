use anyhow::Result;
use log::debug;

use crate::{package::PackageSet, runtime::Runtime};

use super::config::Config;

/// List installed packages, optionally filtered by a version query
#[tracing::instrument(skip(runtime, config))]
pub fn list<R: Runtime>(runtime: R, query: Option<&str>, all: bool, config: Config) -> Result<()> {
    let root = config.packages_dir();
    debug!("Listing packages from {:?}", root);

    let set = PackageSet::new(&runtime, root, config.host)?;
    let records = if all {
        set.list_all(query)?
    } else {
        set.list(query, true)?
    };

    if records.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    debug!("Found {} package(s)", records.len());
    for record in records {
        if set.is_compatible(record) {
            println!("{} {}", record.name(), record.version());
        } else {
            println!(
                "{} {} (incompatible, requires {})",
                record.name(),
                record.version(),
                set.gate().requirement(record)
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{HostApp, PackageError, PackageMeta};
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::test_utils::{test_root, write_package_archive};
    use mockall::predicate::*;
    use tempfile::tempdir;

    fn config(root: &std::path::Path, version: &str) -> Config {
        Config {
            root: root.to_path_buf(),
            host: HostApp::new("test", Some(version.to_string())),
        }
    }

    #[test]
    fn test_list_no_packages() {
        let mut runtime = MockRuntime::new();
        let packages = test_root().join("packages");

        runtime
            .expect_exists()
            .with(eq(packages.clone()))
            .returning(|_| true);
        runtime
            .expect_is_dir()
            .with(eq(packages.clone()))
            .returning(|_| true);
        runtime
            .expect_read_dir()
            .with(eq(packages))
            .returning(|_| Ok(vec![]));

        let result = list(runtime, None, false, config(&test_root(), "1.0.0"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_list_with_packages() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        let cfg = config(&root, "1.0.0");

        let mut set = PackageSet::new(&RealRuntime, cfg.packages_dir(), cfg.host.clone()).unwrap();
        let archive = write_package_archive(
            dir.path(),
            &PackageMeta::new("abc", "1.0.0").with_compatibility("test", ">=1.0.0"),
        );
        set.install(&crate::archive::ArchiveHandlerImpl::new(), &archive)
            .unwrap();

        assert!(list(RealRuntime, None, false, cfg.clone()).is_ok());
        assert!(list(RealRuntime, Some("abc >=1.0.0"), true, cfg).is_ok());
    }

    #[test]
    fn test_list_invalid_query() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), "1.0.0");

        let err = list(RealRuntime, Some("abc >=1.0"), false, cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_list_root_is_a_file() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("packages"), b"").unwrap();

        let err = list(RealRuntime, None, false, config(&root, "1.0.0")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PackageError>(),
            Some(&PackageError::InvalidDataPath(root.join("packages")))
        );
    }
}
