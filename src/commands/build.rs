use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::{
    package::{DIST_DIR, JsonCodec, build_package},
    runtime::Runtime,
};

/// Pack a package directory into `<name>-<version>.tar.gz`
#[tracing::instrument(skip(runtime))]
pub fn build<R: Runtime>(runtime: R, dir: &Path, output: Option<PathBuf>) -> Result<()> {
    let out_dir = output.unwrap_or_else(|| dir.join(DIST_DIR));
    debug!("Building {:?} into {:?}", dir, out_dir);

    let built = build_package(&runtime, &JsonCodec, dir, &out_dir)?;
    println!(
        "Built {} {} at {}",
        built.meta.name,
        built.meta.version,
        built.path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_build_default_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("abc");
        fs::create_dir(&source).unwrap();
        fs::write(
            source.join("meta.json"),
            r#"{"name": "abc", "version": "1.0.0"}"#,
        )
        .unwrap();

        build(RealRuntime, &source, None).unwrap();

        assert!(source.join(DIST_DIR).join("abc-1.0.0.tar.gz").is_file());
    }

    #[test]
    fn test_build_custom_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("abc");
        fs::create_dir(&source).unwrap();
        fs::write(
            source.join("meta.json"),
            r#"{"name": "abc", "version": "2.0.0"}"#,
        )
        .unwrap();
        let out = dir.path().join("out");

        build(RealRuntime, &source, Some(out.clone())).unwrap();

        assert!(out.join("abc-2.0.0.tar.gz").is_file());
        assert!(!source.join(DIST_DIR).exists());
    }
}
