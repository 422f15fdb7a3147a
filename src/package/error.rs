use std::path::PathBuf;

/// Domain errors raised by package resolution and storage.
///
/// These travel inside `anyhow::Error`; callers that need to branch on them
/// use `err.downcast_ref::<PackageError>()`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("Invalid query {query:?}: {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("No package matches {0:?}")]
    PackageNotFound(String),

    #[error("{package} is not compatible: running {host_name} {host_version} but requires {required}")]
    PackageNotCompatible {
        package: String,
        host_name: String,
        host_version: String,
        required: String,
    },

    #[error("Invalid data path: {0:?}")]
    InvalidDataPath(PathBuf),

    #[error("Package is not installed at {0:?}")]
    NotInstalled(PathBuf),

    #[error("Corrupt package metadata: {0}")]
    MetadataCorrupt(String),
}
