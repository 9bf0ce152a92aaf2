//! Runtime error types.

use std::path::PathBuf;

use moonspeak_engine::BridgeError;

use crate::manifest::ManifestError;

/// Errors that can occur while loading or reloading a bundle.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Bundle root could not be read
    #[error("cannot read bundle '{path}': {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// `bundle.toml` is malformed
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The entry script does not exist
    #[error("bundle '{bundle}' has no entry script at {path}")]
    MissingEntry {
        /// Bundle id
        bundle: String,
        /// Expected entry path
        path: PathBuf,
    },

    /// A bundle with this id is already loaded
    #[error("bundle '{0}' is already loaded")]
    DuplicateBundle(String),

    /// No bundle with this id is loaded
    #[error("bundle '{0}' is not loaded")]
    UnknownBundle(String),

    /// The entry script failed
    #[error("bundle '{bundle}' failed: {source}")]
    Bridge {
        /// Bundle id
        bundle: String,
        /// Underlying bridge error
        #[source]
        source: BridgeError,
    },
}

impl LoadError {
    pub(crate) fn bridge(bundle: &str, source: BridgeError) -> Self {
        LoadError::Bridge {
            bundle: bundle.to_string(),
            source,
        }
    }
}
