//! MoonSpeak Runtime
//!
//! Loads script bundles on top of the bridge. A bundle is a directory:
//!
//! ```text
//! <root>/
//!   bundle.toml          optional manifest
//!   scripts/
//!     main.rhai          entry script
//!     shared/            modules visible to every bundle
//! ```
//!
//! Each bundle runs in its own `ScriptEnv`; the types it synthesizes join
//! the shared `TypeDomain` after its entry script succeeds.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod manifest;
pub mod runtime;

pub use error::LoadError;
pub use manifest::{BundleInfo, BundleManifest, Limits, ManifestError, MANIFEST_FILE};
pub use runtime::{Bundle, Runtime, SHARED_RESOLVER};

pub use moonspeak_engine as engine;
pub use moonspeak_sdk as sdk;
