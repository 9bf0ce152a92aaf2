//! Bundle manifest parsing (bundle.toml)
//!
//! A bundle root may carry a `bundle.toml` that moves the script
//! directories and tunes the script environment. Every key is optional; a
//! bundle without a manifest uses the defaults:
//!
//! ```toml
//! [bundle]
//! name = "mods"            # defaults to the bundle id
//! entry = "main.rhai"
//! script_dir = "scripts"
//! shared_dir = "shared"    # relative to script_dir
//! strict_overrides = false
//!
//! [limits]
//! max_call_levels = 64
//! max_operations = 0       # 0 = unlimited
//! ```

use std::path::{Path, PathBuf};

use moonspeak_engine::EnvConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest file name looked up in a bundle root
pub const MANIFEST_FILE: &str = "bundle.toml";

/// Errors that can occur during manifest parsing
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid manifest: {0}")]
    ValidationError(String),
}

/// Bundle manifest (bundle.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BundleManifest {
    /// Bundle layout and behavior
    #[serde(default)]
    pub bundle: BundleInfo,

    /// Script engine limits
    #[serde(default)]
    pub limits: Limits,
}

/// `[bundle]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleInfo {
    /// Display name; the bundle id is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Entry script, relative to `script_dir` (default: "main.rhai")
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Script directory, relative to the bundle root (default: "scripts")
    #[serde(default = "default_script_dir")]
    pub script_dir: String,

    /// Shared module directory, relative to `script_dir` (default: "shared")
    #[serde(default = "default_shared_dir")]
    pub shared_dir: String,

    /// Reject override keys that name no base member
    #[serde(default)]
    pub strict_overrides: bool,
}

fn default_entry() -> String {
    "main.rhai".to_string()
}

fn default_script_dir() -> String {
    "scripts".to_string()
}

fn default_shared_dir() -> String {
    "shared".to_string()
}

impl Default for BundleInfo {
    fn default() -> Self {
        Self {
            name: None,
            entry: default_entry(),
            script_dir: default_script_dir(),
            shared_dir: default_shared_dir(),
            strict_overrides: false,
        }
    }
}

/// `[limits]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Limits {
    /// Maximum script call depth
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    /// Maximum operations per evaluation (0 = unlimited)
    #[serde(default)]
    pub max_operations: u64,
}

fn default_max_call_levels() -> usize {
    EnvConfig::default().max_call_levels
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_levels: default_max_call_levels(),
            max_operations: 0,
        }
    }
}

impl BundleManifest {
    /// Manifest of the bundle at `root`; defaults when there is no
    /// `bundle.toml`
    pub fn load(root: &Path) -> Result<Self, ManifestError> {
        let path = root.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: BundleManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<(), ManifestError> {
        let info = &self.bundle;
        if info.entry.trim().is_empty() {
            return Err(ManifestError::ValidationError(
                "Entry script cannot be empty".to_string(),
            ));
        }

        for (key, value) in [
            ("entry", &info.entry),
            ("script_dir", &info.script_dir),
            ("shared_dir", &info.shared_dir),
        ] {
            if Path::new(value).is_absolute() || value.split(['/', '\\']).any(|part| part == "..") {
                return Err(ManifestError::ValidationError(format!(
                    "{key} must stay inside the bundle: {value}"
                )));
            }
        }

        if self.limits.max_call_levels == 0 {
            return Err(ManifestError::ValidationError(
                "max_call_levels must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Name of the bundle, falling back to `id`
    pub fn name<'a>(&'a self, id: &'a str) -> &'a str {
        self.bundle.name.as_deref().unwrap_or(id)
    }

    /// Script directory under `root`
    pub fn script_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.bundle.script_dir)
    }

    /// Entry script under `root`
    pub fn entry_path(&self, root: &Path) -> PathBuf {
        self.script_dir(root).join(&self.bundle.entry)
    }

    /// Shared module directory under `root`
    pub fn shared_dir(&self, root: &Path) -> PathBuf {
        self.script_dir(root).join(&self.bundle.shared_dir)
    }

    /// Environment options for bundle `id`
    pub fn env_config(&self, id: &str) -> EnvConfig {
        EnvConfig {
            id: id.to_string(),
            strict_overrides: self.bundle.strict_overrides,
            max_call_levels: self.limits.max_call_levels,
            max_operations: self.limits.max_operations,
        }
    }
}
