//! Bridge error types
//!
//! `BridgeError` covers everything that can go wrong between the host and a
//! script environment. It converts into `HostError` when raised inside a
//! generated method body, and into a script runtime error when raised inside
//! a script-callable function, so script code can `try`/`catch` it.

use std::path::PathBuf;

use moonspeak_sdk::{HostError, ValueType};
use rhai::{Dynamic, EvalAltResult, ParseError, Position};
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for script-callable functions
pub(crate) type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// A script value could not be converted into a host value
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot marshal {got} into {expected}")]
pub struct MarshalError {
    /// Declared host type of the target slot
    pub expected: ValueType,
    /// Kind of the script value that was supplied
    pub got: String,
}

/// Errors raised by the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An override or exposed method names something the base type cannot
    /// supply
    #[error("'{type_name}' has no overridable member '{member}'")]
    UnknownMember {
        /// Type that was searched
        type_name: String,
        /// Offending name
        member: String,
    },

    /// A configurator tried to expose a name the type already has
    #[error("'{type_name}' already has a member named '{member}'")]
    DuplicateMember {
        /// Type being synthesized
        type_name: String,
        /// Offending name
        member: String,
    },

    /// An override entry for a method is neither a function nor `()`
    #[error("override '{name}' must be a function or (), got {got}")]
    NotCallable {
        /// Override key
        name: String,
        /// Kind of the supplied value
        got: String,
    },

    /// Value conversion failed at the script boundary
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Typed field write with an incompatible value
    #[error("cannot assign {got} to field '{field}' of type {expected}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Declared field type
        expected: ValueType,
        /// Kind of the supplied value
        got: String,
    },

    /// No resolver could locate the module
    #[error("module '{0}' not found")]
    Resolution(String),

    /// A module required itself, directly or indirectly, while loading
    #[error("cyclic require of module '{0}'")]
    CyclicRequire(String),

    /// Script source failed to read
    #[error("cannot read script '{path}': {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Script compile or runtime failure
    #[error("Script error: {0}")]
    Script(String),

    /// Host call failure surfaced to the bridge
    #[error(transparent)]
    Host(#[from] HostError),

    /// Nested host and script calls went deeper than the environment allows
    #[error("bridge call depth exceeded the limit of {0}")]
    CallDepth(usize),

    /// The owning script environment no longer exists
    #[error("script environment '{0}' has been dropped")]
    EnvironmentDropped(String),
}

impl BridgeError {
    /// Convert into a script runtime error carrying the message
    pub fn into_script(self) -> Box<EvalAltResult> {
        Box::new(EvalAltResult::ErrorRuntime(
            Dynamic::from(self.to_string()),
            Position::NONE,
        ))
    }
}

impl From<Box<EvalAltResult>> for BridgeError {
    fn from(err: Box<EvalAltResult>) -> Self {
        match *err {
            EvalAltResult::ErrorRuntime(ref payload, _) if payload.is_string() => {
                BridgeError::Script(payload.to_string())
            }
            other => BridgeError::Script(other.to_string()),
        }
    }
}

impl From<ParseError> for BridgeError {
    fn from(err: ParseError) -> Self {
        BridgeError::Script(err.to_string())
    }
}

impl From<BridgeError> for HostError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Host(inner) => inner,
            BridgeError::Marshal(m) => HostError::Marshal {
                expected: m.expected.name().to_string(),
                got: m.got,
            },
            BridgeError::TypeMismatch { expected, got, .. } => HostError::TypeMismatch {
                expected: expected.name().to_string(),
                got,
            },
            BridgeError::UnknownMember { type_name, member } => {
                HostError::UnknownMember { type_name, member }
            }
            other => HostError::Script(other.to_string()),
        }
    }
}
