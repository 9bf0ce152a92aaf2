//! Error types for host calls

/// Result type for host calls
pub type HostResult<T> = Result<T, HostError>;

/// Failures raised by host objects and host types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// No field or method with this name exists on the type
    #[error("'{type_name}' has no member named '{member}'")]
    UnknownMember {
        /// Type that was searched
        type_name: String,
        /// Requested member name
        member: String,
    },

    /// Wrong number of arguments for a method or constructor
    #[error("'{name}' expects {expected} argument(s), got {got}")]
    Arity {
        /// Method or constructor name
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// A value of the wrong kind was written to a typed slot
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Abstract method invoked without an implementation
    #[error("'{type_name}.{method}' is abstract")]
    AbstractMethod {
        /// Declaring type
        type_name: String,
        /// Method name
        method: String,
    },

    /// Type has no usable constructor
    #[error("'{0}' cannot be constructed")]
    NotConstructible(String),

    /// Value could not cross the script boundary
    #[error("Cannot marshal {got} into {expected}")]
    Marshal {
        /// Target type name
        expected: String,
        /// Script-side kind that was supplied
        got: String,
    },

    /// Script code failed while running on behalf of a host call
    #[error("Script error: {0}")]
    Script(String),
}
