//! Error types for the data access layer
//!
//! One crate-wide error enum covering argument validation, configuration
//! lookup, relation metadata resolution, and database failures. All failures
//! surface to the immediate caller; nothing is retried or swallowed.

/// Result type alias for data access operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error type for all data access operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrmError {
    /// Required argument is null/empty or violates a stated precondition
    #[error("invalid argument: {0}")]
    Argument(String),

    /// No connection configuration registered under the given name
    #[error("no connection configuration registered for '{0}'")]
    ConfigurationMissing(String),

    /// Connection or registry configuration is present but unusable
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A load path references a property without declared relation metadata
    #[error("property '{property}' on type '{type_name}' has no relation metadata")]
    RelationMetadataMissing { type_name: String, property: String },

    /// A named property or loader method cannot be resolved on the expected type
    #[error("member '{member}' not found on type '{type_name}'")]
    MethodNotFound { type_name: String, member: String },

    /// A declared relation's target type cannot be resolved
    #[error("type '{0}' is not registered")]
    TypeNotFound(String),

    /// Duplicate parameter name within a single parameter set
    #[error("parameter '{0}' already exists")]
    ParameterExists(String),

    /// Row projection or value conversion failed
    #[error("hydration error: {0}")]
    Hydration(String),

    /// Database connection, command, or backend error
    #[error("database error: {0}")]
    Database(String),

    /// Transaction lifecycle error
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Relation resolution recursed past the configured depth bound
    #[error("relation resolution exceeded maximum depth of {0}")]
    DepthExceeded(usize),
}

impl OrmError {
    /// Shorthand for a `MethodNotFound` error with owned names
    pub fn method_not_found(type_name: &str, member: &str) -> Self {
        OrmError::MethodNotFound {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }
}

// Convert from serde_json errors raised during value conversion
impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Hydration(err.to_string())
    }
}

// Convert from postgres driver errors
impl From<postgres::Error> for OrmError {
    fn from(err: postgres::Error) -> Self {
        OrmError::Database(err.to_string())
    }
}
