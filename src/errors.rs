//! Query error types
//!
//! Error codes:
//! - AERO_QUERY_UNKNOWN_FUNCTION (DEFINITION)
//! - AERO_QUERY_UNKNOWN_METHOD (DEFINITION)
//! - AERO_QUERY_UNKNOWN_OPERATOR (DEFINITION)
//! - AERO_QUERY_ARGUMENT_COUNT (DEFINITION)
//! - AERO_QUERY_MALFORMED_PREDICATE (DEFINITION)
//! - AERO_QUERY_DUPLICATE_CALLABLE (DEFINITION)
//! - AERO_QUERY_UNKNOWN_COMMAND (DEFINITION)
//! - AERO_QUERY_DUPLICATE_COMMAND (DEFINITION)
//! - AERO_QUERY_PARAMETER_EXHAUSTED (PARAMETER)
//! - AERO_QUERY_PARAMETER_MISSING (PARAMETER)
//! - AERO_QUERY_PARAMETER_UNBOUND (PARAMETER)
//! - AERO_QUERY_UNSUPPORTED (EVALUATION)
//! - AERO_QUERY_INCOMPARABLE (EVALUATION)
//! - AERO_QUERY_DUPLICATE_KEY (STORAGE)
//! - AERO_QUERY_STORAGE (STORAGE)
//! - AERO_QUERY_CONFIG (DEFINITION)
//! - AERO_QUERY_INTERNAL (INTERNAL)

use std::fmt;

use thiserror::Error;

/// Broad category of a query error.
///
/// Definition errors are raised before any record is touched; everything
/// else aborts the execution in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown callable, wrong arity, malformed predicate, bad config
    Definition,
    /// Late-bound parameter could not be supplied
    Parameter,
    /// Evaluation reached an unsupported or incomparable case
    Evaluation,
    /// Record store or index collaborator failure
    Storage,
    /// Poisoned lock or broken internal invariant
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Definition => "DEFINITION",
            ErrorKind::Parameter => "PARAMETER",
            ErrorKind::Evaluation => "EVALUATION",
            ErrorKind::Storage => "STORAGE",
            ErrorKind::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

/// Errors raised while building or executing a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Wrong argument count for {name}(): expected {expected}, got {given}")]
    ArgumentCount {
        name: String,
        expected: String,
        given: usize,
    },

    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("Callable already registered: {0}")]
    DuplicateCallable(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command already registered: {0}")]
    DuplicateCommand(String),

    #[error("No value supplied for anonymous parameter #{0}")]
    ParameterExhausted(usize),

    #[error("No value supplied for parameter :{0}")]
    MissingParameter(String),

    #[error("Parameter evaluated before being resolved")]
    UnboundParameter,

    #[error("Not supported yet: {0}")]
    Unsupported(String),

    #[error("Cannot compare {left} with {right}")]
    Incomparable { left: String, right: String },

    #[error("Duplicate key {key} in unique index {index}")]
    DuplicateKey { index: String, key: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Create an arity error from declared bounds
    pub fn argument_count(name: impl Into<String>, min: usize, max: Option<usize>, given: usize) -> Self {
        let expected = match max {
            Some(max) if max == min => format!("{}", min),
            Some(max) => format!("{}..{}", min, max),
            None => format!("at least {}", min),
        };
        QueryError::ArgumentCount {
            name: name.into(),
            expected,
            given,
        }
    }

    /// Returns the error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::UnknownFunction(_)
            | QueryError::UnknownMethod(_)
            | QueryError::UnknownOperator(_)
            | QueryError::ArgumentCount { .. }
            | QueryError::MalformedPredicate(_)
            | QueryError::DuplicateCallable(_)
            | QueryError::UnknownCommand(_)
            | QueryError::DuplicateCommand(_)
            | QueryError::Config(_) => ErrorKind::Definition,
            QueryError::ParameterExhausted(_)
            | QueryError::MissingParameter(_)
            | QueryError::UnboundParameter => ErrorKind::Parameter,
            QueryError::Unsupported(_) | QueryError::Incomparable { .. } => ErrorKind::Evaluation,
            QueryError::DuplicateKey { .. } | QueryError::Storage(_) => ErrorKind::Storage,
            QueryError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownFunction(_) => "AERO_QUERY_UNKNOWN_FUNCTION",
            QueryError::UnknownMethod(_) => "AERO_QUERY_UNKNOWN_METHOD",
            QueryError::UnknownOperator(_) => "AERO_QUERY_UNKNOWN_OPERATOR",
            QueryError::ArgumentCount { .. } => "AERO_QUERY_ARGUMENT_COUNT",
            QueryError::MalformedPredicate(_) => "AERO_QUERY_MALFORMED_PREDICATE",
            QueryError::DuplicateCallable(_) => "AERO_QUERY_DUPLICATE_CALLABLE",
            QueryError::UnknownCommand(_) => "AERO_QUERY_UNKNOWN_COMMAND",
            QueryError::DuplicateCommand(_) => "AERO_QUERY_DUPLICATE_COMMAND",
            QueryError::ParameterExhausted(_) => "AERO_QUERY_PARAMETER_EXHAUSTED",
            QueryError::MissingParameter(_) => "AERO_QUERY_PARAMETER_MISSING",
            QueryError::UnboundParameter => "AERO_QUERY_PARAMETER_UNBOUND",
            QueryError::Unsupported(_) => "AERO_QUERY_UNSUPPORTED",
            QueryError::Incomparable { .. } => "AERO_QUERY_INCOMPARABLE",
            QueryError::DuplicateKey { .. } => "AERO_QUERY_DUPLICATE_KEY",
            QueryError::Storage(_) => "AERO_QUERY_STORAGE",
            QueryError::Config(_) => "AERO_QUERY_CONFIG",
            QueryError::Internal(_) => "AERO_QUERY_INTERNAL",
        }
    }

    /// Returns true for errors raised while the command is being built
    pub fn is_definition_error(&self) -> bool {
        self.kind() == ErrorKind::Definition
    }

    pub(crate) fn poisoned() -> Self {
        QueryError::Internal("Lock poisoned".into())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
