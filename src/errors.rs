//! Unified error types for the KKN lifecycle engine.
//!
//! Every invariant violation maps to one of the logical variants and is raised before
//! any write happens. Storage failures surface as [`Error::Database`] and abort the
//! surrounding transaction.

use thiserror::Error;

/// Errors raised by registry, registration, posto and grading operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A uniqueness invariant would be violated
    #[error("Duplicate: {message}")]
    Duplicate {
        /// Which record already exists
        message: String,
    },

    /// A location quota or posto role slot is exhausted
    #[error("Capacity exceeded: {message}")]
    Capacity {
        /// Which slot is full
        message: String,
    },

    /// A state precondition is not met
    #[error("Conflict: {message}")]
    Conflict {
        /// The precondition that failed
        message: String,
    },

    /// The target user lacks the role the operation requires
    #[error("Role error: {message}")]
    Role {
        /// The role mismatch
        message: String,
    },

    /// The acting user is not allowed to perform the operation
    #[error("Forbidden: {message}")]
    Forbidden {
        /// The action that was refused
        message: String,
    },

    /// A referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
        /// Identifier used for the lookup
        id: String,
    },

    /// Configuration loading or wiring failed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// An external collaborator (document store, renderer) failed
    #[error("Collaborator error: {message}")]
    Collaborator {
        /// Description of the collaborator failure
        message: String,
    },

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Discriminant of [`Error`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Validation`]
    Validation,
    /// See [`Error::Duplicate`]
    Duplicate,
    /// See [`Error::Capacity`]
    Capacity,
    /// See [`Error::Conflict`]
    Conflict,
    /// See [`Error::Role`]
    Role,
    /// See [`Error::Forbidden`]
    Forbidden,
    /// See [`Error::NotFound`]
    NotFound,
    /// See [`Error::Config`]
    Config,
    /// See [`Error::Collaborator`]
    Collaborator,
    /// See [`Error::Database`]
    Database,
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Duplicate`].
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Capacity`].
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::Capacity {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Role`].
    pub fn role(message: impl Into<String>) -> Self {
        Self::Role {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the payload-free kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::Capacity { .. } => ErrorKind::Capacity,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Role { .. } => ErrorKind::Role,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Config { .. } => ErrorKind::Config,
            Self::Collaborator { .. } => ErrorKind::Collaborator,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    /// True for storage failures, which must abort the whole unit of work.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
