//! Error types for collection generation and migration
//!
//! Each stage of the pipeline owns one error enum so callers can tell a bad
//! option (rejected before anything is persisted) from a malformed rule table
//! (an authoring bug) or a delta that disagrees with the generator. The
//! umbrella [`CollectionError`] is what the public operations return.

use thiserror::Error;

use crate::types::SlotKey;

/// Result type alias using [`CollectionError`]
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Invalid or unknown option supplied at creation time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Option name is not declared by the collection type
    #[error("unknown option '{name}'")]
    UnknownKey {
        /// Name as supplied by the caller
        name: String,
    },

    /// Option value does not match the declared kind
    #[error("option '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Option name
        name: String,
        /// Declared kind
        expected: String,
        /// Kind of the supplied value
        found: String,
    },

    /// Integer option outside its declared bounds
    #[error("option '{name}' value {value} is outside {min}..={max}")]
    OutOfRange {
        /// Option name
        name: String,
        /// Supplied value
        value: i64,
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
    },

    /// Schema declaration is internally inconsistent
    #[error("invalid declaration for option '{name}': {message}")]
    InvalidDeclaration {
        /// Option name
        name: String,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create a type mismatch error
    pub fn mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Malformed rule table or generator failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// Resolved stop year precedes the start year
    #[error("invalid year range: stop year {stop} precedes start year {start}")]
    InvalidRange {
        /// Resolved start year
        start: i32,
        /// Resolved stop year
        stop: i32,
    },

    /// A predicate or label in the rule table cannot be parsed or evaluated
    #[error("invalid rule '{rule}': {message}")]
    InvalidRule {
        /// Rule source text or rule name
        rule: String,
        /// Failure description, with location when known
        message: String,
    },

    /// The rule table emitted the same key twice
    #[error("rule table emits duplicate slot {key}")]
    DuplicateKey {
        /// Key emitted more than once
        key: SlotKey,
    },
}

impl GeneratorError {
    /// Create an invalid rule error
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Create an invalid rule error carrying a source location
    pub fn invalid_rule_at(
        rule: impl Into<String>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            message: format!("{} at line {line}, column {column}", message.into()),
        }
    }
}

/// Slot store invariant violation
///
/// These indicate a bug in the caller or the engine, never a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Dense ordering or key uniqueness would be broken
    #[error("slot store invariant violated: {0}")]
    InvariantViolation(String),

    /// Key is not present in the store
    #[error("no slot with key {0}")]
    UnknownKey(SlotKey),
}

impl StoreError {
    /// Create an invariant violation error
    pub fn violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

/// Delta history disagrees with the generator, or a migration step failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A delta names a slot the current rule table can never produce
    #[error("delta v{version} references {selector}, which the rule table does not produce")]
    DeltaKeyNotInCanonical {
        /// Version of the offending delta
        version: u32,
        /// Human readable form of the selector
        selector: String,
    },

    /// The host failed to persist progress after a delta
    #[error("checkpoint after delta v{version} failed: {message}")]
    CheckpointFailed {
        /// Version that was applied but not persisted
        version: u32,
        /// Host supplied failure description
        message: String,
    },

    /// Instance was created from a different collection type
    #[error("instance of '{found}' cannot be migrated with template '{expected}'")]
    TemplateMismatch {
        /// Type id of the template
        expected: String,
        /// Type id recorded on the instance
        found: String,
    },

    /// Canonical list could not be generated
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// Store rejected an insertion or rename
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Collection type lookup or template validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Type id is not registered
    #[error("unknown collection type '{0}'")]
    UnknownType(String),

    /// Display index is out of range
    #[error("no collection type at index {0}")]
    UnknownIndex(usize),

    /// Two templates share one type id
    #[error("collection type '{0}' is registered twice")]
    DuplicateType(String),

    /// Template failed a build-time self-check
    #[error("template '{type_id}' failed validation: {message}")]
    InvalidTemplate {
        /// Template type id
        type_id: String,
        /// First failed check
        message: String,
    },
}

impl RegistryError {
    /// Create a template validation error
    pub fn invalid(type_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            type_id: type_id.into(),
            message: message.into(),
        }
    }
}

/// Umbrella error for the public collection operations
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Option error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generator error
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    /// Registry error
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Persisted option snapshot could not be encoded or decoded
    #[error("option snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
