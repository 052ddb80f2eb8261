//! # defpool
//!
//! Schema definition pool.
//!
//! Each compiled schema unit registers a serialized descriptor and the list of
//! units it depends on. The first lookup that needs a unit loads it, after
//! loading its dependency closure, into live definitions that stay in the pool
//! for its whole lifetime:
//!
//! register → ensure_loaded (dependencies first) → find_by_name

pub mod builder;
pub mod config;
pub mod defs;
pub mod loader;
pub mod lookup;
pub mod pool;
pub mod registry;
pub mod resolve;

pub use config::PoolConfig;
pub use defpool_desc::{FieldKind, Label};
pub use defs::{DefKind, Definition, EnumDef, EnumValueDef, FieldDef, FileDef, MessageDef};
pub use lookup::{UnitInit, get_enum_definition, get_message_definition};
pub use pool::{DefPool, PoolStats};
pub use registry::{SerializedUnit, UnitState};

use thiserror::Error;

/// Errors that can occur when registering, loading or querying units
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unit '{unit}' is already registered with different content")]
    DuplicateUnit { unit: String },

    #[error("dependency cycle: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("unit '{unit}' is malformed: {reason}")]
    MalformedUnit { unit: String, reason: String },

    #[error("unit '{unit}' depends on unregistered unit '{dependency}'")]
    MissingDependency { unit: String, dependency: String },

    #[error("symbol '{symbol}' from unit '{unit}' is already defined by unit '{existing}'")]
    DuplicateSymbol {
        symbol: String,
        unit: String,
        existing: String,
    },

    #[error("dependency chain at unit '{unit}' exceeds the limit of {limit}")]
    DependencyTooDeep { unit: String, limit: usize },

    #[error("unit not registered: {0}")]
    UnknownUnit(String),

    #[error("definition not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a malformed-unit error
    pub fn malformed(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedUnit {
            unit: unit.into(),
            reason: reason.into(),
        }
    }

    /// Whether this failure is permanent for the unit it was raised for.
    ///
    /// Only lookups of absent names are left to the caller.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
