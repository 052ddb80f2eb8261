#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

//! # defpool-desc
//!
//! Serialized descriptors for compiled schema units.
//!
//! A schema unit (one schema source file) is shipped as an immutable byte
//! blob describing its messages, enums and fields. This crate owns the
//! in-memory model of that blob, the compact codec that produces and reads
//! it, and the structural checks applied when it is decoded.

/// Compact byte encoding of unit descriptors.
pub mod codec;
/// Descriptor model for units, messages, enums and fields.
pub mod model;
/// Dotted-name helpers and identifier syntax.
pub mod names;
/// Structural validation applied to decoded descriptors.
pub mod validate;

/// Encoding entry points.
pub use codec::{decode, encode};
/// Descriptor model types.
pub use model::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FieldKind, FileDescriptor, Label,
    MessageDescriptor,
};

use thiserror::Error;

/// Errors produced while encoding, decoding or validating a descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("descriptor decode failed: {0}")]
    Decode(String),

    #[error("descriptor encode failed: {0}")]
    Encode(String),

    #[error("invalid identifier '{name}' in {context}")]
    InvalidIdentifier { name: String, context: String },

    #[error("invalid package name '{0}'")]
    InvalidPackage(String),

    #[error("field {field} has invalid number {number}")]
    InvalidFieldNumber { field: String, number: u32 },

    #[error("duplicate {kind} '{name}' in {scope}")]
    Duplicate {
        kind: &'static str,
        name: String,
        scope: String,
    },

    #[error("enum {0} declares no values")]
    EmptyEnum(String),

    #[error("field {field}: {reason}")]
    InvalidTypeReference { field: String, reason: String },
}

impl Error {
    /// Build an invalid-identifier error with the scope it was found in.
    pub fn invalid_identifier(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Build a duplicate-declaration error.
    pub fn duplicate(kind: &'static str, name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            name: name.into(),
            scope: scope.into(),
        }
    }

    /// Build a type-reference error for a field.
    pub fn invalid_type_reference(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTypeReference {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for descriptor operations.
pub type Result<T> = std::result::Result<T, Error>;
