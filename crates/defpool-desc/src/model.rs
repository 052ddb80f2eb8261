//! Descriptor model for schema units

use serde::{Deserialize, Serialize};

/// Serialized description of one schema unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Unit identifier (path-like, e.g. `envoy/config/core/v3/base.proto`)
    pub name: String,

    /// Dotted package prefix applied to every top-level definition
    #[serde(default)]
    pub package: String,

    /// Top-level messages
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,

    /// Top-level enums
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
}

impl FileDescriptor {
    /// Create an empty descriptor for the given unit
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: String::new(),
            messages: Vec::new(),
            enums: Vec::new(),
        }
    }

    /// Set the package prefix
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Add a top-level message
    pub fn with_message(mut self, message: MessageDescriptor) -> Self {
        self.messages.push(message);
        self
    }

    /// Add a top-level enum
    pub fn with_enum(mut self, descriptor: EnumDescriptor) -> Self {
        self.enums.push(descriptor);
        self
    }
}

/// A message type and everything nested inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    #[serde(default)]
    pub nested_messages: Vec<MessageDescriptor>,

    #[serde(default)]
    pub nested_enums: Vec<EnumDescriptor>,
}

impl MessageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            nested_messages: Vec::new(),
            nested_enums: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_nested_message(mut self, message: MessageDescriptor) -> Self {
        self.nested_messages.push(message);
        self
    }

    pub fn with_nested_enum(mut self, descriptor: EnumDescriptor) -> Self {
        self.nested_enums.push(descriptor);
        self
    }
}

/// A single message field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    /// Field number (tag)
    pub number: u32,

    #[serde(default)]
    pub label: Label,

    pub kind: FieldKind,

    /// Referenced type for `message` and `enum` fields, either fully
    /// qualified (leading `.`) or relative to the enclosing scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl FieldDescriptor {
    /// Create a scalar field
    pub fn new(name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            number,
            label: Label::Optional,
            kind,
            type_name: None,
        }
    }

    /// Create a field whose type is a message
    pub fn message(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::new(name, number, FieldKind::Message)
        }
    }

    /// Create a field whose type is an enum
    pub fn enumeration(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::new(name, number, FieldKind::Enum)
        }
    }

    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    pub fn required(mut self) -> Self {
        self.label = Label::Required;
        self
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Optional,
    Required,
    Repeated,
}

/// Field value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message,
    Enum,
}

impl FieldKind {
    /// Whether fields of this kind reference another definition by name
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldKind::Message | FieldKind::Enum)
    }

    /// Schema-language spelling of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Double => "double",
            FieldKind::Float => "float",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint32 => "uint32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Sint32 => "sint32",
            FieldKind::Sint64 => "sint64",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Message => "message",
            FieldKind::Enum => "enum",
        }
    }
}

/// An enum type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,

    #[serde(default)]
    pub values: Vec<EnumValueDescriptor>,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push(EnumValueDescriptor {
            name: name.into(),
            number,
        });
        self
    }
}

/// A named enum constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub number: i32,
}
