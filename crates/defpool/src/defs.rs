//! Live definitions produced by loading a unit
//!
//! Definitions are created once by the loader and never mutated afterwards,
//! apart from the one-shot type slot of reference fields, which is filled
//! before the owning unit becomes visible. Links between definitions are
//! `Weak` so that recursive messages do not keep each other alive; the pool's
//! name index holds the strong references.

use defpool_desc::{FieldKind, Label};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// A loaded unit
#[derive(Debug)]
pub struct FileDef {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) dependencies: Vec<String>,
    pub(crate) messages: Vec<Arc<MessageDef>>,
    pub(crate) enums: Vec<Arc<EnumDef>>,
    pub(crate) symbols: Vec<String>,
}

impl FileDef {
    /// Unit identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Declared dependency identifiers, in registration order
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Top-level messages
    pub fn messages(&self) -> &[Arc<MessageDef>] {
        &self.messages
    }

    /// Top-level enums
    pub fn enums(&self) -> &[Arc<EnumDef>] {
        &self.enums
    }

    /// Every fully-qualified name this unit defines, sorted
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// A message type
#[derive(Debug)]
pub struct MessageDef {
    pub(crate) full_name: String,
    pub(crate) name: String,
    pub(crate) unit: String,
    pub(crate) fields: Vec<Arc<FieldDef>>,
    pub(crate) nested_messages: Vec<Arc<MessageDef>>,
    pub(crate) nested_enums: Vec<Arc<EnumDef>>,
}

impl MessageDef {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Unqualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the unit that defines this message
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn fields(&self) -> &[Arc<FieldDef>] {
        &self.fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<FieldDef>> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&Arc<FieldDef>> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn nested_messages(&self) -> &[Arc<MessageDef>] {
        &self.nested_messages
    }

    pub fn nested_enums(&self) -> &[Arc<EnumDef>] {
        &self.nested_enums
    }
}

/// Target of a message- or enum-typed field
#[derive(Debug, Clone)]
pub(crate) enum ResolvedType {
    Message(Weak<MessageDef>),
    Enum(Weak<EnumDef>),
}

/// A message field
#[derive(Debug)]
pub struct FieldDef {
    pub(crate) full_name: String,
    pub(crate) name: String,
    pub(crate) number: u32,
    pub(crate) label: Label,
    pub(crate) kind: FieldKind,
    pub(crate) type_name: Option<String>,
    pub(crate) containing_type: String,
    pub(crate) unit: String,
    pub(crate) resolved: OnceLock<ResolvedType>,
}

impl FieldDef {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    /// The type name as written in the descriptor, before resolution
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Full name of the message declaring this field
    pub fn containing_type(&self) -> &str {
        &self.containing_type
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Resolved message type of a `message` field
    pub fn message_type(&self) -> Option<Arc<MessageDef>> {
        match self.resolved.get() {
            Some(ResolvedType::Message(target)) => target.upgrade(),
            _ => None,
        }
    }

    /// Resolved enum type of an `enum` field
    pub fn enum_type(&self) -> Option<Arc<EnumDef>> {
        match self.resolved.get() {
            Some(ResolvedType::Enum(target)) => target.upgrade(),
            _ => None,
        }
    }

    /// Full name of the resolved type, if this is a reference field
    pub fn resolved_type_name(&self) -> Option<String> {
        self.message_type()
            .map(|m| m.full_name.clone())
            .or_else(|| self.enum_type().map(|e| e.full_name.clone()))
    }
}

/// An enum type
#[derive(Debug)]
pub struct EnumDef {
    pub(crate) full_name: String,
    pub(crate) name: String,
    pub(crate) unit: String,
    pub(crate) values: Vec<Arc<EnumValueDef>>,
}

impl EnumDef {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn values(&self) -> &[Arc<EnumValueDef>] {
        &self.values
    }

    pub fn value_by_name(&self, name: &str) -> Option<&Arc<EnumValueDef>> {
        self.values.iter().find(|v| v.name == name)
    }

    /// First value declared with `number` (aliases share numbers)
    pub fn value_by_number(&self, number: i32) -> Option<&Arc<EnumValueDef>> {
        self.values.iter().find(|v| v.number == number)
    }

    /// The value a field of this enum defaults to
    pub fn default_value(&self) -> Option<&Arc<EnumValueDef>> {
        self.values.first()
    }
}

/// A named enum constant.
///
/// Enum values are scoped like their enum, not inside it: `pkg.Color.RED`
/// is indexed as `pkg.RED`.
#[derive(Debug)]
pub struct EnumValueDef {
    pub(crate) full_name: String,
    pub(crate) name: String,
    pub(crate) number: i32,
    pub(crate) enum_name: String,
    pub(crate) unit: String,
}

impl EnumValueDef {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    /// Full name of the enum declaring this value
    pub fn enum_name(&self) -> &str {
        &self.enum_name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

/// Kind of a [`Definition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
    Message,
    Enum,
    EnumValue,
    Field,
}

impl fmt::Display for DefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DefKind::Message => "message",
            DefKind::Enum => "enum",
            DefKind::EnumValue => "enum value",
            DefKind::Field => "field",
        };
        f.write_str(label)
    }
}

/// Any definition held in the pool's name index
#[derive(Debug, Clone)]
pub enum Definition {
    Message(Arc<MessageDef>),
    Enum(Arc<EnumDef>),
    EnumValue(Arc<EnumValueDef>),
    Field(Arc<FieldDef>),
}

impl Definition {
    pub fn full_name(&self) -> &str {
        match self {
            Definition::Message(d) => &d.full_name,
            Definition::Enum(d) => &d.full_name,
            Definition::EnumValue(d) => &d.full_name,
            Definition::Field(d) => &d.full_name,
        }
    }

    /// Identifier of the owning unit
    pub fn unit(&self) -> &str {
        match self {
            Definition::Message(d) => &d.unit,
            Definition::Enum(d) => &d.unit,
            Definition::EnumValue(d) => &d.unit,
            Definition::Field(d) => &d.unit,
        }
    }

    pub fn kind(&self) -> DefKind {
        match self {
            Definition::Message(_) => DefKind::Message,
            Definition::Enum(_) => DefKind::Enum,
            Definition::EnumValue(_) => DefKind::EnumValue,
            Definition::Field(_) => DefKind::Field,
        }
    }

    pub fn as_message(&self) -> Option<&Arc<MessageDef>> {
        match self {
            Definition::Message(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Arc<EnumDef>> {
        match self {
            Definition::Enum(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enum_value(&self) -> Option<&Arc<EnumValueDef>> {
        match self {
            Definition::EnumValue(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Arc<FieldDef>> {
        match self {
            Definition::Field(d) => Some(d),
            _ => None,
        }
    }

    /// Whether both handles point at the same live definition
    pub fn ptr_eq(&self, other: &Definition) -> bool {
        match (self, other) {
            (Definition::Message(a), Definition::Message(b)) => Arc::ptr_eq(a, b),
            (Definition::Enum(a), Definition::Enum(b)) => Arc::ptr_eq(a, b),
            (Definition::EnumValue(a), Definition::EnumValue(b)) => Arc::ptr_eq(a, b),
            (Definition::Field(a), Definition::Field(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind(), self.full_name(), self.unit())
    }
}
