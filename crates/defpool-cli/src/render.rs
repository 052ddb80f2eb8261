//! Plain-text rendering of definitions

use defpool::{Definition, FieldDef, Label};
use std::fmt::Write;

/// Multi-line description of a definition
pub fn describe(def: &Definition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{def}");
    match def {
        Definition::Message(message) => {
            for field in message.fields() {
                let _ = writeln!(out, "  {}", field_line(field));
            }
            for nested in message.nested_messages() {
                let _ = writeln!(out, "  message {}", nested.full_name());
            }
            for nested in message.nested_enums() {
                let _ = writeln!(out, "  enum {}", nested.full_name());
            }
        }
        Definition::Enum(e) => {
            for value in e.values() {
                let _ = writeln!(out, "  {} = {}", value.name(), value.number());
            }
        }
        Definition::EnumValue(value) => {
            let _ = writeln!(out, "  {} = {} in {}", value.name(), value.number(), value.enum_name());
        }
        Definition::Field(field) => {
            let _ = writeln!(out, "  {}", field_line(field));
        }
    }
    out
}

fn field_line(field: &FieldDef) -> String {
    let label = match field.label() {
        Label::Optional => "",
        Label::Required => "required ",
        Label::Repeated => "repeated ",
    };
    let ty = field
        .resolved_type_name()
        .unwrap_or_else(|| field.kind().as_str().to_string());
    format!("{} = {}: {}{}", field.name(), field.number(), label, ty)
}
