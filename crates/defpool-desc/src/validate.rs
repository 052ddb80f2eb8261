//! Structural validation for decoded descriptors
//!
//! These checks only look at one descriptor in isolation. Whether a field's
//! `type_name` actually resolves is decided later, when the unit is loaded
//! against its dependencies.

use crate::model::{EnumDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor};
use crate::names::{is_identifier, is_package, join};
use crate::{Error, Result};
use std::collections::HashSet;

/// Largest field number the wire format can carry
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Field numbers reserved for the implementation
pub const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<u32> = 19_000..=19_999;

/// Validate a whole unit descriptor
pub fn validate_file(file: &FileDescriptor) -> Result<()> {
    if !is_package(&file.package) {
        return Err(Error::InvalidPackage(file.package.clone()));
    }

    let scope = file.package.as_str();
    check_unique_types(&file.messages, &file.enums, scope)?;

    for message in &file.messages {
        validate_message(message, scope)?;
    }
    for descriptor in &file.enums {
        validate_enum(descriptor, scope)?;
    }
    Ok(())
}

fn validate_message(message: &MessageDescriptor, scope: &str) -> Result<()> {
    if !is_identifier(&message.name) {
        return Err(Error::invalid_identifier(&message.name, scope_label(scope)));
    }
    let full_name = join(scope, &message.name);

    let mut names = HashSet::new();
    let mut numbers = HashSet::new();
    for field in &message.fields {
        validate_field(field, &full_name)?;
        if !names.insert(field.name.as_str()) {
            return Err(Error::duplicate("field name", &field.name, &full_name));
        }
        if !numbers.insert(field.number) {
            return Err(Error::duplicate(
                "field number",
                field.number.to_string(),
                &full_name,
            ));
        }
    }

    check_unique_types(&message.nested_messages, &message.nested_enums, &full_name)?;
    for nested in &message.nested_messages {
        validate_message(nested, &full_name)?;
    }
    for nested in &message.nested_enums {
        validate_enum(nested, &full_name)?;
    }
    Ok(())
}

fn validate_field(field: &FieldDescriptor, message: &str) -> Result<()> {
    if !is_identifier(&field.name) {
        return Err(Error::invalid_identifier(&field.name, message));
    }
    let full_name = join(message, &field.name);

    if field.number == 0
        || field.number > MAX_FIELD_NUMBER
        || RESERVED_FIELD_NUMBERS.contains(&field.number)
    {
        return Err(Error::InvalidFieldNumber {
            field: full_name,
            number: field.number,
        });
    }

    match (&field.type_name, field.kind.is_reference()) {
        (None, true) => Err(Error::invalid_type_reference(
            full_name,
            format!("{} field has no type_name", field.kind.as_str()),
        )),
        (Some(name), false) => Err(Error::invalid_type_reference(
            full_name,
            format!("{} field must not name a type ('{name}')", field.kind.as_str()),
        )),
        (Some(name), true) if !is_type_reference(name) => Err(Error::invalid_type_reference(
            full_name,
            format!("'{name}' is not a valid type name"),
        )),
        _ => Ok(()),
    }
}

fn validate_enum(descriptor: &EnumDescriptor, scope: &str) -> Result<()> {
    if !is_identifier(&descriptor.name) {
        return Err(Error::invalid_identifier(&descriptor.name, scope_label(scope)));
    }
    let full_name = join(scope, &descriptor.name);

    if descriptor.values.is_empty() {
        return Err(Error::EmptyEnum(full_name));
    }

    let mut names = HashSet::new();
    for value in &descriptor.values {
        if !is_identifier(&value.name) {
            return Err(Error::invalid_identifier(&value.name, &full_name));
        }
        if !names.insert(value.name.as_str()) {
            return Err(Error::duplicate("enum value", &value.name, &full_name));
        }
    }
    Ok(())
}

/// Nested messages and enums share one namespace per scope
fn check_unique_types(
    messages: &[MessageDescriptor],
    enums: &[EnumDescriptor],
    scope: &str,
) -> Result<()> {
    let mut seen = HashSet::new();
    let type_names = messages
        .iter()
        .map(|m| m.name.as_str())
        .chain(enums.iter().map(|e| e.name.as_str()));
    for name in type_names {
        if !seen.insert(name) {
            return Err(Error::duplicate("type", name, scope_label(scope)));
        }
    }
    Ok(())
}

fn is_type_reference(name: &str) -> bool {
    let relative = name.strip_prefix('.').unwrap_or(name);
    !relative.is_empty() && relative.split('.').all(is_identifier)
}

fn scope_label(scope: &str) -> &str {
    if scope.is_empty() { "<root>" } else { scope }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldKind;

    fn file_with(message: MessageDescriptor) -> FileDescriptor {
        FileDescriptor::new("t.proto").with_package("t").with_message(message)
    }

    #[test]
    fn test_valid_file_passes() {
        let file = file_with(
            MessageDescriptor::new("Msg")
                .with_field(FieldDescriptor::new("id", 1, FieldKind::Int32))
                .with_field(FieldDescriptor::message("next", 2, ".t.Msg"))
                .with_nested_enum(EnumDescriptor::new("Kind").with_value("NONE", 0)),
        );
        assert!(validate_file(&file).is_ok());
    }

    #[test]
    fn test_bad_package() {
        let file = FileDescriptor::new("t.proto").with_package("t..x");
        assert_eq!(
            validate_file(&file),
            Err(Error::InvalidPackage("t..x".to_string()))
        );
    }

    #[test]
    fn test_field_number_bounds() {
        for number in [0, 19_500, MAX_FIELD_NUMBER + 1] {
            let file = file_with(
                MessageDescriptor::new("Msg")
                    .with_field(FieldDescriptor::new("x", number, FieldKind::Bool)),
            );
            match validate_file(&file) {
                Err(Error::InvalidFieldNumber { field, .. }) => assert_eq!(field, "t.Msg.x"),
                other => panic!("expected InvalidFieldNumber, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_duplicate_field_number() {
        let file = file_with(
            MessageDescriptor::new("Msg")
                .with_field(FieldDescriptor::new("a", 1, FieldKind::Bool))
                .with_field(FieldDescriptor::new("b", 1, FieldKind::Bool)),
        );
        assert!(matches!(
            validate_file(&file),
            Err(Error::Duplicate { kind: "field number", .. })
        ));
    }

    #[test]
    fn test_message_and_enum_share_namespace() {
        let file = FileDescriptor::new("t.proto")
            .with_message(MessageDescriptor::new("Thing"))
            .with_enum(EnumDescriptor::new("Thing").with_value("A", 0));
        assert!(matches!(
            validate_file(&file),
            Err(Error::Duplicate { kind: "type", .. })
        ));
    }

    #[test]
    fn test_type_name_required_for_references() {
        let mut field = FieldDescriptor::message("m", 1, "Other");
        field.type_name = None;
        let file = file_with(MessageDescriptor::new("Msg").with_field(field));
        assert!(matches!(
            validate_file(&file),
            Err(Error::InvalidTypeReference { .. })
        ));

        let mut scalar = FieldDescriptor::new("s", 1, FieldKind::String);
        scalar.type_name = Some("Other".to_string());
        let file = file_with(MessageDescriptor::new("Msg").with_field(scalar));
        assert!(validate_file(&file).is_err());
    }

    #[test]
    fn test_empty_enum_rejected() {
        let file = FileDescriptor::new("t.proto").with_enum(EnumDescriptor::new("Empty"));
        assert_eq!(
            validate_file(&file),
            Err(Error::EmptyEnum("Empty".to_string()))
        );
    }
}
