//! Construction of live definitions from a decoded descriptor

use crate::defs::{Definition, EnumDef, EnumValueDef, FieldDef, FileDef, MessageDef, ResolvedType};
use crate::registry::SerializedUnit;
use crate::resolve::resolve_type;
use crate::{Error, FieldKind, Result};
use defpool_desc::names::{join, parent_scope};
use defpool_desc::{EnumDescriptor, FileDescriptor, MessageDescriptor};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// Definitions of one unit, built and resolved but not yet indexed
#[derive(Debug)]
pub(crate) struct BuiltUnit {
    pub(crate) file: Arc<FileDef>,
    pub(crate) symbols: HashMap<String, Definition>,
}

/// Build every definition of `descriptor` and resolve its reference fields.
///
/// Names are resolved against the unit's own definitions first, then through
/// `external`, which must only expose the unit's dependency closure.
pub(crate) fn build_unit<F>(
    unit: &SerializedUnit,
    descriptor: FileDescriptor,
    external: F,
) -> Result<BuiltUnit>
where
    F: Fn(&str) -> Option<Definition>,
{
    let mut builder = Builder {
        unit: unit.id(),
        symbols: HashMap::new(),
        pending: Vec::new(),
    };

    let package = descriptor.package;
    let messages = descriptor
        .messages
        .into_iter()
        .map(|m| builder.message(m, &package))
        .collect::<Result<Vec<_>>>()?;
    let enums = descriptor
        .enums
        .into_iter()
        .map(|e| builder.enumeration(e, &package))
        .collect::<Result<Vec<_>>>()?;

    builder.resolve_fields(&external)?;

    let mut names: Vec<String> = builder.symbols.keys().cloned().collect();
    names.sort();

    trace!(
        "Built {} definitions for unit {}",
        names.len(),
        unit.id()
    );

    Ok(BuiltUnit {
        file: Arc::new(FileDef {
            name: unit.id().to_string(),
            package,
            dependencies: unit.dependencies().to_vec(),
            messages,
            enums,
            symbols: names,
        }),
        symbols: builder.symbols,
    })
}

struct Builder<'a> {
    unit: &'a str,
    symbols: HashMap<String, Definition>,
    /// Reference fields and the scope their type name is relative to
    pending: Vec<(Arc<FieldDef>, String)>,
}

impl Builder<'_> {
    fn define(&mut self, def: Definition) -> Result<()> {
        let name = def.full_name().to_string();
        if let Some(existing) = self.symbols.get(&name) {
            return Err(Error::malformed(
                self.unit,
                format!("'{}' is defined twice (as {} and {})", name, existing.kind(), def.kind()),
            ));
        }
        self.symbols.insert(name, def);
        Ok(())
    }

    fn message(&mut self, desc: MessageDescriptor, scope: &str) -> Result<Arc<MessageDef>> {
        let full_name = join(scope, &desc.name);

        let nested_messages = desc
            .nested_messages
            .into_iter()
            .map(|m| self.message(m, &full_name))
            .collect::<Result<Vec<_>>>()?;
        let nested_enums = desc
            .nested_enums
            .into_iter()
            .map(|e| self.enumeration(e, &full_name))
            .collect::<Result<Vec<_>>>()?;

        let mut fields = Vec::with_capacity(desc.fields.len());
        for f in desc.fields {
            let field = Arc::new(FieldDef {
                full_name: join(&full_name, &f.name),
                name: f.name,
                number: f.number,
                label: f.label,
                kind: f.kind,
                type_name: f.type_name,
                containing_type: full_name.clone(),
                unit: self.unit.to_string(),
                resolved: OnceLock::new(),
            });
            if field.kind.is_reference() {
                self.pending.push((Arc::clone(&field), full_name.clone()));
            }
            self.define(Definition::Field(Arc::clone(&field)))?;
            fields.push(field);
        }

        let message = Arc::new(MessageDef {
            full_name,
            name: desc.name,
            unit: self.unit.to_string(),
            fields,
            nested_messages,
            nested_enums,
        });
        self.define(Definition::Message(Arc::clone(&message)))?;
        Ok(message)
    }

    fn enumeration(&mut self, desc: EnumDescriptor, scope: &str) -> Result<Arc<EnumDef>> {
        let full_name = join(scope, &desc.name);
        // Values live beside their enum, not inside it.
        let value_scope = parent_scope(&full_name).unwrap_or("");

        let mut values = Vec::with_capacity(desc.values.len());
        for v in desc.values {
            let value = Arc::new(EnumValueDef {
                full_name: join(value_scope, &v.name),
                name: v.name,
                number: v.number,
                enum_name: full_name.clone(),
                unit: self.unit.to_string(),
            });
            self.define(Definition::EnumValue(Arc::clone(&value)))?;
            values.push(value);
        }

        let def = Arc::new(EnumDef {
            full_name,
            name: desc.name,
            unit: self.unit.to_string(),
            values,
        });
        self.define(Definition::Enum(Arc::clone(&def)))?;
        Ok(def)
    }

    fn resolve_fields<F>(&mut self, external: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<Definition>,
    {
        for (field, scope) in std::mem::take(&mut self.pending) {
            let type_name = field.type_name.as_deref().unwrap_or_default();
            let target = resolve_type(&scope, type_name, |name| {
                self.symbols.get(name).cloned().or_else(|| external(name))
            })
            .ok_or_else(|| {
                Error::malformed(
                    self.unit,
                    format!("field {}: cannot resolve type '{}'", field.full_name, type_name),
                )
            })?;

            let resolved = match (field.kind, &target) {
                (FieldKind::Message, Definition::Message(m)) => {
                    ResolvedType::Message(Arc::downgrade(m))
                }
                (FieldKind::Enum, Definition::Enum(e)) => ResolvedType::Enum(Arc::downgrade(e)),
                (kind, other) => {
                    return Err(Error::malformed(
                        self.unit,
                        format!(
                            "field {}: '{}' is {} {}, expected {}",
                            field.full_name,
                            type_name,
                            other.kind(),
                            other.full_name(),
                            kind.as_str()
                        ),
                    ));
                }
            };
            let _ = field.resolved.set(resolved);
        }
        Ok(())
    }
}
