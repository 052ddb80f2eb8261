//! Type-name resolution for reference fields
//!
//! A name with a leading `.` is fully qualified. Any other name is relative
//! to the scope that references it: the innermost enclosing scope is tried
//! first, then each outer scope in turn, down to the bare name.

use crate::defs::Definition;
use defpool_desc::names::{join, parent_scope};

/// Candidate fully-qualified names for `type_name` seen from `scope`,
/// innermost first
pub fn candidates(scope: &str, type_name: &str) -> Vec<String> {
    if let Some(absolute) = type_name.strip_prefix('.') {
        return vec![absolute.to_string()];
    }

    let mut out = Vec::new();
    let mut current = Some(scope).filter(|s| !s.is_empty());
    while let Some(s) = current {
        out.push(join(s, type_name));
        current = parent_scope(s);
    }
    out.push(type_name.to_string());
    out
}

/// Resolve `type_name` from `scope` to a message or enum.
///
/// Candidates that name something other than a type (a field, an enum
/// value) do not stop the search.
pub fn resolve_type<F>(scope: &str, type_name: &str, lookup: F) -> Option<Definition>
where
    F: Fn(&str) -> Option<Definition>,
{
    candidates(scope, type_name)
        .iter()
        .filter_map(|candidate| lookup(candidate))
        .find(|def| matches!(def, Definition::Message(_) | Definition::Enum(_)))
}
