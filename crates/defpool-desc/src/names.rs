//! Dotted-name helpers

use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Whether `name` is a single schema identifier
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Whether `package` is empty or a dot-separated list of identifiers
pub fn is_package(package: &str) -> bool {
    package.is_empty() || package.split('.').all(is_identifier)
}

/// Append `name` to a dotted scope; an empty scope yields `name` unchanged
pub fn join(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// The enclosing scope of a dotted name, or `None` at the root
pub fn parent_scope(name: &str) -> Option<&str> {
    name.rfind('.').map(|idx| &name[..idx])
}
