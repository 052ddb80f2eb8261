//! Descriptor documents on disk
//!
//! A document is a unit descriptor written out by hand (YAML) or by a tool
//! (JSON), plus the ids of the units it depends on.

use anyhow::{Context, Result};
use defpool::DefPool;
use defpool_desc::FileDescriptor;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One unit as stored in a document file
#[derive(Debug, Deserialize)]
pub struct UnitDocument {
    #[serde(flatten)]
    pub descriptor: FileDescriptor,

    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Read a document, choosing the format by file extension
pub fn load_document(path: &Path) -> Result<UnitDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let is_yaml = path
        .extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false);

    let document = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("{} is not a valid YAML unit document", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not a valid JSON unit document", path.display()))?
    };
    debug!("Read unit document {}", path.display());
    Ok(document)
}

/// Read every document and register it in `pool`, returning the unit ids in
/// file order
pub fn register_documents(pool: &DefPool, paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(paths.len());
    for path in paths {
        let document = load_document(path)?;
        let id = document.descriptor.name.clone();
        let bytes = defpool_desc::encode(&document.descriptor)
            .with_context(|| format!("cannot encode unit {}", id))?;
        pool.register(id.clone(), bytes, document.dependencies)
            .with_context(|| format!("cannot register {}", path.display()))?;
        ids.push(id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_yaml_document_with_dependencies() {
        let file = write_temp(
            ".yaml",
            "name: b.proto\npackage: b\ndependencies: [a.proto]\nmessages:\n  - name: Msg\n",
        );
        let document = load_document(file.path()).unwrap();
        assert_eq!(document.descriptor.name, "b.proto");
        assert_eq!(document.dependencies, vec!["a.proto".to_string()]);
        assert_eq!(document.descriptor.messages[0].name, "Msg");
    }

    #[test]
    fn test_json_document_without_dependencies() {
        let file = write_temp(".json", r#"{"name": "a.proto", "package": "a"}"#);
        let document = load_document(file.path()).unwrap();
        assert!(document.dependencies.is_empty());
        assert!(document.descriptor.messages.is_empty());
    }

    #[test]
    fn test_register_documents() {
        let file = write_temp(".yml", "name: a.proto\nmessages:\n  - name: Msg\n");
        let pool = DefPool::new();
        let ids = register_documents(&pool, &[file.path().to_path_buf()]).unwrap();
        assert_eq!(ids, vec!["a.proto".to_string()]);
        pool.ensure_loaded("a.proto").unwrap();
        assert!(pool.find_message_by_name("Msg").is_ok());
    }

    #[test]
    fn test_unreadable_document() {
        let err = load_document(Path::new("/nonexistent/unit.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
