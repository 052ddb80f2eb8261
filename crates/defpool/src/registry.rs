//! Unit registry entries

use crate::Error;
use crate::defs::FileDef;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// A unit exactly as it was registered: id, descriptor bytes, dependency ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedUnit {
    id: String,
    bytes: Arc<[u8]>,
    dependencies: Vec<String>,
}

impl SerializedUnit {
    pub fn new(
        id: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        dependencies: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            bytes: Arc::from(bytes.into()),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Opaque descriptor bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Dependency ids in declaration order
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Load state of a unit within one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitState {
    Unregistered,
    Registered,
    Loading,
    Loaded,
    /// Loading failed; the stored error is returned on every later attempt
    Poisoned(Error),
}

/// A registered unit plus its load state.
///
/// `state` is only written while the pool's transition lock is held. `file`
/// is set exactly once, after every definition of the unit is indexed, and
/// is what the lock-free loaded check reads. `height` is the length of the
/// longest dependency chain below the unit, recorded when it loads.
#[derive(Debug)]
pub(crate) struct UnitEntry {
    pub(crate) unit: SerializedUnit,
    state: Mutex<UnitState>,
    file: OnceLock<Arc<FileDef>>,
    height: OnceLock<usize>,
}

impl UnitEntry {
    pub(crate) fn new(unit: SerializedUnit) -> Self {
        Self {
            unit,
            state: Mutex::new(UnitState::Registered),
            file: OnceLock::new(),
            height: OnceLock::new(),
        }
    }

    pub(crate) fn id(&self) -> &str {
        self.unit.id()
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.file.get().is_some()
    }

    pub(crate) fn file(&self) -> Option<&Arc<FileDef>> {
        self.file.get()
    }

    /// Dependency height of a loaded unit; 0 until loaded
    pub(crate) fn height(&self) -> usize {
        self.height.get().copied().unwrap_or(0)
    }

    pub(crate) fn state(&self) -> UnitState {
        if self.is_loaded() {
            return UnitState::Loaded;
        }
        self.lock_state().clone()
    }

    pub(crate) fn set_state(&self, state: UnitState) {
        *self.lock_state() = state;
    }

    pub(crate) fn mark_loaded(&self, file: Arc<FileDef>, height: usize) {
        let mut state = self.lock_state();
        // Set under the state lock so `state()` never reports Loading after
        // the file became visible.
        let _ = self.height.set(height);
        let _ = self.file.set(file);
        *state = UnitState::Loaded;
    }

    fn lock_state(&self) -> MutexGuard<'_, UnitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_equality() {
        let a = SerializedUnit::new("a.proto", b"{}".to_vec(), ["dep.proto"]);
        let b = SerializedUnit::new("a.proto", b"{}".to_vec(), vec!["dep.proto".to_string()]);
        let c = SerializedUnit::new("a.proto", b"{}".to_vec(), Vec::<String>::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_entry_transitions() {
        let entry = UnitEntry::new(SerializedUnit::new("a.proto", Vec::new(), Vec::<String>::new()));
        assert_eq!(entry.state(), UnitState::Registered);
        assert!(!entry.is_loaded());

        entry.set_state(UnitState::Loading);
        assert_eq!(entry.state(), UnitState::Loading);

        entry.mark_loaded(Arc::new(FileDef {
            name: "a.proto".to_string(),
            package: String::new(),
            dependencies: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            symbols: Vec::new(),
        }), 3);
        assert!(entry.is_loaded());
        assert_eq!(entry.state(), UnitState::Loaded);
        assert_eq!(entry.file().unwrap().name(), "a.proto");
        assert_eq!(entry.height(), 3);
    }
}
