//! The definition pool: unit table and name index

use crate::config::PoolConfig;
use crate::defs::{DefKind, Definition, EnumDef, EnumValueDef, FieldDef, FileDef, MessageDef};
use crate::registry::{SerializedUnit, UnitEntry, UnitState};
use crate::{Error, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// An indexed definition and the unit that owns it
#[derive(Debug, Clone)]
pub(crate) struct Symbol {
    pub(crate) def: Definition,
    pub(crate) owner: Arc<UnitEntry>,
}

/// Counters describing a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub units_registered: usize,
    pub units_loaded: usize,
    pub symbols: usize,
    /// Number of parse-and-insert attempts, successful or not, across all units
    pub loads_executed: usize,
}

/// Registry of schema units and the definitions they produce once loaded.
///
/// A pool is an ordinary value: create one per process (or per test) and
/// share it by reference or `Arc`. Every method takes `&self`.
#[derive(Debug)]
pub struct DefPool {
    pub(crate) config: PoolConfig,
    pub(crate) units: DashMap<String, Arc<UnitEntry>>,
    pub(crate) symbols: DashMap<String, Symbol>,
    /// Serializes load transitions; never taken on the lookup path
    pub(crate) transitions: Mutex<()>,
    pub(crate) loads_executed: AtomicUsize,
}

impl DefPool {
    /// Create an empty pool with default configuration
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            config,
            units: DashMap::new(),
            symbols: DashMap::new(),
            transitions: Mutex::new(()),
            loads_executed: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Register a unit's descriptor bytes and dependency ids.
    ///
    /// Registering the same id again with identical content is a no-op;
    /// with different content it fails with [`Error::DuplicateUnit`].
    pub fn register(
        &self,
        unit: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        dependencies: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<()> {
        self.register_serialized(SerializedUnit::new(unit, bytes, dependencies))
    }

    /// Register an already assembled [`SerializedUnit`]
    pub fn register_serialized(&self, unit: SerializedUnit) -> Result<()> {
        match self.units.entry(unit.id().to_string()) {
            Entry::Occupied(existing) => {
                if existing.get().unit == unit {
                    debug!("Unit {} already registered with identical content", unit.id());
                    Ok(())
                } else {
                    Err(Error::DuplicateUnit {
                        unit: unit.id().to_string(),
                    })
                }
            }
            Entry::Vacant(slot) => {
                debug!(
                    "Registered unit {} ({} bytes, {} dependencies)",
                    unit.id(),
                    unit.bytes().len(),
                    unit.dependencies().len()
                );
                slot.insert(Arc::new(UnitEntry::new(unit)));
                Ok(())
            }
        }
    }

    /// Whether `unit` has been registered
    pub fn contains_unit(&self, unit: &str) -> bool {
        self.units.contains_key(unit)
    }

    /// Registered unit ids, sorted
    pub fn unit_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.units.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Current load state of `unit`
    pub fn unit_state(&self, unit: &str) -> UnitState {
        self.entry(unit)
            .map(|e| e.state())
            .unwrap_or(UnitState::Unregistered)
    }

    /// Whether `unit` is fully loaded. Lock-free apart from the map shard.
    pub fn is_loaded(&self, unit: &str) -> bool {
        self.units.get(unit).is_some_and(|e| e.is_loaded())
    }

    /// Live definitions of a loaded unit. Does not trigger loading.
    pub fn find_unit(&self, unit: &str) -> Result<Arc<FileDef>> {
        self.entry(unit)
            .and_then(|e| e.file().cloned())
            .ok_or_else(|| Error::NotFound(format!("unit {}", unit)))
    }

    /// Look up a definition among loaded units. Does not trigger loading.
    pub fn find_by_name(&self, name: &str) -> Result<Definition> {
        self.symbols
            .get(name)
            .filter(|s| s.owner.is_loaded())
            .map(|s| s.def.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn find_message_by_name(&self, name: &str) -> Result<Arc<MessageDef>> {
        match self.find_kind(name, DefKind::Message)? {
            Definition::Message(def) => Ok(def),
            _ => Err(Error::NotFound(name.to_string())),
        }
    }

    pub fn find_enum_by_name(&self, name: &str) -> Result<Arc<EnumDef>> {
        match self.find_kind(name, DefKind::Enum)? {
            Definition::Enum(def) => Ok(def),
            _ => Err(Error::NotFound(name.to_string())),
        }
    }

    pub fn find_enum_value_by_name(&self, name: &str) -> Result<Arc<EnumValueDef>> {
        match self.find_kind(name, DefKind::EnumValue)? {
            Definition::EnumValue(def) => Ok(def),
            _ => Err(Error::NotFound(name.to_string())),
        }
    }

    pub fn find_field_by_name(&self, name: &str) -> Result<Arc<FieldDef>> {
        match self.find_kind(name, DefKind::Field)? {
            Definition::Field(def) => Ok(def),
            _ => Err(Error::NotFound(name.to_string())),
        }
    }

    /// Snapshot of the pool's counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            units_registered: self.units.len(),
            units_loaded: self.units.iter().filter(|e| e.is_loaded()).count(),
            symbols: self.symbols.len(),
            loads_executed: self.loads_executed.load(Ordering::Acquire),
        }
    }

    fn find_kind(&self, name: &str, kind: DefKind) -> Result<Definition> {
        let def = self.find_by_name(name)?;
        if def.kind() != kind {
            debug!("{} is a {}, not a {}", name, def.kind(), kind);
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(def)
    }

    pub(crate) fn entry(&self, unit: &str) -> Option<Arc<UnitEntry>> {
        self.units.get(unit).map(|e| Arc::clone(e.value()))
    }
}

impl Default for DefPool {
    fn default() -> Self {
        Self::new()
    }
}
