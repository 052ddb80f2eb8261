//! Dependency-ordered, at-most-once unit loading
//!
//! Every load transition runs under the pool's transition lock, so a unit's
//! parse-and-insert step executes at most once no matter how many threads
//! race on first use. Threads that lose the race block on the lock and then
//! find the unit loaded (or poisoned). Already loaded units are detected
//! without touching the lock.
//!
//! While the lock is held a unit is only ever in the `Loading` state if it is
//! on the current traversal path, which is how cycles are detected.

use crate::builder::build_unit;
use crate::defs::{Definition, FileDef};
use crate::pool::{DefPool, Symbol};
use crate::registry::{UnitEntry, UnitState};
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use tracing::{debug, info, trace, warn};

impl DefPool {
    /// Make sure `unit` and its whole dependency closure are loaded.
    ///
    /// Fails with the error that poisoned the unit, now or on an earlier
    /// call; a poisoned unit is never parsed again.
    pub fn ensure_loaded(&self, unit: &str) -> Result<()> {
        let entry = self
            .entry(unit)
            .ok_or_else(|| Error::UnknownUnit(unit.to_string()))?;

        if entry.is_loaded() {
            trace!("Unit {} already loaded", unit);
            return Ok(());
        }

        let _guard = self
            .transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut path = Vec::new();
        self.load_entry(&entry, &mut path)
    }

    fn load_entry(&self, entry: &Arc<UnitEntry>, path: &mut Vec<String>) -> Result<()> {
        match entry.state() {
            UnitState::Loaded => return Ok(()),
            UnitState::Poisoned(err) => {
                debug!("Unit {} is poisoned: {}", entry.id(), err);
                return Err(err);
            }
            UnitState::Loading => {
                // Only reachable off-path if a previous load panicked mid-transition.
                let Some(start) = path.iter().position(|p| p == entry.id()) else {
                    return Err(Error::malformed(entry.id(), "an earlier load was interrupted"));
                };
                let mut cycle = path[start..].to_vec();
                cycle.push(entry.id().to_string());
                return Err(Error::CyclicDependency { path: cycle });
            }
            UnitState::Registered | UnitState::Unregistered => {}
        }

        let limit = self.config.max_dependency_depth;
        if path.len() >= limit {
            // The chain from the root of this traversal down to here is
            // already `limit` long, so only the root is known to be too deep.
            let root = path.first().map(String::as_str).unwrap_or(entry.id());
            let err = Error::DependencyTooDeep {
                unit: root.to_string(),
                limit,
            };
            if root == entry.id() {
                warn!("{}", err);
                entry.set_state(UnitState::Poisoned(err.clone()));
            }
            return Err(err);
        }

        entry.set_state(UnitState::Loading);
        path.push(entry.id().to_string());

        let result = self.load_dependencies(entry, path).and_then(|height| {
            if height >= limit {
                return Err(Error::DependencyTooDeep {
                    unit: entry.id().to_string(),
                    limit,
                });
            }
            self.parse_and_insert(entry).map(|file| (file, height))
        });

        path.pop();

        match result {
            Ok((file, height)) => {
                info!(
                    "Loaded unit {} ({} definitions)",
                    entry.id(),
                    file.symbols().len()
                );
                entry.mark_loaded(file, height);
                Ok(())
            }
            Err(err) => Err(self.settle_failure(entry, path, err)),
        }
    }

    /// Poison `entry` with the error that stopped its load.
    ///
    /// A depth failure is a property of the unit it names. Units between
    /// that root and the point where the limit was hit go back to
    /// `Registered`, since their own chains may be short enough; a unit
    /// whose dependency is too deep is itself too deep.
    fn settle_failure(&self, entry: &UnitEntry, path: &[String], err: Error) -> Error {
        let err = match err {
            Error::DependencyTooDeep { unit, limit } if unit != entry.id() => {
                if path.contains(&unit) {
                    debug!("Unit {} left unloaded: chain from {} is too deep", entry.id(), unit);
                    entry.set_state(UnitState::Registered);
                    return Error::DependencyTooDeep { unit, limit };
                }
                Error::DependencyTooDeep {
                    unit: entry.id().to_string(),
                    limit,
                }
            }
            other => other,
        };
        warn!("Failed to load unit {}: {}", entry.id(), err);
        entry.set_state(UnitState::Poisoned(err.clone()));
        err
    }

    /// Load every dependency of `entry`, returning the height `entry` will have
    fn load_dependencies(&self, entry: &Arc<UnitEntry>, path: &mut Vec<String>) -> Result<usize> {
        let mut height = 0;
        for dependency in entry.unit.dependencies() {
            let dep = self
                .entry(dependency)
                .ok_or_else(|| Error::MissingDependency {
                    unit: entry.id().to_string(),
                    dependency: dependency.clone(),
                })?;
            trace!("Unit {} requires {}", entry.id(), dependency);
            self.load_entry(&dep, path)?;
            height = height.max(dep.height() + 1);
        }
        Ok(height)
    }

    /// Decode, build and index one unit whose dependencies are loaded.
    fn parse_and_insert(&self, entry: &Arc<UnitEntry>) -> Result<Arc<FileDef>> {
        let unit = &entry.unit;
        self.loads_executed.fetch_add(1, Ordering::AcqRel);
        let descriptor = defpool_desc::decode(unit.bytes())
            .map_err(|e| Error::malformed(unit.id(), e.to_string()))?;

        if self.config.verify_unit_names && descriptor.name != unit.id() {
            return Err(Error::malformed(
                unit.id(),
                format!("descriptor is named '{}'", descriptor.name),
            ));
        }

        let visible = self.dependency_closure(entry);
        let built = build_unit(unit, descriptor, |name| self.visible_symbol(name, &visible))?;

        // Reject before inserting anything so a failed unit leaves no trace.
        for name in built.symbols.keys() {
            if let Some(existing) = self.symbols.get(name) {
                return Err(Error::DuplicateSymbol {
                    symbol: name.clone(),
                    unit: unit.id().to_string(),
                    existing: existing.def.unit().to_string(),
                });
            }
        }

        for (name, def) in built.symbols {
            self.symbols.insert(
                name,
                Symbol {
                    def,
                    owner: Arc::clone(entry),
                },
            );
        }

        Ok(built.file)
    }

    /// Ids of every unit reachable through dependency edges, excluding `entry`
    fn dependency_closure(&self, entry: &UnitEntry) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = entry.unit.dependencies().to_vec();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(dep) = self.entry(&id) {
                stack.extend(dep.unit.dependencies().iter().cloned());
            }
        }
        seen
    }

    fn visible_symbol(&self, name: &str, visible: &HashSet<String>) -> Option<Definition> {
        self.symbols
            .get(name)
            .filter(|s| s.owner.is_loaded() && visible.contains(s.def.unit()))
            .map(|s| s.def.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defpool_desc::{FieldDescriptor, FileDescriptor, MessageDescriptor};

    fn bytes(file: &FileDescriptor) -> Vec<u8> {
        defpool_desc::encode(file).unwrap()
    }

    fn simple(unit: &str, package: &str, message: &str) -> Vec<u8> {
        bytes(
            &FileDescriptor::new(unit)
                .with_package(package)
                .with_message(MessageDescriptor::new(message)),
        )
    }

    #[test]
    fn test_unknown_unit() {
        let pool = DefPool::new();
        assert_eq!(
            pool.ensure_loaded("nope.proto"),
            Err(Error::UnknownUnit("nope.proto".to_string()))
        );
    }

    #[test]
    fn test_load_is_idempotent() {
        let pool = DefPool::new();
        pool.register("a.proto", simple("a.proto", "a", "Msg"), Vec::<String>::new())
            .unwrap();

        pool.ensure_loaded("a.proto").unwrap();
        let first = pool.find_by_name("a.Msg").unwrap();
        pool.ensure_loaded("a.proto").unwrap();
        let second = pool.find_by_name("a.Msg").unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(pool.stats().loads_executed, 1);
        assert_eq!(pool.unit_state("a.proto"), UnitState::Loaded);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let pool = DefPool::new();
        pool.register("a.proto", simple("a.proto", "a", "Msg"), ["a.proto"])
            .unwrap();
        assert_eq!(
            pool.ensure_loaded("a.proto"),
            Err(Error::CyclicDependency {
                path: vec!["a.proto".to_string(), "a.proto".to_string()]
            })
        );
    }

    fn chain(limit: usize) -> DefPool {
        let pool = DefPool::with_config(crate::PoolConfig::new().max_dependency_depth(limit));
        pool.register("a.proto", simple("a.proto", "a", "M"), ["b.proto"]).unwrap();
        pool.register("b.proto", simple("b.proto", "b", "M"), ["c.proto"]).unwrap();
        pool.register("c.proto", simple("c.proto", "c", "M"), Vec::<String>::new())
            .unwrap();
        pool
    }

    #[test]
    fn test_depth_limit_fails_only_the_deep_unit() {
        let pool = chain(2);
        let too_deep = Error::DependencyTooDeep {
            unit: "a.proto".to_string(),
            limit: 2,
        };

        assert_eq!(pool.ensure_loaded("a.proto"), Err(too_deep.clone()));
        assert_eq!(pool.unit_state("a.proto"), UnitState::Poisoned(too_deep));
        assert_eq!(pool.unit_state("b.proto"), UnitState::Registered);
        assert_eq!(pool.unit_state("c.proto"), UnitState::Registered);

        pool.ensure_loaded("c.proto").unwrap();
        pool.ensure_loaded("b.proto").unwrap();
    }

    #[test]
    fn test_depth_limit_outcome_independent_of_order() {
        let top_first = chain(2);
        let top = top_first.ensure_loaded("a.proto");
        let leaf = top_first.ensure_loaded("c.proto");

        let leaf_first = chain(2);
        assert_eq!(leaf_first.ensure_loaded("c.proto"), leaf);
        assert_eq!(leaf_first.ensure_loaded("b.proto"), Ok(()));
        assert_eq!(leaf_first.ensure_loaded("a.proto"), top);
        assert!(leaf.is_ok());
        assert!(matches!(top, Err(Error::DependencyTooDeep { ref unit, .. }) if unit == "a.proto"));
    }

    #[test]
    fn test_dependent_of_deep_unit_is_too_deep() {
        let pool = chain(1);
        pool.register("top.proto", simple("top.proto", "top", "M"), ["b.proto"])
            .unwrap();
        pool.ensure_loaded("c.proto").unwrap();

        assert_eq!(
            pool.ensure_loaded("b.proto"),
            Err(Error::DependencyTooDeep {
                unit: "b.proto".to_string(),
                limit: 1
            })
        );
        assert_eq!(
            pool.ensure_loaded("top.proto"),
            Err(Error::DependencyTooDeep {
                unit: "top.proto".to_string(),
                limit: 1
            })
        );
    }

    #[test]
    fn test_name_verification() {
        let pool = DefPool::new();
        pool.register("a.proto", simple("other.proto", "a", "Msg"), Vec::<String>::new())
            .unwrap();
        assert!(matches!(
            pool.ensure_loaded("a.proto"),
            Err(Error::MalformedUnit { .. })
        ));

        let lenient = DefPool::with_config(crate::PoolConfig::new().verify_unit_names(false));
        lenient
            .register("a.proto", simple("other.proto", "a", "Msg"), Vec::<String>::new())
            .unwrap();
        lenient.ensure_loaded("a.proto").unwrap();
    }

    #[test]
    fn test_types_outside_closure_are_invisible() {
        let pool = DefPool::new();
        pool.register("x.proto", simple("x.proto", "x", "Hidden"), Vec::<String>::new())
            .unwrap();
        pool.ensure_loaded("x.proto").unwrap();

        let user = FileDescriptor::new("u.proto").with_message(
            MessageDescriptor::new("User").with_field(FieldDescriptor::message("h", 1, ".x.Hidden")),
        );
        pool.register("u.proto", bytes(&user), Vec::<String>::new())
            .unwrap();

        let err = pool.ensure_loaded("u.proto").unwrap_err();
        assert!(err.to_string().contains("cannot resolve type '.x.Hidden'"));
    }

    #[test]
    fn test_transitive_dependencies_are_visible() {
        let pool = DefPool::new();
        pool.register("base.proto", simple("base.proto", "base", "Id"), Vec::<String>::new())
            .unwrap();
        pool.register("mid.proto", simple("mid.proto", "mid", "Wrapper"), ["base.proto"])
            .unwrap();
        let top = FileDescriptor::new("top.proto").with_package("top").with_message(
            MessageDescriptor::new("Top").with_field(FieldDescriptor::message("id", 1, "base.Id")),
        );
        pool.register("top.proto", bytes(&top), ["mid.proto"]).unwrap();

        pool.ensure_loaded("top.proto").unwrap();
        let field = pool.find_field_by_name("top.Top.id").unwrap();
        assert_eq!(field.message_type().unwrap().full_name(), "base.Id");
        assert_eq!(pool.stats().units_loaded, 3);
    }
}
