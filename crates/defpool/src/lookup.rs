//! Lookup API used by generated accessors
//!
//! Generated code knows, per message, which unit defines it. Each accessor
//! routes through [`DefPool::load_unit`] (or [`get_message_definition`]) and
//! then a plain name lookup, so the load check lives here once instead of in
//! every call site.

use crate::defs::{EnumDef, MessageDef};
use crate::pool::DefPool;
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Static registration record for one unit, as emitted by a code generator.
///
/// Dependencies are linked directly, so registering a unit also registers
/// everything it needs.
#[derive(Debug)]
pub struct UnitInit {
    pub name: &'static str,
    pub descriptor: &'static [u8],
    pub deps: &'static [&'static UnitInit],
}

impl DefPool {
    /// Register `init` and, transitively, every unit it links to
    pub fn register_unit(&self, init: &'static UnitInit) -> Result<()> {
        let mut seen = HashSet::new();
        self.register_linked(init, &mut seen)
    }

    fn register_linked(
        &self,
        init: &'static UnitInit,
        seen: &mut HashSet<&'static str>,
    ) -> Result<()> {
        if !seen.insert(init.name) {
            return Ok(());
        }
        for &dep in init.deps {
            self.register_linked(dep, seen)?;
        }
        self.register(
            init.name,
            init.descriptor,
            init.deps.iter().map(|d| d.name),
        )
    }

    /// Register (if needed) and load a statically described unit
    pub fn load_unit(&self, init: &'static UnitInit) -> Result<()> {
        if self.is_loaded(init.name) {
            return Ok(());
        }
        self.register_unit(init)?;
        self.ensure_loaded(init.name)
    }
}

/// Load `unit` if necessary, then look up the message `name`.
///
/// `unit` is the unit the caller knows defines `name`; it is not derived
/// from the name. Fails with [`Error::NotFound`] if `unit` itself defines no
/// such message, even when another loaded unit does, leaving the pool
/// untouched.
pub fn get_message_definition(pool: &DefPool, unit: &str, name: &str) -> Result<Arc<MessageDef>> {
    pool.ensure_loaded(unit)?;
    let message = pool.find_message_by_name(name)?;
    if message.unit() != unit {
        trace!("Message {} belongs to {}, not {}", name, message.unit(), unit);
        return Err(Error::NotFound(name.to_string()));
    }
    trace!("Resolved message {} via unit {}", name, unit);
    Ok(message)
}

/// Load `unit` if necessary, then look up the enum `name` it defines
pub fn get_enum_definition(pool: &DefPool, unit: &str, name: &str) -> Result<Arc<EnumDef>> {
    pool.ensure_loaded(unit)?;
    let def = pool.find_enum_by_name(name)?;
    if def.unit() != unit {
        return Err(Error::NotFound(name.to_string()));
    }
    Ok(def)
}

/// Expand to one accessor function per message, each bound to a static
/// [`UnitInit`].
///
/// ```
/// use defpool::{DefPool, UnitInit, message_accessors};
///
/// static GREETING_PROTO: UnitInit = UnitInit {
///     name: "greeting.proto",
///     descriptor: br#"{"name":"greeting.proto","package":"greet","messages":[{"name":"Hello"}]}"#,
///     deps: &[],
/// };
///
/// message_accessors!(GREETING_PROTO {
///     greet_hello_msgdef => "greet.Hello",
/// });
///
/// let pool = DefPool::new();
/// assert_eq!(greet_hello_msgdef(&pool).unwrap().name(), "Hello");
/// ```
#[macro_export]
macro_rules! message_accessors {
    ($init:path { $($accessor:ident => $full_name:literal),* $(,)? }) => {
        $(
            pub fn $accessor(
                pool: &$crate::DefPool,
            ) -> $crate::Result<::std::sync::Arc<$crate::MessageDef>> {
                pool.load_unit(&$init)?;
                $crate::get_message_definition(pool, $init.name, $full_name)
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    static BASE: UnitInit = UnitInit {
        name: "base.proto",
        descriptor: br#"{"name":"base.proto","package":"base","messages":[{"name":"Id","fields":[{"name":"value","number":1,"kind":"string"}]}]}"#,
        deps: &[],
    };

    static ORDER: UnitInit = UnitInit {
        name: "order.proto",
        descriptor: br#"{"name":"order.proto","package":"shop","messages":[{"name":"Order","fields":[{"name":"id","number":1,"kind":"message","type_name":"base.Id"}]}],"enums":[{"name":"Status","values":[{"name":"PENDING","number":0}]}]}"#,
        deps: &[&BASE],
    };

    message_accessors!(ORDER {
        shop_order_msgdef => "shop.Order",
        shop_missing_msgdef => "shop.Missing",
        misplaced_id_msgdef => "base.Id",
    });

    #[test]
    fn test_register_unit_links_dependencies() {
        let pool = DefPool::new();
        pool.register_unit(&ORDER).unwrap();
        assert!(pool.contains_unit("base.proto"));
        assert!(!pool.is_loaded("order.proto"));

        // Second registration is the identical-content no-op.
        pool.register_unit(&ORDER).unwrap();
        assert_eq!(pool.stats().units_registered, 2);
    }

    #[test]
    fn test_generated_accessor() {
        let pool = DefPool::new();
        let order = shop_order_msgdef(&pool).unwrap();
        assert_eq!(order.full_name(), "shop.Order");
        let id_type = order.field_by_name("id").unwrap().message_type().unwrap();
        assert_eq!(id_type.full_name(), "base.Id");

        let again = shop_order_msgdef(&pool).unwrap();
        assert!(Arc::ptr_eq(&order, &again));
        assert_eq!(pool.stats().loads_executed, 2);
    }

    #[test]
    fn test_accessor_for_missing_message() {
        let pool = DefPool::new();
        assert_eq!(
            shop_missing_msgdef(&pool).unwrap_err(),
            Error::NotFound("shop.Missing".to_string())
        );
        assert!(pool.is_loaded("order.proto"));
    }

    #[test]
    fn test_accessor_rejects_message_of_dependency() {
        let pool = DefPool::new();
        assert_eq!(
            misplaced_id_msgdef(&pool).unwrap_err(),
            Error::NotFound("base.Id".to_string())
        );
        // Still reachable through the unit that defines it.
        assert!(get_message_definition(&pool, "base.proto", "base.Id").is_ok());
    }

    #[test]
    fn test_get_definitions() {
        let pool = DefPool::new();
        pool.register_unit(&ORDER).unwrap();

        let status = get_enum_definition(&pool, "order.proto", "shop.Status").unwrap();
        assert_eq!(status.default_value().unwrap().name(), "PENDING");

        // An enum is not a message.
        assert!(matches!(
            get_message_definition(&pool, "order.proto", "shop.Status"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            get_message_definition(&pool, "unknown.proto", "shop.Order"),
            Err(Error::UnknownUnit(_))
        ));

        // A name owned by a dependency is not a definition of this unit.
        assert_eq!(
            get_message_definition(&pool, "order.proto", "base.Id").unwrap_err(),
            Error::NotFound("base.Id".to_string())
        );
        assert!(matches!(
            get_enum_definition(&pool, "base.proto", "shop.Status"),
            Err(Error::NotFound(_))
        ));
    }
}
