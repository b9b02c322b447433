//! Generated stable identities for model entities.
//!
//! Gadgets, associations and observer registrations are all keyed by opaque
//! generated ids rather than by reference identity. An id stays valid for the
//! life of the process and never collides, which makes it safe to use as a
//! map key in the association index and the observer registries even after
//! the entity it named is gone.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Returns a fresh, process-unique id.
            pub fn next() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(1);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

define_id! {
    /// Stable identity of a gadget node
    GadgetId
}

define_id! {
    /// Stable identity of an association edge
    AssociationId
}

define_id! {
    /// Opaque key of an observer registration on a gadget
    ObserverId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = GadgetId::next();
        let b = GadgetId::next();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_ids_are_usable_as_map_keys() {
        use std::collections::HashMap;

        let id = ObserverId::next();
        let mut map = HashMap::new();
        map.insert(id, "callback");
        assert_eq!(map.get(&id), Some(&"callback"));
    }

    #[test]
    fn test_display_names_the_kind() {
        let id = AssociationId::next();
        assert!(id.to_string().starts_with("AssociationId#"));
    }
}
