//! Object store: managed objects, the copy-on-write cache and the locked
//! core that serializes mutations with their events.

mod core;
mod object;
mod object_cache;

#[cfg(test)]
mod object_cache_test;

pub(crate) use self::core::StoreCore;
pub use object::ManagedObject;
pub use object_cache::ObjectCache;
pub use object_cache::ObjectMap;
pub use object_cache::ObjectTree;
pub(crate) use object_cache::render;
