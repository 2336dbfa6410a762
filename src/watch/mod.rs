//! Watch subscriptions
//!
//! A watch names a base Dn and a pattern relative to it. Patterns are
//! evaluated against the whole Dn namespace, so an object created after the
//! watch still notifies on creation. See [`DnPattern`] for the syntax.

mod pattern;
mod registry;


pub use pattern::DnPattern;
pub use registry::Subscription;
pub use registry::WatchRegistry;
pub(crate) use registry::same_handler;
