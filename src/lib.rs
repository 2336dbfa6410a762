//! Managed object store client
//!
//! An in-memory, Dn-addressed object store with transactional property
//! updates, deterministic JSON snapshots and watch-based change
//! notification.
//!
//! ```ignore
//! let manager = DmeManagerBuilder::new(DmeConfig::new()?.validate()?).build()?;
//! manager.create("sys/intf/phys-[eth1/1]")?;
//!
//! let mut txn = manager.transaction();
//! txn.set_property("sys/intf/phys-[eth1/1]", "admin_state", "up")?;
//! txn.commit()?;
//!
//! manager.watch_with("sys/intf", "phys-*", true, Arc::new(MyHandler))?;
//! ```

mod config;
mod cursor;
mod dispatch;
mod dn;
mod errors;
mod handler;
mod manager;
mod object;
mod schema;
mod store;
mod txn;
mod watch;

pub mod metrics;
pub mod utils;

pub use config::*;
pub use dispatch::DispatchStats;
pub use dispatch::DispatchStatsSnapshot;
pub use dispatch::DmeEvent;
pub use dispatch::EventKind;
pub use dn::Dn;
pub use errors::*;
pub use handler::DmeHandler;
pub use manager::DmeManager;
pub use manager::DmeManagerBuilder;
pub use object::DmeObject;
pub use schema::ClassDef;
pub use schema::PropertyDef;
pub use schema::PropertyKind;
pub use schema::Schema;
pub use store::ManagedObject;
pub use store::ObjectCache;
pub use store::ObjectMap;
pub use store::ObjectTree;
pub use txn::CommitReceipt;
pub use txn::StagedMutation;
pub use txn::Transaction;
pub use watch::DnPattern;
pub use watch::Subscription;
pub use watch::WatchRegistry;

#[cfg(test)]
mod cursor_test;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
