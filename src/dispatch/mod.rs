//! Event queue and dispatcher
//!
//! Store mutations queue events while holding the store lock; one worker task
//! delivers them. Per-object ordering (added, changed*, deleted) follows from
//! that single FIFO.

mod dispatcher;
mod event;
mod queue;


pub(crate) use dispatcher::EventDispatcher;
pub use dispatcher::DispatchStats;
pub use dispatcher::DispatchStatsSnapshot;
pub use event::DmeEvent;
pub use event::EventKind;
pub(crate) use queue::DispatchItem;
pub(crate) use queue::EventQueue;
pub(crate) use queue::EventReceiver;
