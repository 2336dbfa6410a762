//! Handler capability
//!
//! Components that want notifications implement [`DmeHandler`] and register
//! it through a watch. Handlers are shared as `Arc<dyn DmeHandler>`; each
//! subscription keeps its own reference until it is removed or the manager
//! shuts down.

#[cfg(test)]
use mockall::automock;

use crate::Dn;
use crate::DmeObject;

#[cfg_attr(test, automock)]
pub trait DmeHandler: Send + Sync + 'static {
    /// Called for every matching object event.
    ///
    /// `obj` carries the event: see [`DmeObject::event`],
    /// [`DmeObject::is_property_changed`] and
    /// [`DmeObject::iterate_changed_properties`]. Returning `false` is logged
    /// and does not affect delivery to other handlers.
    fn on_object_event(
        &self,
        obj: &mut DmeObject,
    ) -> bool;

    /// Called after the download burst of a watch registered with
    /// `download = true`. `dn` is the watch's base Dn.
    fn on_download_done(
        &self,
        _dn: &Dn,
    ) {
    }
}
