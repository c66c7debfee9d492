//! OptionHandle / OptionSource - device option access
//!
//! The resolver only ever sees these traits; concrete handles live in `device_options`.

use std::sync::Arc;

use crate::{ContractError, OptionId};

/// Cache capability of an option handle, as seen by a reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CachedValue {
    /// The handle keeps no cache; [`query`](OptionHandle::query) is the only way to read it
    Uncached,
    /// The handle is kept current out-of-band but nothing has been reported yet.
    ///
    /// Readers must not query: the next report fills the cache.
    Pending,
    /// Last value reported by the device
    Known(f32),
}

/// Handle to a single device option.
///
/// Every handle supports a synchronous [`query`](OptionHandle::query). Handles whose value
/// is pushed out-of-band additionally expose a cached copy through
/// [`cached_value`](OptionHandle::cached_value), which never blocks.
pub trait OptionHandle: Send + Sync {
    /// Option this handle controls
    fn option_id(&self) -> &OptionId;

    /// Cache capability and current cached value.
    ///
    /// Handles without a cache keep the default, [`CachedValue::Uncached`].
    fn cached_value(&self) -> CachedValue {
        CachedValue::Uncached
    }

    /// Read the current value through the control channel.
    ///
    /// May block for a device round trip. Timeouts are the handle's concern.
    fn query(&self) -> Result<f32, ContractError>;
}

/// Lookup of option handles by id.
pub trait OptionSource: Send + Sync {
    /// Handle for `id`, or `None` when the device does not expose that option
    fn option_handle(&self, id: &OptionId) -> Option<Arc<dyn OptionHandle>>;
}

impl<T: OptionSource + ?Sized> OptionSource for Arc<T> {
    fn option_handle(&self, id: &OptionId) -> Option<Arc<dyn OptionHandle>> {
        (**self).option_handle(id)
    }
}
