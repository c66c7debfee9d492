//! # Device Options
//!
//! Concrete `OptionHandle` implementations and the registry the resolver looks them up in.
//!
//! - [`AutoUpdatedOption`]: value pushed out-of-band, cached in a single atomic word
//! - [`QueryOnlyOption`]: every read is a control-channel round trip
//! - [`OptionRegistry`]: `OptionSource` over registered handles
//! - [`MockControlChannel`]: in-memory device for tests and replay
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use contracts::{CachedValue, OptionId, OptionSource};
//! use device_options::{AutoUpdatedOption, MockControlChannel, OptionRegistry};
//!
//! let channel = Arc::new(MockControlChannel::new().with_value(OptionId::depth_units(), 0.0001));
//! let option = Arc::new(AutoUpdatedOption::new(OptionId::depth_units(), channel));
//! option.update_last_known(0.0001);
//!
//! let registry = OptionRegistry::new();
//! registry.register(option);
//! let handle = registry.option_handle(&OptionId::depth_units()).unwrap();
//! assert_eq!(handle.cached_value(), CachedValue::Known(0.0001));
//! ```

mod auto_updated;
mod control;
mod query_only;
mod registry;

pub use auto_updated::{AutoReport, AutoUpdatedOption};
pub use control::{ControlChannel, MockControlChannel};
pub use query_only::QueryOnlyOption;
pub use registry::OptionRegistry;
