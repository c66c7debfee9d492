//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Depth Units Model
//! - A depth frame carries raw 16-bit counts; `DepthUnits` converts a count to meters
//! - The value may come from per-frame metadata, from a device option, or from `DepthUnits::DEFAULT`
//! - Frames always leave the annotation stage with valid depth units

mod config;
mod depth_units;
mod error;
mod frame;
mod metadata;
mod option;
mod option_id;

pub use config::*;
pub use depth_units::DepthUnits;
pub use error::*;
pub use frame::*;
pub use metadata::{MetadataDocument, MetadataPath};
pub use option::{CachedValue, OptionHandle, OptionSource};
pub use option_id::OptionId;
