//! Group discovery across both registries.
//!
//! - `legacy` walks the coordination service tree
//! - `native` asks the brokers' group coordinators
//!
//! [`merge`] combines the two results into the view the store publishes.

pub mod legacy;
pub mod native;

pub use legacy::scan_legacy_groups;
pub use native::scan_native_groups;

use crate::model::GroupMap;

/// Union of both scans keyed by group id.
///
/// On collision the native entry replaces the legacy one as a whole; offsets
/// are not merged per partition.
pub fn merge(legacy: GroupMap, native: GroupMap) -> GroupMap {
    let mut merged = legacy;
    merged.extend(native);
    merged
}
