//! Domain layer: correlation bookkeeping and the capability registry.

pub mod registry;
pub mod table;

pub use registry::{CapabilityFn, CapabilityRegistry};
pub use table::{Admission, Completion, CorrelationTable, Origin, PendingRequest, PendingStats};
