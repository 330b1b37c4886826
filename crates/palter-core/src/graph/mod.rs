pub mod entry;
pub mod store;

pub use entry::{is_target, is_trap, Entry, Predicate};
pub use store::{GraphSummary, ResourceGraph};
