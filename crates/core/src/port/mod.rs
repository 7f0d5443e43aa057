// Port Layer - Interfaces between the registry and its collaborators

pub mod change_listener;
pub mod exposed;
pub mod time_provider; // For deterministic Date headers

// Re-exports
pub use crate::domain::PropertyType;
pub use change_listener::{ChangeListener, PropertyChange};
pub use exposed::{ClassTable, Exposed, Notify};
pub use time_provider::{SystemTimeProvider, TimeProvider};
