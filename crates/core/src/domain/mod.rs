// Domain Layer - value model, descriptors, notification channels

pub mod property;
pub mod signal;
pub mod value;

// Re-exports
pub use property::{Capabilities, PropertyDescriptor};
pub use signal::{ChangeSignal, Subscription};
pub use value::{DynamicValue, PropertyType, ValueKind};
