// Application Layer - registry and lifecycle

pub mod registry;
pub mod shutdown;

// Re-exports
pub use registry::{BoundProperty, PropertyRegistry, Registration, DEFAULT_VERSION};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownToken};
