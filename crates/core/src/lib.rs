// PropBridge Core - Property Registry, Dynamic Values & Ports
// NO transport dependencies: both protocol adapters build on this crate.

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::registry::{BoundProperty, PropertyRegistry, Registration, DEFAULT_VERSION};
pub use application::shutdown::{shutdown_channel, ShutdownSignal, ShutdownToken};
pub use domain::{Capabilities, ChangeSignal, DynamicValue, PropertyDescriptor, ValueKind};
pub use error::{PropertyError, Result};
pub use port::{ChangeListener, ClassTable, Exposed, Notify, PropertyChange, PropertyType};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
