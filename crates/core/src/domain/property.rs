// Property Descriptor - registration-time metadata for one exposed property

use super::value::ValueKind;
use serde::Serialize;

/// Capability set of a property (subset of {readable, writable})
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub readable: bool,
    pub writable: bool,
}

impl Capabilities {
    pub const READ_ONLY: Capabilities = Capabilities {
        readable: true,
        writable: false,
    };
    pub const WRITE_ONLY: Capabilities = Capabilities {
        readable: false,
        writable: true,
    };
    pub const READ_WRITE: Capabilities = Capabilities {
        readable: true,
        writable: true,
    };
}

/// Immutable once built; the registry never re-derives it per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDescriptor {
    name: String,
    kind: ValueKind,
    capabilities: Capabilities,
    notify: Option<String>,
}

impl PropertyDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: ValueKind,
        capabilities: Capabilities,
        notify: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            capabilities,
            notify,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_readable(&self) -> bool {
        self.capabilities.readable
    }

    pub fn is_writable(&self) -> bool {
        self.capabilities.writable
    }

    /// Name of the change-notification channel, if the property notifies
    pub fn notify_channel(&self) -> Option<&str> {
        self.notify.as_deref()
    }
}
