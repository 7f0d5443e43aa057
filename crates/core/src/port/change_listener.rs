// Change Listener Port
// Receives every readable property change the registry resolves from a
// notification channel. The JSON-RPC Notification Fan-out is the production
// implementation.

use crate::domain::DynamicValue;

/// A resolved property change, value already reread through the registry
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub class_id: String,
    pub property: String,
    pub value: DynamicValue,
}

impl PropertyChange {
    /// `Class.property`
    pub fn method(&self) -> String {
        format!("{}.{}", self.class_id, self.property)
    }
}

/// Listener interface (called synchronously on the emitting thread)
pub trait ChangeListener: Send + Sync {
    fn property_changed(&self, change: &PropertyChange);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every change it receives
    #[derive(Default)]
    pub struct RecordingListener {
        changes: Mutex<Vec<PropertyChange>>,
    }

    impl RecordingListener {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn changes(&self) -> Vec<PropertyChange> {
            self.changes.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.changes.lock().unwrap().len()
        }

        pub fn last(&self) -> Option<PropertyChange> {
            self.changes.lock().unwrap().last().cloned()
        }
    }

    impl ChangeListener for RecordingListener {
        fn property_changed(&self, change: &PropertyChange) {
            self.changes.lock().unwrap().push(change.clone());
        }
    }
}
