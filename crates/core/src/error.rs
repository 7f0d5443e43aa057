// Central Error Type for registry operations

use thiserror::Error;

/// Registry-level error type
///
/// Both adapters map these onto their own wire taxonomies, so the variants
/// keep "class unknown" and "property unknown" apart even though neither
/// protocol distinguishes them on the wire.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Property not found: {class}.{property}")]
    PropertyNotFound { class: String, property: String },

    #[error("Exposed object for class {0} has been dropped")]
    ObjectDropped(String),

    #[error("Property {class}.{property} is not readable")]
    NotReadable { class: String, property: String },

    #[error("Property {class}.{property} is not writable")]
    NotWritable { class: String, property: String },

    #[error("Write to {class}.{property} rejected: {reason}")]
    WriteRejected {
        class: String,
        property: String,
        reason: String,
    },
}

impl PropertyError {
    /// True for every variant that means "nothing addressable under this name".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PropertyError::ClassNotFound(_)
                | PropertyError::PropertyNotFound { .. }
                | PropertyError::ObjectDropped(_)
        )
    }
}

/// Result type alias using PropertyError
pub type Result<T> = std::result::Result<T, PropertyError>;
