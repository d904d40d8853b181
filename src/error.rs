//! Error types for classconfig library

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for classconfig operations
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Attribute Path
// =============================================================================

/// One step from a document root towards a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Mapping key (attribute name)
    Key(String),
    /// Sequence position
    Index(usize),
}

/// Location of a node inside a configuration document.
///
/// Rendered as dotted keys with bracketed sequence indices, e.g.
/// `storage.config.hooks[2].config.timeout`. The empty path renders as `<root>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributePath {
    segments: Vec<PathSegment>,
}

impl AttributePath {
    /// The document root
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of a mapping key below this path
    #[must_use]
    pub fn key(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(name.into()));
        Self { segments }
    }

    /// Path of a sequence element below this path
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// Error
// =============================================================================

/// Main error type for classconfig library
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Failed to parse configuration '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Failed to convert value: {0}")]
    Convert(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Document Errors
    // -------------------------------------------------------------------------
    /// Document structure does not match the attribute registry
    #[error("Schema error at '{path}': {reason}")]
    Schema { path: AttributePath, reason: String },

    /// A leaf value was rejected by its validator
    #[error("Invalid value at '{path}': {reason}")]
    Validation { path: AttributePath, reason: String },

    /// A transformer could not produce a value from its input
    #[error("Cannot transform value at '{path}': {reason}")]
    Transform { path: AttributePath, reason: String },

    /// A class name is not a registered descendant of the declared parent
    #[error(
        "Cannot resolve class '{name}' at '{path}': expected {family} or one of its registered subclasses"
    )]
    Resolution {
        path: AttributePath,
        name: String,
        family: String,
    },

    // -------------------------------------------------------------------------
    // Instantiation Errors
    // -------------------------------------------------------------------------
    /// Missing required attribute or unexpected keyword at construction time
    #[error("Cannot construct '{path}': {reason}")]
    Construction { path: AttributePath, reason: String },
}

impl Error {
    pub(crate) fn schema(path: &AttributePath, reason: impl Into<String>) -> Self {
        Error::Schema {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn construction(path: &AttributePath, reason: impl Into<String>) -> Self {
        Error::Construction {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Location of the offending node, for document-level errors
    #[must_use]
    pub fn path(&self) -> Option<&AttributePath> {
        match self {
            Error::Schema { path, .. }
            | Error::Validation { path, .. }
            | Error::Transform { path, .. }
            | Error::Resolution { path, .. }
            | Error::Construction { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Check if the document did not match the registry
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::Schema { .. })
    }

    /// Check if a value was rejected by a validator or transformer
    #[must_use]
    pub fn is_value_error(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::Transform { .. })
    }

    /// Check if a class name could not be resolved
    #[must_use]
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Error::Resolution { .. })
    }

    /// Check if an object could not be constructed from its arguments
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Error::Construction { .. })
    }

    /// Check if this is a file system error
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. } | Error::FileWrite { .. } | Error::DirectoryCreate { .. }
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        assert_eq!(AttributePath::root().to_string(), "<root>");

        let path = AttributePath::root()
            .key("storage")
            .key("config")
            .key("hooks")
            .index(2)
            .key("timeout");
        assert_eq!(path.to_string(), "storage.config.hooks[2].timeout");
    }

    #[test]
    fn test_error_carries_path() {
        let path = AttributePath::root().key("db").key("port");
        let err = Error::Validation {
            path: path.clone(),
            reason: "Value must be at least 1".into(),
        };

        assert_eq!(err.path(), Some(&path));
        assert!(err.is_value_error());
        assert!(!err.is_schema_error());
        assert_eq!(
            err.to_string(),
            "Invalid value at 'db.port': Value must be at least 1"
        );
    }

    #[test]
    fn test_resolution_message() {
        let err = Error::Resolution {
            path: AttributePath::root().key("storage").key("cls"),
            name: "Unknown".into(),
            family: "dyn Storage".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'Unknown'"));
        assert!(msg.contains("dyn Storage"));
        assert!(err.is_resolution_error());
    }
}
