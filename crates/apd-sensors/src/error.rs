//! Error types for sensor collection and sensor loading.

use thiserror::Error;

/// Result type alias using [`SensorError`].
pub type Result<T> = std::result::Result<T, SensorError>;

/// Message reported to callers for failures that are not classified.
pub const UNHANDLED_MESSAGE: &str = "Unhandled error";

/// Errors a sensor can report instead of a value.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The sensor's prerequisite will not become available in this process.
    #[error("{0}")]
    Persistent(String),

    /// A transient read failure; the next poll may succeed.
    #[error("{0}")]
    Intermittent(String),

    /// The sensor does not provide this capability.
    #[error("Not implemented")]
    NotImplemented,

    /// I/O error outside the sensor's own classification.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be converted to or from its JSON form.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Anything else.
    #[error("{0}")]
    Unexpected(String),
}

impl SensorError {
    /// Returns true for errors whose message is meant for callers.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            SensorError::Persistent(_) | SensorError::Intermittent(_) | SensorError::NotImplemented
        )
    }

    /// Returns the message to publish for this error.
    ///
    /// Unclassified errors never leak their detail.
    pub fn public_message(&self) -> String {
        if self.is_classified() {
            self.to_string()
        } else {
            UNHANDLED_MESSAGE.to_string()
        }
    }
}

/// User-facing errors from resolving a sensor by path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// Path is not of the form `module:Type`.
    #[error("Sensor path must be in the format dotted.path.to.module:TypeName")]
    MalformedPath(String),

    /// No module registered under that path.
    #[error("Could not import module {0}")]
    UnknownModule(String),

    /// The module has no item with that name.
    #[error("Could not find attribute {name} in {module}")]
    UnknownType { module: String, name: String },

    /// The item exists but is not a concrete sensor.
    #[error("Detected object {0} is not recognised as a Sensor type")]
    NotASensor(String),
}

impl LoaderError {
    /// Stable code reported as the process exit status.
    pub fn code(&self) -> u8 {
        match self {
            LoaderError::MalformedPath(_) => 17,
            LoaderError::UnknownModule(_) => 18,
            LoaderError::UnknownType { .. } => 19,
            LoaderError::NotASensor(_) => 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SensorError::Persistent("gone".into()).is_classified());
        assert!(SensorError::Intermittent("flaky".into()).is_classified());
        assert!(SensorError::NotImplemented.is_classified());
        assert!(!SensorError::Unexpected("boom".into()).is_classified());
        assert!(!SensorError::Io(std::io::Error::other("disk")).is_classified());
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = SensorError::Unexpected("secret path /root/x".into());
        assert_eq!(err.public_message(), "Unhandled error");

        let err = SensorError::Intermittent("Could not read probe".into());
        assert_eq!(err.public_message(), "Could not read probe");
    }

    #[test]
    fn test_loader_codes_are_distinct() {
        let errors = [
            LoaderError::MalformedPath("x".into()),
            LoaderError::UnknownModule("x".into()),
            LoaderError::UnknownType {
                module: "x".into(),
                name: "y".into(),
            },
            LoaderError::NotASensor("x:y".into()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(LoaderError::code).collect();
        codes.dedup();
        assert_eq!(codes, vec![17, 18, 19, 20]);
    }
}
