use std::{error::Error, fmt, io};

/// The tracking module's result type.
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Failures while talking to the tracking service or its model registry.
#[derive(Debug)]
pub enum TrackingError {
    /// The request never produced a response (connection refused, timeout, ...).
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    Api {
        endpoint: String,
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// The response body did not have the expected shape.
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    /// The service answered, but the answer breaks the registry protocol.
    Protocol(String),
    /// The tracking URI is not an http(s) endpoint.
    UnsupportedTrackingUri(String),
    /// The run's artifact location is neither proxied by the service nor a
    /// `gs://` bucket.
    UnsupportedArtifactUri(String),
    /// Writing to the object store behind the artifact location failed.
    Storage {
        location: String,
        source: object_store::Error,
    },
    /// Building the blocking runtime or the HTTP client failed.
    Io(io::Error),
}

impl TrackingError {
    /// The registry error code, e.g. `RESOURCE_ALREADY_EXISTS`, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            TrackingError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::Http { endpoint, source } => {
                write!(f, "request to {endpoint} failed: {source}")
            }
            TrackingError::Api {
                endpoint,
                status,
                code,
                message,
            } => match code {
                Some(code) => write!(f, "{endpoint} returned {status} ({code}): {message}"),
                None => write!(f, "{endpoint} returned {status}: {message}"),
            },
            TrackingError::Decode { endpoint, source } => {
                write!(f, "invalid response from {endpoint}: {source}")
            }
            TrackingError::Protocol(msg) => write!(f, "registry protocol error: {msg}"),
            TrackingError::UnsupportedTrackingUri(uri) => {
                write!(f, "tracking uri {uri} is not an http(s) endpoint")
            }
            TrackingError::UnsupportedArtifactUri(uri) => {
                write!(f, "cannot upload artifacts to {uri}")
            }
            TrackingError::Storage { location, source } => {
                write!(f, "cannot write {location}: {source}")
            }
            TrackingError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for TrackingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrackingError::Http { source, .. } => Some(source),
            TrackingError::Decode { source, .. } => Some(source),
            TrackingError::Storage { source, .. } => Some(source),
            TrackingError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrackingError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
