//! Error kinds reported by the retrieval workflow.
//!
//! Every failure is surfaced to the caller as one of these; nothing panics
//! and nothing is retried.

use thiserror::Error;

/// Failures while resolving the device location.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location services are turned off")]
    Unavailable,

    /// `permanent` means the user opted out of future prompts and has to
    /// change it in settings; otherwise the caller should explain why the
    /// permission is needed and ask again.
    #[error("Location permission denied{}", permanence_suffix(.permanent))]
    PermissionDenied { permanent: bool },

    #[error("Location updates ended before a position was reported")]
    NoFix,

    #[error("Timed out waiting for a location fix")]
    Timeout,

    #[error("Location lookup failed: {0}")]
    Lookup(String),

    #[error("Invalid coordinates: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Location request cancelled")]
    Cancelled,
}

fn permanence_suffix(permanent: &bool) -> &'static str {
    if *permanent { " permanently" } else { "" }
}

/// How a non-success HTTP status is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    BadRequest,
    NotFound,
    Generic,
}

impl ServerErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ServerErrorKind::BadRequest,
            404 => ServerErrorKind::NotFound,
            _ => ServerErrorKind::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerErrorKind::BadRequest => "bad request",
            ServerErrorKind::NotFound => "not found",
            ServerErrorKind::Generic => "generic server error",
        }
    }
}

impl std::fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures while fetching weather for resolved coordinates.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No internet connection available")]
    NoConnectivity,

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Weather API returned {status} ({kind}): {body}")]
    Server { status: u16, kind: ServerErrorKind, body: String },

    #[error("Weather API returned a malformed body: {0}")]
    MalformedResponse(String),

    #[error("Weather request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn server(status: u16, body: String) -> Self {
        FetchError::Server { status, kind: ServerErrorKind::from_status(status), body }
    }

    /// Classification of a server error, if this is one.
    pub fn server_kind(&self) -> Option<ServerErrorKind> {
        match self {
            FetchError::Server { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Anything the end-to-end workflow can report.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
