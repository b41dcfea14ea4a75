use thiserror::Error;

/// Result type alias for authscope operations
pub type Result<T> = std::result::Result<T, AuthScopeError>;

/// Errors that can occur during authorization discovery
#[derive(Error, Debug)]
pub enum AuthScopeError {
    /// A discovery run was started while another one is in flight
    #[error("discovery is already running")]
    AlreadyRunning,

    /// External command could not be started
    #[error("failed to run `{program}`: {reason}")]
    CommandSpawn {
        /// Program that was invoked
        program: String,
        /// Underlying failure
        reason: String,
    },

    /// External command exceeded its time budget
    #[error("`{program}` timed out after {secs} seconds")]
    CommandTimeout {
        /// Program that was invoked
        program: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// Command output could not be interpreted
    #[error("parse error: {0}")]
    Parse(String),

    /// One probe could not produce data
    #[error("probe `{probe}` failed: {reason}")]
    Probe {
        /// Name of the failing probe
        probe: String,
        /// What went wrong
        reason: String,
    },

    /// A surface section could not be reached or enumerated
    #[error("navigation to `{section}` failed: {reason}")]
    Navigation {
        /// Section that was being visited
        section: String,
        /// What went wrong
        reason: String,
    },

    /// The settings surface cannot be activated at all
    #[error("surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// One poll of the event source failed
    #[error("event source error: {0}")]
    EventSource(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthScopeError {
    /// Returns true if the error ends a whole run rather than one step of it
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SurfaceUnavailable(_) | Self::Config(_))
    }

    /// Returns true if the caller should log the error and move on
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CommandSpawn { .. }
                | Self::CommandTimeout { .. }
                | Self::Parse(_)
                | Self::Probe { .. }
                | Self::Navigation { .. }
                | Self::EventSource(_)
        )
    }
}
