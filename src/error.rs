//! Error types for the HUD → Chroma lighting bridge.

use thiserror::Error;

/// Primary error type for lighting operations.
#[derive(Error, Debug)]
pub enum GlowError {
    // Lighting service errors
    #[error("Chroma service not reachable at {url}. Is Razer Synapse / Chroma SDK running?")]
    ServiceUnreachable { url: String },

    #[error("Chroma session gone (HTTP {status})")]
    SessionGone { status: u16 },

    #[error("{method} {url} failed: HTTP {status}")]
    HttpStatus {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response from Chroma service: {0}")]
    InvalidResponse(String),

    #[error("Chroma session manager is closed")]
    SessionClosed,

    // Configuration errors
    #[error("Invalid {name} zone: row {row}, columns {first_col}..={last_col} (grid is {rows}x{cols})")]
    InvalidZone {
        name: &'static str,
        row: usize,
        first_col: usize,
        last_col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid color '{0}': expected an integer, #RRGGBB, 0xRRGGBB or decimal string")]
    InvalidColor(String),

    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // Lifecycle errors
    #[error("Poller has been shut down")]
    SchedulerShutDown,

    #[error("Lighting runtime has been shut down")]
    RuntimeShutDown,

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl GlowError {
    /// Returns true if the service reported the session as expired (404/410).
    pub const fn is_session_gone(&self) -> bool {
        matches!(self, Self::SessionGone { .. })
    }

    /// Returns true for failures the next periodic attempt may not see again.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnreachable { .. } | Self::Transport(_) | Self::SessionGone { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ServiceUnreachable { .. } => {
                Some("Start Razer Synapse and enable the Chroma SDK / Chroma Connect")
            }
            Self::InvalidZone { .. } => Some("Rows are 0-5 and columns 0-21 with first <= last"),
            Self::InvalidColor(_) => Some("Use a color like \"#FF8800\""),
            Self::ConfigParse(_) => Some("Run: glow init --force"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using GlowError.
pub type Result<T> = std::result::Result<T, GlowError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| GlowError::Other(format!("{}: {e}", f().into())))
    }
}
