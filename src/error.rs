use thiserror::Error;

/// Failure taxonomy for upstream fetches and configuration.
///
/// Variants carry rendered messages rather than wrapped source errors so
/// that a completed refresh outcome can be cloned to every caller that
/// coalesced onto the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GaugeError {
    /// HTTP 404 — the station id does not exist upstream. Retrying cannot
    /// succeed until the user corrects the id.
    #[error("station {0} not found; verify the station id")]
    StationNotFound(String),

    /// The station fetch exceeded its deadline.
    #[error("timed out fetching station {0}")]
    UpstreamTimeout(String),

    /// Non-200 response other than 404. Body is truncated before it is
    /// carried here.
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// Transport or decode failure.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Setup-time validation failure.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GaugeError>;

impl GaugeError {
    /// Localized error key shown by the host's setup wizard when station
    /// validation fails during entry creation.
    pub fn error_key(&self) -> &'static str {
        match self {
            GaugeError::StationNotFound(_) => "station_not_found",
            GaugeError::UpstreamTimeout(_) => "timeout",
            GaugeError::UpstreamStatus { .. } | GaugeError::Upstream(_) => "cannot_connect",
            GaugeError::Config(_) => "invalid_station",
        }
    }

    /// Whether a later retry can succeed without user action.
    pub fn is_transient(&self) -> bool {
        !matches!(self, GaugeError::StationNotFound(_) | GaugeError::Config(_))
    }
}
