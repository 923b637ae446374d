use thiserror::Error;

/// Why a single weather lookup failed.
///
/// The `Display` text is what the user sees in the chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("City not found. Please check the spelling.")]
    NotFound,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Error parsing API data.")]
    ParseError,

    #[error("Network error. Please try again later.")]
    NetworkError,

    #[error("Request error: HTTP {0}")]
    HttpError(u16),
}

/// Failures detected by a command handler before any lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("❌ Please enter a city name, e.g., {prefix}{command} London")]
    EmptyInput { prefix: String, command: String },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}
