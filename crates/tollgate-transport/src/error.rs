use thiserror::Error;

/// Top-level error type for the `tollgate-transport` crate.
///
/// Covers every failure mode of the Bot API surface: HTTP transport,
/// structured API rejections, rate limiting, and payload decoding.
/// `tollgate-core` maps these into domain-appropriate variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── API rejections ──────────────────────────────────────────────
    /// Structured error from the Bot API (`ok: false` envelope).
    #[error("Bot API error (code {code}): {description}")]
    Api { code: i64, description: String },

    /// Rate limited by the Bot API. Includes retry-after in seconds.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the API reports that the target chat no longer
    /// exists or the bot has been removed from it.
    ///
    /// These rejections mean the destination is gone for good and the
    /// caller should clean up its records, not retry.
    pub fn is_destination_missing(&self) -> bool {
        match self {
            Self::Api { code, description } => {
                let desc = description.to_ascii_lowercase();
                matches!(code, 400 | 403)
                    && (desc.contains("chat not found")
                        || desc.contains("bot was kicked")
                        || desc.contains("bot is not a member")
                        || desc.contains("chat was deleted"))
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } => true,
            _ => false,
        }
    }
}
