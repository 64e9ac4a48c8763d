/// Errors returned by the Retainly client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Local input validation failure. Never reaches the network.
    #[error("validation error: {0}")]
    Validation(String),

    /// Error reported by the identity provider or a backend function.
    #[error("{operation} failed: {detail}")]
    Provider {
        operation: &'static str,
        status: Option<u16>,
        /// Structured error code, when the provider sends one.
        code: Option<String>,
        detail: String,
    },

    /// Network or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Checkout confirmation failure. Does not invalidate the session.
    #[error("checkout error: {0}")]
    Checkout(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) const EMAIL_NOT_CONFIRMED_CODE: &'static str = "email_not_confirmed";

    /// True when the provider rejected a sign-in because the email address
    /// has not been confirmed yet.
    ///
    /// Prefers the provider's structured `error_code`; falls back to the
    /// legacy message substring for providers that predate the code.
    #[must_use]
    pub fn is_email_not_confirmed(&self) -> bool {
        match self {
            Self::Provider { code, detail, .. } => {
                code.as_deref() == Some(Self::EMAIL_NOT_CONFIRMED_CODE)
                    || detail.contains("Email not confirmed")
            }
            _ => false,
        }
    }
}
