/// Errors from the DuoTrack REST layer.
///
/// Timeouts, 4xx and 5xx are not distinguished beyond the status code:
/// callers surface [`user_message`](ApiError::user_message) and move on.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("DuoTrack API error ({status}): {}", api_detail(.message, .body))]
    Api {
        status: u16,
        /// The backend's `message` field, when the body carried one.
        message: Option<String>,
        /// The raw response body, kept for logs when it has no `message`.
        body: String,
    },

    /// Authentication succeeded but the response carried no token.
    #[error("Authentication response did not include a token")]
    MissingToken,
}

/// What an [`ApiError::Api`] displays: the backend message, else the raw
/// body, else a placeholder.
fn api_detail<'a>(message: &'a Option<String>, body: &'a str) -> &'a str {
    match message.as_deref() {
        Some(m) if !m.trim().is_empty() => m,
        _ if !body.trim().is_empty() => body.trim(),
        _ => "no message",
    }
}

impl ApiError {
    /// The backend's own message if it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// HTTP status for backend rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            ApiError::MissingToken => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
