use thiserror::Error;

/// All errors that can occur when using the Affectiva client.
#[derive(Error, Debug)]
pub enum AffectivaError {
    /// Credentials or client configuration are unusable (e.g. no password
    /// was passed and the environment variable is unset).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A transport-level HTTP error from reqwest (DNS, connection refused, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON the client expected.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// A non-2xx response, with the HTTP status code and raw body.
    #[error("API error {status_code}: {body}")]
    Api { status_code: u16, body: String },

    /// The server rejected the request over a violated precondition
    /// (HTTP 409/412), e.g. uploading a representation whose filename the
    /// entry already carries.
    #[error("precondition failed ({status_code}): {body}")]
    Precondition { status_code: u16, body: String },

    /// No representation on the job matched the requested content type.
    /// The message lists the content types that were available, in the
    /// order the server returned them.
    #[error("could not match content type '{content_type}'; available content types: [{}]", .available.join(", "))]
    RepresentationNotFound {
        content_type: String,
        available: Vec<String>,
    },

    /// An I/O error reading a local media file or writing a download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience alias for `Result<T, AffectivaError>`.
pub type Result<T> = std::result::Result<T, AffectivaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representation_not_found_lists_types_in_order() {
        let err = AffectivaError::RepresentationNotFound {
            content_type: "application/csv".to_string(),
            available: vec![
                "application/vnd.affectiva.session.v0+json".to_string(),
                "image/png".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "could not match content type 'application/csv'; available content types: \
             [application/vnd.affectiva.session.v0+json, image/png]"
        );
    }
}
