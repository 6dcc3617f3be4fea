//! Error handling for the signpost library.

use std::fmt;

use thiserror::Error;

/// Classifies what went wrong so callers can decide how to react.
///
/// Every kind carries a default answer to "is another attempt worth it?",
/// which [`Error`] picks up on construction and which classifiers may
/// override per error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The remote service rejected or failed the request and no more
    /// specific kind applies.
    Service,
    /// The remote service is shedding load and asked us to slow down.
    Throttling,
    /// A provisioned capacity limit was exceeded.
    CapacityExceeded,
    /// The request was rejected because its signature or credential was
    /// not accepted.
    Authorization,
    /// The addressed resource does not exist.
    NotFound,
    /// The request never produced a usable response: connect failures,
    /// timeouts, broken transfers.
    Transport,
    /// Credentials are missing, expired, or could not be resolved.
    CredentialInvalid,
    /// The request itself cannot be signed or sent as constructed.
    RequestInvalid,
    /// The configuration is malformed or incomplete.
    ConfigInvalid,
    /// The catch-all for everything unexpected.
    Unexpected,
}

impl ErrorKind {
    /// Whether errors of this kind are worth retrying when nothing more
    /// specific is known.
    pub fn retryable_by_default(&self) -> bool {
        matches!(
            self,
            ErrorKind::Throttling | ErrorKind::CapacityExceeded | ErrorKind::Transport
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Service => write!(f, "Service"),
            ErrorKind::Throttling => write!(f, "Throttling"),
            ErrorKind::CapacityExceeded => write!(f, "CapacityExceeded"),
            ErrorKind::Authorization => write!(f, "Authorization"),
            ErrorKind::NotFound => write!(f, "NotFound"),
            ErrorKind::Transport => write!(f, "Transport"),
            ErrorKind::CredentialInvalid => write!(f, "CredentialInvalid"),
            ErrorKind::RequestInvalid => write!(f, "RequestInvalid"),
            ErrorKind::ConfigInvalid => write!(f, "ConfigInvalid"),
            ErrorKind::Unexpected => write!(f, "Unexpected"),
        }
    }
}

/// The error type used throughout signpost.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,

    /// The wire-level error code reported by the remote service, when one
    /// was present in the response.
    code: Option<String>,
    retryable: bool,
    exhausted: bool,

    #[source]
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message.
    ///
    /// Retryability starts at the kind's default and may be adjusted with
    /// [`Error::set_retryable`].
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            retryable: kind.retryable_by_default(),
            exhausted: false,
            source: None,
        }
    }

    /// Attach the underlying cause of this error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the remote error code this error was classified from.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Override whether another attempt might succeed.
    pub fn set_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Mark that the retry budget was spent before this error was returned.
    pub fn set_exhausted(mut self, exhausted: bool) -> Self {
        self.exhausted = exhausted;
        self
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The remote error code, if the response carried one.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Whether all allowed attempts were used up before this error was
    /// returned.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Create an error for plain remote service failures.
    pub fn service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Service, message)
    }

    /// Create an error for throttled requests.
    pub fn throttling(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Throttling, message)
    }

    /// Create an error for exceeded capacity limits.
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityExceeded, message)
    }

    /// Create an error for rejected signatures or credentials.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create an error for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an error for failures that produced no usable response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create an error for unusable credentials.
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create an error for requests that cannot be signed or sent.
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create an error for malformed configuration.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an error for unexpected failures.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::unexpected(err.to_string()).with_source(err)
    }
}

impl From<fmt::Error> for Error {
    fn from(err: fmt::Error) -> Self {
        Error::unexpected("formatting failed").with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::request_invalid("failed to build http request").with_source(err)
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Error::request_invalid("invalid http header value").with_source(err)
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Error::request_invalid("http header value is not valid ascii").with_source(err)
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Error::request_invalid("invalid http uri").with_source(err)
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Error::request_invalid("invalid http uri parts").with_source(err)
    }
}

/// A `Result` alias where the `Err` case is `signpost_core::Error`.
pub type Result<T> = std::result::Result<T, Error>;
