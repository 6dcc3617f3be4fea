use http::StatusCode;
use serde_json::Value;
use signpost_core::Error;

/// Error codes that signal the caller is pushing faster than the service
/// will accept. Retried regardless of HTTP status because several services
/// report throttling with a 400.
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "SlowDown",
    "RequestThrottled",
    "RequestThrottledException",
];

/// Error codes for exhausted provisioned capacity. Distinct from throttling
/// so callers can react differently, but retried the same way.
const CAPACITY_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "LimitExceededException",
];

/// Error codes that point at the credential or the signature derived from
/// it. These feed the credential invalidation path before any retry.
const AUTHORIZATION_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "AccessDeniedException",
    "IncompleteSignature",
    "MissingAuthenticationToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
];

const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException", "NotFoundException"];

/// The error code and message a service returned alongside a non-success
/// status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorBody {
    /// Service error code with any namespace prefix stripped, e.g.
    /// `ThrottlingException` out of `com.amazonaws.dynamodb.v20120810#ThrottlingException`.
    pub code: Option<String>,
    /// Human readable message, empty if the service sent none.
    pub message: String,
}

/// Parse an error response body in the `application/x-amz-json-1.0` shape.
///
/// Bodies that are not JSON or not an object come back empty rather than
/// failing; classification then falls back to the HTTP status alone.
pub fn parse_error_body(body: &[u8]) -> ErrorBody {
    let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
        return ErrorBody::default();
    };

    let code = fields
        .get("__type")
        .and_then(Value::as_str)
        // The code may carry a `namespace#` prefix.
        .and_then(|v| v.rsplit('#').next())
        .map(str::to_string);
    let message = fields
        .get("Message")
        .or_else(|| fields.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    ErrorBody { code, message }
}

/// ClassifyError turns a failed response into an [`Error`] whose kind and
/// retryability drive the dispatch loop.
pub trait ClassifyError: std::fmt::Debug + Send + Sync + 'static {
    /// Classify a response that came back with a non-success status.
    fn classify(&self, status: StatusCode, body: &ErrorBody) -> Error;
}

/// The stock classifier for AWS style JSON protocol errors.
///
/// Codes are matched first since services frequently return throttling and
/// authorization errors under generic 400s; the HTTP status only decides
/// retryability for codes nothing matched.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrorClassifier;

impl DefaultErrorClassifier {
    /// Create a new default classifier.
    pub fn new() -> Self {
        Self
    }
}

impl ClassifyError for DefaultErrorClassifier {
    fn classify(&self, status: StatusCode, body: &ErrorBody) -> Error {
        let message = if body.message.is_empty() {
            format!("remote service returned status {status}")
        } else {
            body.message.clone()
        };

        let mut err = match body.code.as_deref() {
            Some(code) if THROTTLING_CODES.contains(&code) => Error::throttling(message),
            Some(code) if CAPACITY_CODES.contains(&code) => Error::capacity_exceeded(message),
            Some(code) if AUTHORIZATION_CODES.contains(&code) => Error::authorization(message),
            Some(code) if NOT_FOUND_CODES.contains(&code) => Error::not_found(message),
            _ => Error::service(message).set_retryable(status.is_server_error()),
        };
        if let Some(code) = &body.code {
            err = err.with_code(code);
        }

        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use signpost_core::ErrorKind;

    fn classify(status: StatusCode, body: &[u8]) -> Error {
        DefaultErrorClassifier::new().classify(status, &parse_error_body(body))
    }

    #[test]
    fn test_parse_error_body_strips_namespace() {
        let body = parse_error_body(
            br#"{"__type":"com.amazonaws.dynamodb.v20120810#ProvisionedThroughputExceededException","message":"The level of configured provisioned throughput for the table was exceeded."}"#,
        );

        assert_eq!(
            body,
            ErrorBody {
                code: Some("ProvisionedThroughputExceededException".to_string()),
                message: "The level of configured provisioned throughput for the table was \
                          exceeded."
                    .to_string(),
            }
        );
    }

    #[test]
    fn test_parse_error_body_prefers_capitalized_message() {
        let body =
            parse_error_body(br#"{"__type":"OopsException","Message":"Upper","message":"lower"}"#);
        assert_eq!(body.message, "Upper");
    }

    #[test]
    fn test_parse_error_body_tolerates_garbage() {
        assert_eq!(parse_error_body(b"<html>bad gateway</html>"), ErrorBody::default());
        assert_eq!(parse_error_body(b""), ErrorBody::default());
        assert_eq!(parse_error_body(b"[1,2,3]"), ErrorBody::default());
    }

    #[test]
    fn test_throttling_is_retryable_even_as_client_error() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            br#"{"__type":"ThrottlingException","message":"Rate exceeded"}"#,
        );

        assert_eq!(err.kind(), ErrorKind::Throttling);
        assert!(err.is_retryable());
        assert_eq!(err.code(), Some("ThrottlingException"));
        assert_eq!(err.message(), "Rate exceeded");
    }

    #[test]
    fn test_capacity_exceeded_is_retryable() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            br#"{"__type":"ProvisionedThroughputExceededException","message":"over budget"}"#,
        );

        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_authorization_codes_map_to_authorization_kind() {
        for code in AUTHORIZATION_CODES {
            let body = format!(r#"{{"__type":"{code}","message":"denied"}}"#);
            let err = classify(StatusCode::FORBIDDEN, body.as_bytes());

            assert_eq!(err.kind(), ErrorKind::Authorization, "code: {code}");
            assert!(!err.is_retryable(), "code: {code}");
        }
    }

    #[test]
    fn test_not_found_is_fatal() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            br#"{"__type":"ResourceNotFoundException","message":"Requested resource not found"}"#,
        );

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unknown_code_falls_back_to_status() {
        let client = classify(
            StatusCode::BAD_REQUEST,
            br#"{"__type":"ValidationException","message":"bad shape"}"#,
        );
        assert_eq!(client.kind(), ErrorKind::Service);
        assert!(!client.is_retryable());
        assert_eq!(client.code(), Some("ValidationException"));

        let server = classify(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"__type":"InternalFailure","message":"try again"}"#,
        );
        assert_eq!(server.kind(), ErrorKind::Service);
        assert!(server.is_retryable());
    }

    #[test]
    fn test_empty_body_gets_status_message() {
        let err = classify(StatusCode::SERVICE_UNAVAILABLE, b"");

        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(err.is_retryable());
        assert_eq!(
            err.message(),
            "remote service returned status 503 Service Unavailable"
        );
        assert_eq!(err.code(), None);
    }
}
