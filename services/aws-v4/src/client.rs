use crate::classify::{parse_error_body, ClassifyError, DefaultErrorClassifier};
use crate::constants::{CONTENT_TYPE_AMZ_JSON, X_AMZ_TARGET};
use crate::provide_credential::{DefaultCredentialProvider, StaticCredentialProvider};
use crate::sign_request::RequestSigner;
use crate::{Config, Credential, CredentialScope};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Uri};
use log::{debug, warn};
use signpost_core::{Backoff, Context, Error, ErrorKind, ProvideCredential, Result, SignRequest};
use std::sync::Arc;
use std::time::Duration;

/// Default retry budget after the initial attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// Default upper bound for the first retry delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);

/// Client dispatches signed JSON protocol calls and retries the ones that
/// are worth retrying.
///
/// Every attempt resolves a credential, signs the request and sends it.
/// Failed responses go through a [`ClassifyError`] implementation; throttled,
/// capacity and transport failures are retried with full jitter backoff,
/// while authorization failures invalidate the credential first so the next
/// attempt signs with fresh material.
///
/// ## Example
///
/// ```no_run
/// use signpost_aws_v4::Client;
/// use signpost_core::Context;
///
/// # async fn example() -> signpost_core::Result<()> {
/// let client = Client::new(
///     Context::new(),
///     "DynamoDB_20120810",
///     "https://dynamodb.us-east-1.amazonaws.com",
///     "us-east-1",
///     "dynamodb",
/// )?;
/// let tables = client.call("ListTables", b"{}").await?;
/// println!("{}", String::from_utf8_lossy(&tables));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    ctx: Context,
    endpoint: Uri,
    api_version: String,
    scope: CredentialScope,

    provider: Arc<dyn ProvideCredential<Credential = Credential>>,
    signer: RequestSigner,
    classifier: Arc<dyn ClassifyError>,

    max_retries: usize,
    base_delay: Duration,
    timeout: Option<Duration>,
}

impl Client {
    /// Create a new client for the given endpoint and signing scope.
    ///
    /// `api_version` is the target prefix of the JSON protocol, e.g.
    /// `DynamoDB_20120810`. Credentials resolve through
    /// [`DefaultCredentialProvider`] unless
    /// [`Client::with_credential_provider`] replaces it.
    pub fn new(
        ctx: Context,
        api_version: &str,
        endpoint: &str,
        region: &str,
        service: &str,
    ) -> Result<Self> {
        let endpoint: Uri = endpoint
            .parse()
            .map_err(|err| Error::config_invalid("endpoint is not a valid uri").with_source(err))?;
        if endpoint.authority().is_none() {
            return Err(Error::config_invalid("endpoint has no authority"));
        }

        Ok(Self {
            ctx,
            endpoint,
            api_version: api_version.to_string(),
            scope: CredentialScope::new(region, service),

            provider: Arc::new(DefaultCredentialProvider::new()),
            signer: RequestSigner::new(service, region),
            classifier: Arc::new(DefaultErrorClassifier::new()),

            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            timeout: None,
        })
    }

    /// Create a new client from a resolved [`Config`].
    ///
    /// The region must be configured. The endpoint falls back to the
    /// regional `https://{service}.{region}.amazonaws.com` when not set, and
    /// configured static credentials take precedence over the default
    /// provider chain.
    pub fn from_config(
        ctx: Context,
        api_version: &str,
        service: &str,
        config: &Config,
    ) -> Result<Self> {
        let Some(region) = config.region.clone() else {
            return Err(Error::config_invalid("region is not configured"));
        };
        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{service}.{region}.amazonaws.com"),
        };

        let mut client = Self::new(ctx, api_version, &endpoint, &region, service)?;
        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let mut provider = StaticCredentialProvider::new(access_key_id, secret_access_key);
            if let Some(token) = &config.session_token {
                provider = provider.with_session_token(token);
            }
            client = client.with_credential_provider(provider);
        }
        if let Some(max_retries) = config.max_retries {
            client = client.with_max_retries(max_retries);
        }

        Ok(client)
    }

    /// Replace the credential provider.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Replace the error classifier.
    pub fn with_error_classifier(mut self, classifier: impl ClassifyError) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Set how many retries a call may spend after its initial attempt.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the upper bound for the first retry delay.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Bound the time a single attempt may wait for a response.
    ///
    /// Attempts that outlive the bound count as transport failures and are
    /// retried like any other.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Call the named operation with the given request body and return the
    /// response body.
    ///
    /// Retries run until the budget of `max_retries` is spent; the error
    /// that ends an exhausted call has [`Error::is_exhausted`] set so callers
    /// can tell it apart from one that failed fast.
    pub async fn call(&self, operation: &str, body: &[u8]) -> Result<Bytes> {
        let mut backoff = Backoff::new(self.max_retries, self.base_delay);

        loop {
            let err = match self.attempt(operation, body).await {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };

            // Authorization failures stay non-retryable for callers that end
            // up seeing them, but the loop gives a refreshed credential
            // another go.
            let may_retry = err.is_retryable() || err.kind() == ErrorKind::Authorization;
            if !may_retry {
                return Err(err);
            }
            if !backoff.can_retry() {
                warn!(
                    "{operation} failed after {} attempts: {err}",
                    backoff.tries() + 1
                );
                return Err(err.set_exhausted(true));
            }

            backoff.advance();
            debug!(
                "{operation} failed with {err}, retry {}/{} after at most {:?}",
                backoff.tries(),
                self.max_retries,
                backoff.sleep_bound()
            );
            backoff.wait().await;
        }
    }

    async fn attempt(&self, operation: &str, body: &[u8]) -> Result<Bytes> {
        let scope = self.scope.short();

        let credential = match self.provider.provide_credential(&self.ctx, &scope).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                return Err(Error::credential_invalid(format!(
                    "no credential available for scope {scope}"
                )))
            }
            // Source failures end the call; the retry budget only covers
            // request outcomes.
            Err(err) => return Err(err.set_retryable(false)),
        };

        let (mut parts, _) = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(X_AMZ_TARGET, format!("{}.{operation}", self.api_version))
            .header(CONTENT_TYPE, CONTENT_TYPE_AMZ_JSON)
            .body(())?
            .into_parts();

        self.signer
            .sign_request(&self.ctx, &mut parts, body, &credential)
            .await?;

        let req = Request::from_parts(parts, Bytes::copy_from_slice(body));
        let (parts, body) = self.send(req).await?.into_parts();
        if parts.status.as_u16() < 400 {
            return Ok(body);
        }

        let err = self
            .classifier
            .classify(parts.status, &parse_error_body(&body));
        if err.kind() == ErrorKind::Authorization {
            debug!("invalidating credential for scope {scope}: {err}");
            if let Err(err) = self
                .provider
                .invalidate_credential(&self.ctx, &scope, &credential, err.message())
                .await
            {
                return Err(err.set_retryable(false));
            }
        }

        Err(err)
    }

    async fn send(&self, req: Request<Bytes>) -> Result<http::Response<Bytes>> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.ctx.http_send(req))
                .await
                .map_err(|_| {
                    Error::transport(format!("no response within {}ms", timeout.as_millis()))
                })?,
            None => self.ctx.http_send(req).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::X_AMZ_DATE;
    use async_trait::async_trait;
    use http::header::AUTHORIZATION;
    use http::request::Parts;
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use signpost_core::HttpSend;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const API_VERSION: &str = "TestService_20250101";
    const ENDPOINT: &str = "https://testsvc.us-east-1.example.com";

    #[derive(Debug)]
    enum Reply {
        Status(StatusCode, &'static str),
        ConnectError,
    }

    #[derive(Clone, Debug, Default)]
    struct ScriptedHttpSend {
        replies: Arc<Mutex<VecDeque<Reply>>>,
        seen: Arc<Mutex<Vec<(Parts, Bytes)>>>,
    }

    impl ScriptedHttpSend {
        fn scripted(replies: Vec<Reply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn requests(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpSend for ScriptedHttpSend {
        async fn http_send(&self, req: Request<Bytes>) -> Result<http::Response<Bytes>> {
            let (parts, body) = req.into_parts();
            self.seen.lock().unwrap().push((parts, body));

            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Status(StatusCode::OK, "{}"));
            match reply {
                Reply::Status(status, body) => Ok(http::Response::builder()
                    .status(status)
                    .body(Bytes::from_static(body.as_bytes()))
                    .unwrap()),
                Reply::ConnectError => Err(Error::transport("connection refused")),
            }
        }
    }

    /// Serves the key at the current generation and bumps the generation on
    /// every invalidation.
    #[derive(Clone, Debug)]
    struct RotatingProvider {
        keys: Arc<Vec<&'static str>>,
        generation: Arc<AtomicUsize>,
    }

    impl RotatingProvider {
        fn new(keys: Vec<&'static str>) -> Self {
            Self {
                keys: Arc::new(keys),
                generation: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn invalidations(&self) -> usize {
            self.generation.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProvideCredential for RotatingProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context, _: &str) -> Result<Option<Credential>> {
            let generation = self.generation.load(Ordering::SeqCst).min(self.keys.len() - 1);
            Ok(Some(Credential {
                access_key_id: self.keys[generation].to_string(),
                secret_access_key: "secret_access_key".to_string(),
                ..Default::default()
            }))
        }

        async fn invalidate_credential(
            &self,
            _: &Context,
            _: &str,
            _: &Credential,
            _: &str,
        ) -> Result<()> {
            self.generation.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone, Debug)]
    struct EmptyProvider;

    #[async_trait]
    impl ProvideCredential for EmptyProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context, _: &str) -> Result<Option<Credential>> {
            Ok(None)
        }
    }

    #[derive(Clone, Debug)]
    struct FailingProvider;

    #[async_trait]
    impl ProvideCredential for FailingProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context, _: &str) -> Result<Option<Credential>> {
            Err(Error::transport("metadata service unreachable"))
        }
    }

    fn test_client(http: &ScriptedHttpSend) -> Client {
        let ctx = Context::new().with_http_send(http.clone());
        Client::new(ctx, API_VERSION, ENDPOINT, "us-east-1", "testsvc")
            .unwrap()
            .with_credential_provider(StaticCredentialProvider::new(
                "access_key_id",
                "secret_access_key",
            ))
            .with_base_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_call_signs_and_returns_body() -> anyhow::Result<()> {
        let http = ScriptedHttpSend::scripted(vec![Reply::Status(
            StatusCode::OK,
            r#"{"TableNames":[]}"#,
        )]);
        let client = test_client(&http);

        let body = client.call("ListTables", b"{}").await?;
        assert_eq!(body, Bytes::from_static(br#"{"TableNames":[]}"#));

        let seen = http.seen.lock().unwrap();
        let (parts, payload) = &seen[0];
        assert_eq!(parts.method, Method::POST);
        assert_eq!(parts.uri.to_string(), format!("{ENDPOINT}/"));
        assert_eq!(
            parts.headers[X_AMZ_TARGET].to_str()?,
            "TestService_20250101.ListTables"
        );
        assert_eq!(parts.headers[CONTENT_TYPE].to_str()?, CONTENT_TYPE_AMZ_JSON);
        assert!(parts.headers.contains_key(X_AMZ_DATE));

        let authorization = parts.headers[AUTHORIZATION].to_str()?;
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=access_key_id/"));
        assert!(authorization.contains("/us-east-1/testsvc/aws4_request"));
        assert_eq!(payload, &Bytes::from_static(b"{}"));

        Ok(())
    }

    #[tokio::test]
    async fn test_server_errors_consume_the_retry_budget() {
        let reply = || {
            Reply::Status(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"__type":"InternalFailure","message":"boom"}"#,
            )
        };
        let http = ScriptedHttpSend::scripted(vec![reply(), reply(), reply()]);
        let client = test_client(&http).with_max_retries(2);

        let err = client.call("ListTables", b"{}").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(err.is_exhausted());
        assert_eq!(err.code(), Some("InternalFailure"));
        assert_eq!(http.requests(), 3);
    }

    #[tokio::test]
    async fn test_throttling_is_retried_despite_client_status() {
        let http = ScriptedHttpSend::scripted(vec![
            Reply::Status(
                StatusCode::BAD_REQUEST,
                r#"{"__type":"ThrottlingException","message":"Rate exceeded"}"#,
            ),
            Reply::Status(StatusCode::OK, r#"{"ok":true}"#),
        ]);
        let client = test_client(&http);

        let body = client.call("PutItem", b"{}").await.unwrap();
        assert_eq!(body, Bytes::from_static(br#"{"ok":true}"#));
        assert_eq!(http.requests(), 2);
    }

    #[tokio::test]
    async fn test_fatal_client_error_is_not_retried() {
        let http = ScriptedHttpSend::scripted(vec![Reply::Status(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"ValidationException","message":"query shape is wrong"}"#,
        )]);
        let client = test_client(&http);

        let err = client.call("Query", b"{}").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(!err.is_retryable());
        assert!(!err.is_exhausted());
        assert_eq!(http.requests(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let http = ScriptedHttpSend::scripted(vec![Reply::Status(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"ResourceNotFoundException","message":"Requested resource not found"}"#,
        )]);
        let client = test_client(&http);

        let err = client.call("GetItem", b"{}").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(http.requests(), 1);
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let http = ScriptedHttpSend::scripted(vec![
            Reply::ConnectError,
            Reply::ConnectError,
            Reply::Status(StatusCode::OK, "{}"),
        ]);
        let client = test_client(&http);

        client.call("ListTables", b"{}").await.unwrap();
        assert_eq!(http.requests(), 3);
    }

    #[tokio::test]
    async fn test_authorization_failure_invalidates_then_signs_with_fresh_key() {
        let http = ScriptedHttpSend::scripted(vec![
            Reply::Status(
                StatusCode::FORBIDDEN,
                r#"{"__type":"ExpiredTokenException","message":"The security token included in the request is expired"}"#,
            ),
            Reply::Status(StatusCode::OK, "{}"),
        ]);
        let provider = RotatingProvider::new(vec!["stale_key", "fresh_key"]);
        let client = test_client(&http).with_credential_provider(provider.clone());

        client.call("ListTables", b"{}").await.unwrap();

        assert_eq!(provider.invalidations(), 1);
        let seen = http.seen.lock().unwrap();
        let first = seen[0].0.headers[AUTHORIZATION].to_str().unwrap();
        let second = seen[1].0.headers[AUTHORIZATION].to_str().unwrap();
        assert!(first.contains("Credential=stale_key/"));
        assert!(second.contains("Credential=fresh_key/"));
    }

    #[tokio::test]
    async fn test_exhausted_authorization_invalidated_every_attempt() {
        let reply = || {
            Reply::Status(
                StatusCode::FORBIDDEN,
                r#"{"__type":"UnrecognizedClientException","message":"The security token included in the request is invalid."}"#,
            )
        };
        let http = ScriptedHttpSend::scripted(vec![reply(), reply(), reply()]);
        let provider = RotatingProvider::new(vec!["k0", "k1", "k2", "k3"]);
        let client = test_client(&http)
            .with_credential_provider(provider.clone())
            .with_max_retries(2);

        let err = client.call("ListTables", b"{}").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(!err.is_retryable());
        assert!(err.is_exhausted());
        assert_eq!(http.requests(), 3);
        assert_eq!(provider.invalidations(), 3);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_sending() {
        let http = ScriptedHttpSend::scripted(vec![]);
        let client = test_client(&http).with_credential_provider(EmptyProvider);

        let err = client.call("ListTables", b"{}").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
        assert!(!err.is_exhausted());
        assert_eq!(http.requests(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_retried() {
        let http = ScriptedHttpSend::scripted(vec![]);
        let client = test_client(&http).with_credential_provider(FailingProvider);

        let err = client.call("ListTables", b"{}").await.unwrap_err();

        // The transport kind survives but the forced non-retryable flag ends
        // the call on the spot.
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.is_retryable());
        assert_eq!(http.requests(), 0);
    }

    #[derive(Clone, Debug)]
    struct SleepyHttpSend;

    #[async_trait]
    impl HttpSend for SleepyHttpSend {
        async fn http_send(&self, _: Request<Bytes>) -> Result<http::Response<Bytes>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(http::Response::new(Bytes::new()))
        }
    }

    #[tokio::test]
    async fn test_timeout_is_classified_as_transport() {
        let ctx = Context::new().with_http_send(SleepyHttpSend);
        let client = Client::new(ctx, API_VERSION, ENDPOINT, "us-east-1", "testsvc")
            .unwrap()
            .with_credential_provider(StaticCredentialProvider::new(
                "access_key_id",
                "secret_access_key",
            ))
            .with_base_delay(Duration::from_millis(1))
            .with_max_retries(0)
            .with_timeout(Duration::from_millis(5));

        let err = client.call("ListTables", b"{}").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_endpoint_without_authority_is_rejected() {
        let err = Client::new(
            Context::new(),
            API_VERSION,
            "/relative/path",
            "us-east-1",
            "testsvc",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[tokio::test]
    async fn test_from_config_uses_static_credentials() {
        let http = ScriptedHttpSend::scripted(vec![Reply::Status(StatusCode::OK, "{}")]);
        let config = Config {
            region: Some("eu-west-1".to_string()),
            endpoint: Some(ENDPOINT.to_string()),
            access_key_id: Some("config_key".to_string()),
            secret_access_key: Some("config_secret".to_string()),
            ..Default::default()
        };
        let client = Client::from_config(
            Context::new().with_http_send(http.clone()),
            API_VERSION,
            "testsvc",
            &config,
        )
        .unwrap()
        .with_base_delay(Duration::from_millis(1));

        client.call("ListTables", b"{}").await.unwrap();

        let seen = http.seen.lock().unwrap();
        let authorization = seen[0].0.headers[AUTHORIZATION].to_str().unwrap();
        assert!(authorization.contains("Credential=config_key/"));
        assert!(authorization.contains("/eu-west-1/testsvc/aws4_request"));
    }

    #[test]
    fn test_from_config_requires_region() {
        let err = Client::from_config(Context::new(), API_VERSION, "testsvc", &Config::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_from_config_derives_regional_endpoint() {
        let config = Config {
            region: Some("ap-southeast-2".to_string()),
            ..Default::default()
        };
        let client = Client::from_config(Context::new(), API_VERSION, "dynamodb", &config).unwrap();

        assert_eq!(client.endpoint.scheme_str(), Some("https"));
        assert_eq!(
            client.endpoint.authority().unwrap().as_str(),
            "dynamodb.ap-southeast-2.amazonaws.com"
        );
    }

    #[test]
    fn test_from_config_applies_retry_budget() {
        let config = Config {
            region: Some("us-east-1".to_string()),
            max_retries: Some(7),
            ..Default::default()
        };
        let client = Client::from_config(Context::new(), API_VERSION, "testsvc", &config).unwrap();
        assert_eq!(client.max_retries, 7);
    }
}
