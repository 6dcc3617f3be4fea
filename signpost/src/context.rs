use async_trait::async_trait;
use bytes::Bytes;
use signpost_core::{Env, HttpSend, Result};
use signpost_http_send_reqwest::ReqwestHttpSend;
use std::collections::HashMap;
use std::env;

/// DefaultContext bundles the stock context implementations: HTTP through
/// reqwest and environment access through [`std::env`].
///
/// ```no_run
/// use signpost::{Context, DefaultContext};
///
/// let ctx_impl = DefaultContext::new();
/// let ctx = Context::new()
///     .with_http_send(ctx_impl.clone())
///     .with_env(ctx_impl);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DefaultContext {
    http: ReqwestHttpSend,
}

impl DefaultContext {
    /// Create a context backed by a default reqwest client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context backed by a custom reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            http: ReqwestHttpSend::new(client),
        }
    }
}

#[async_trait]
impl HttpSend for DefaultContext {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }
}

impl Env for DefaultContext {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn vars(&self) -> HashMap<String, String> {
        env::vars().collect()
    }
}
