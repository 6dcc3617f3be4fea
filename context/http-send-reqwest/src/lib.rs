//! Reqwest-backed [`HttpSend`] implementation for signpost.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};
use signpost_core::{Error, HttpSend, Result};

/// ReqwestHttpSend sends requests through a [`reqwest::Client`].
///
/// Anything that keeps a response from arriving, from connect failures to
/// interrupted body transfers, surfaces as a transport error so callers can
/// treat it as retriable.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a configured [`reqwest::Client`].
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|err| Error::request_invalid("request is not sendable").with_source(err))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|err| Error::transport("sending http request failed").with_source(err))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|err| Error::transport("reading response body failed").with_source(err))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
