use crate::constants::{AWS_EC2_METADATA_DISABLED, AWS_EC2_METADATA_SERVICE_ENDPOINT};
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::Method;
use log::{debug, warn};
use serde::Deserialize;
use signpost_core::time::{now, parse_rfc3339, DateTime};
use signpost_core::{Context, Error, ProvideCredential, Result, SigningCredential};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default address of the instance metadata service.
const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";

/// Metadata session token lifetime. 21600s (6h) is recommended by AWS.
const TOKEN_TTL_SECONDS: i64 = 21600;

/// MetadataCredentialProvider fetches rotating credentials from an
/// IMDSv2-style instance metadata service.
///
/// Fetched credentials are cached next to their expiry and reused until
/// they stop being valid. The whole check-then-fetch sequence runs inside
/// one async critical section, so concurrent callers cannot turn a single
/// cache miss into parallel fetches against the metadata service.
///
/// A credential rejected by the remote service can be dropped from the
/// cache through [`ProvideCredential::invalidate_credential`]; the next
/// lookup then resolves fresh material.
#[derive(Debug, Clone, Default)]
pub struct MetadataCredentialProvider {
    endpoint: Option<String>,
    cache: Arc<Mutex<Cache>>,
}

#[derive(Debug, Default)]
struct Cache {
    token: Option<(String, DateTime)>,
    credential: Option<Credential>,
}

impl MetadataCredentialProvider {
    /// Create a new MetadataCredentialProvider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint of the metadata service.
    ///
    /// Takes precedence over `AWS_EC2_METADATA_SERVICE_ENDPOINT` and the
    /// well-known default address.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn endpoint(&self, ctx: &Context) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
        })
    }

    async fn fetch_token(&self, ctx: &Context, cache: &mut Cache) -> Result<String> {
        if let Some((token, expires_in)) = &cache.token {
            if *expires_in > now() {
                return Ok(token.clone());
            }
        }

        let endpoint = self.endpoint(ctx);
        let req = http::Request::builder()
            .uri(format!("{endpoint}/latest/api/token"))
            .method(Method::PUT)
            .header(CONTENT_LENGTH, "0")
            .header(
                "x-aws-ec2-metadata-token-ttl-seconds",
                TOKEN_TTL_SECONDS.to_string(),
            )
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected(format!(
                "metadata service refused to issue a session token: status {}",
                resp.status()
            )));
        }

        let token = resp.into_body();
        // Refresh well before the nominal lifetime runs out.
        let expires_in = now()
            + chrono::TimeDelta::try_seconds(TOKEN_TTL_SECONDS - 600).expect("in bounds");
        cache.token = Some((token.clone(), expires_in));

        Ok(token)
    }

    async fn fetch_credential(&self, ctx: &Context, token: &str) -> Result<Credential> {
        let endpoint = self.endpoint(ctx);

        // The service first names the role attached to the instance, then
        // hands out the actual material under that role.
        let req = http::Request::builder()
            .uri(format!(
                "{endpoint}/latest/meta-data/iam/security-credentials/"
            ))
            .method(Method::GET)
            .header("x-aws-ec2-metadata-token", token)
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected(format!(
                "listing instance roles failed: status {}",
                resp.status()
            )));
        }

        let role = resp.into_body();
        if role.is_empty() {
            return Err(Error::config_invalid("instance has no role attached"));
        }

        let req = http::Request::builder()
            .uri(format!(
                "{endpoint}/latest/meta-data/iam/security-credentials/{role}"
            ))
            .method(Method::GET)
            .header("x-aws-ec2-metadata-token", token)
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected(format!(
                "fetching credentials for role {role} failed: status {}",
                resp.status()
            )));
        }

        let content = resp.into_body();
        let resp: MetadataSecurityCredentials = serde_json::from_str(&content).map_err(|err| {
            Error::unexpected("metadata credentials response is not parsable").with_source(err)
        })?;

        match resp.code.as_str() {
            "Success" => {}
            "AssumeRoleUnauthorizedAccess" => {
                return Err(Error::credential_invalid(format!(
                    "instance is not authorized to assume role {role}: {}",
                    resp.message
                )));
            }
            code if code.contains("Expired") => {
                return Err(Error::credential_invalid(format!(
                    "metadata credentials for role {role} expired: {}",
                    resp.message
                )));
            }
            code => {
                return Err(Error::unexpected(format!(
                    "metadata service returned error: [{code}] {}",
                    resp.message
                )));
            }
        }

        Ok(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration)?),
        })
    }
}

#[async_trait]
impl ProvideCredential for MetadataCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(
        &self,
        ctx: &Context,
        _scope: &str,
    ) -> Result<Option<Self::Credential>> {
        let disabled = ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .map(|v| v == "true")
            .unwrap_or(false);
        if disabled {
            return Ok(None);
        }

        // One critical section covers check, fetch and store: two concurrent
        // cache misses cannot both decide to refresh.
        let mut cache = self.cache.lock().await;
        if let Some(cred) = &cache.credential {
            if cred.is_valid() {
                return Ok(Some(cred.clone()));
            }
        }

        let token = self.fetch_token(ctx, &mut cache).await?;
        let cred = self.fetch_credential(ctx, &token).await?;
        debug!("loaded fresh credential from instance metadata: {cred:?}");

        cache.credential = Some(cred.clone());
        Ok(Some(cred))
    }

    async fn invalidate_credential(
        &self,
        _ctx: &Context,
        scope: &str,
        credential: &Self::Credential,
        reason: &str,
    ) -> Result<()> {
        let mut cache = self.cache.lock().await;

        // Drop only if the rejected credential is the one still cached; a
        // concurrent refresh may already have replaced it.
        if let Some(cached) = &cache.credential {
            if cached.access_key_id == credential.access_key_id {
                warn!("dropping cached metadata credential for {scope}: {reason}");
                cache.credential = None;
            }
        }

        Ok(())
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct MetadataSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}
