use std::fmt::Debug;

use log::debug;
use signpost_core::utils::Redact;
use signpost_core::Context;

use crate::constants::*;

/// Config carries the env-derived settings for talking to one aws service.
///
/// Explicitly assigned fields win over the environment: [`Config::from_env`]
/// only fills what is still unset. The environment is always read through
/// the context's `Env`, so tests can pin values with `StaticEnv` instead of
/// mutating process state.
#[derive(Clone, Default)]
pub struct Config {
    /// Signing region, like `us-east-1`.
    ///
    /// Resolved from `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`.
    pub region: Option<String>,
    /// Endpoint override, like `http://localhost:8000`.
    ///
    /// Resolved from `AWS_ENDPOINT_URL`. When unset, clients derive the
    /// conventional `https://{service}.{region}.amazonaws.com` endpoint.
    pub endpoint: Option<String>,
    /// Static access key id, resolved from `AWS_ACCESS_KEY_ID`.
    pub access_key_id: Option<String>,
    /// Static secret access key, resolved from `AWS_SECRET_ACCESS_KEY`.
    pub secret_access_key: Option<String>,
    /// Session token for temporary credentials, resolved from
    /// `AWS_SESSION_TOKEN`.
    pub session_token: Option<String>,
    /// Retries allowed after the first attempt.
    ///
    /// Resolved from `AWS_MAX_ATTEMPTS`, which counts total attempts, so the
    /// stored value is one less.
    pub max_retries: Option<usize>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Config {
    /// Fill unset fields from the environment.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if self.region.is_none() {
            self.region = ctx
                .env_var(AWS_REGION)
                .or_else(|| ctx.env_var(AWS_DEFAULT_REGION));
        }
        if self.endpoint.is_none() {
            self.endpoint = ctx.env_var(AWS_ENDPOINT_URL);
        }
        if self.access_key_id.is_none() {
            self.access_key_id = ctx.env_var(AWS_ACCESS_KEY_ID);
        }
        if self.secret_access_key.is_none() {
            self.secret_access_key = ctx.env_var(AWS_SECRET_ACCESS_KEY);
        }
        if self.session_token.is_none() {
            self.session_token = ctx.env_var(AWS_SESSION_TOKEN);
        }
        if self.max_retries.is_none() {
            self.max_retries = ctx.env_var(AWS_MAX_ATTEMPTS).and_then(|v| {
                match v.parse::<usize>() {
                    Ok(attempts) => Some(attempts.saturating_sub(1)),
                    Err(_) => {
                        debug!("ignoring unparsable {AWS_MAX_ATTEMPTS}: {v}");
                        None
                    }
                }
            });
        }

        self
    }
}
