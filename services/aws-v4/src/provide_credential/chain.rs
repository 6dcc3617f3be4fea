use crate::Credential;
use async_trait::async_trait;
use log::debug;
use signpost_core::{Context, ProvideCredential, Result};

/// ProvideCredentialChain tries a list of providers in order and returns the
/// first credential found.
///
/// A provider that fails or has nothing to offer just passes the turn to the
/// next one; the chain only gives up once every member has. Credential
/// invalidation is fanned out to all members, since the chain does not
/// remember which of them produced a given credential.
#[derive(Debug, Default)]
pub struct ProvideCredentialChain {
    providers: Vec<Box<dyn ProvideCredential<Credential = Credential>>>,
}

impl ProvideCredentialChain {
    /// Create a new, empty provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a provider to the end of the chain.
    pub fn push(mut self, provider: impl ProvideCredential<Credential = Credential>) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

#[async_trait]
impl ProvideCredential for ProvideCredentialChain {
    type Credential = Credential;

    async fn provide_credential(
        &self,
        ctx: &Context,
        scope: &str,
    ) -> Result<Option<Self::Credential>> {
        for provider in &self.providers {
            debug!("trying to load credential via {provider:?}");
            match provider.provide_credential(ctx, scope).await {
                Ok(Some(credential)) => {
                    debug!("loaded credential via {provider:?}");
                    return Ok(Some(credential));
                }
                Ok(None) => continue,
                Err(err) => {
                    debug!("failed to load credential via {provider:?}: {err:?}");
                    continue;
                }
            }
        }

        Ok(None)
    }

    async fn invalidate_credential(
        &self,
        ctx: &Context,
        scope: &str,
        credential: &Self::Credential,
        reason: &str,
    ) -> Result<()> {
        for provider in &self.providers {
            provider
                .invalidate_credential(ctx, scope, credential, reason)
                .await?;
        }

        Ok(())
    }
}
