use crate::provide_credential::{
    EnvCredentialProvider, MetadataCredentialProvider, ProvideCredentialChain,
};
use crate::Credential;
use async_trait::async_trait;
use signpost_core::{Context, ProvideCredential, Result};

/// DefaultCredentialProvider resolves credentials the way most deployments
/// expect:
///
/// 1. Environment variables
/// 2. The instance metadata service
///
/// The order is fixed; use [`ProvideCredentialChain`] directly when a
/// different arrangement is needed.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new DefaultCredentialProvider.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(MetadataCredentialProvider::new());

        Self { chain }
    }

    /// Create a DefaultCredentialProvider with a custom chain.
    pub fn with_chain(chain: ProvideCredentialChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(
        &self,
        ctx: &Context,
        scope: &str,
    ) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx, scope).await
    }

    async fn invalidate_credential(
        &self,
        ctx: &Context,
        scope: &str,
        credential: &Self::Credential,
        reason: &str,
    ) -> Result<()> {
        self.chain
            .invalidate_credential(ctx, scope, credential, reason)
            .await
    }
}
