use crate::{Context, Result};
use std::fmt::Debug;

/// SigningCredential is the material a signer derives signatures from.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is still usable for signing.
    ///
    /// Credentials that are incomplete or about to expire must report
    /// `false` so cached copies get refreshed instead of producing
    /// signatures the remote side will reject.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential resolves credentials from wherever they live: static
/// configuration, the environment, or a metadata service.
///
/// The `scope` parameter names the region/service pair the credentials will
/// sign for, so providers that partition material per scope can key their
/// caches on it. Providers that hand out one credential regardless of scope
/// are free to ignore it.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: SigningCredential;

    /// Resolve a credential for the given scope.
    ///
    /// Returns `Ok(None)` when this provider has nothing to offer, which is
    /// not an error: chained providers use it to fall through to the next
    /// source.
    async fn provide_credential(
        &self,
        ctx: &Context,
        scope: &str,
    ) -> Result<Option<Self::Credential>>;

    /// Report that the remote side rejected a credential this provider
    /// handed out.
    ///
    /// Providers that cache must drop the rejected material so the next
    /// [`ProvideCredential::provide_credential`] call resolves fresh
    /// credentials. The default implementation does nothing, which is
    /// correct for providers without a cache.
    async fn invalidate_credential(
        &self,
        _ctx: &Context,
        _scope: &str,
        _credential: &Self::Credential,
        _reason: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// SignRequest computes a signature over a request and attaches it.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: SigningCredential;

    /// Sign the request in place.
    ///
    /// `payload` is the exact body the request will be sent with; signers
    /// bind it into the signature, so callers must not alter the body
    /// afterwards.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        payload: &[u8],
        credential: &Self::Credential,
    ) -> Result<()>;
}
