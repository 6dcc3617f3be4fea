//! Example of composing a custom credential provider chain.

use signpost_aws_v4::{
    Client, Credential, EnvCredentialProvider, MetadataCredentialProvider, ProvideCredentialChain,
};
use signpost_core::{Context, OsEnv, ProvideCredential};
use signpost_http_send_reqwest::ReqwestHttpSend;

/// A custom credential provider that always returns a fixed credential.
#[derive(Debug)]
struct FixedCredentialProvider {
    access_key_id: String,
    secret_access_key: String,
}

#[async_trait::async_trait]
impl ProvideCredential for FixedCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(
        &self,
        _ctx: &Context,
        scope: &str,
    ) -> signpost_core::Result<Option<Self::Credential>> {
        println!("loading credential from fixed provider for scope {scope}");
        Ok(Some(Credential {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            session_token: None,
            expires_in: None,
        }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let ctx = Context::new()
        .with_env(OsEnv)
        .with_http_send(ReqwestHttpSend::default());

    // Environment first, then the fixed fallback, then the instance
    // metadata service.
    let chain = ProvideCredentialChain::new()
        .push(EnvCredentialProvider::new())
        .push(FixedCredentialProvider {
            access_key_id: "example_key".to_string(),
            secret_access_key: "example_secret".to_string(),
        })
        .push(MetadataCredentialProvider::new());

    match chain.provide_credential(&ctx, "us-east-1/dynamodb").await? {
        Some(cred) => println!("resolved credential: {cred:?}"),
        None => println!("no credential found"),
    }

    // The same chain plugged into a dispatching client.
    let client = Client::new(
        ctx,
        "DynamoDB_20120810",
        "https://dynamodb.us-east-1.amazonaws.com",
        "us-east-1",
        "dynamodb",
    )?
    .with_credential_provider(chain);

    match client.call("ListTables", b"{}").await {
        Ok(resp) => println!("tables: {}", String::from_utf8_lossy(&resp)),
        Err(err) => println!("call failed: {err}"),
    }

    Ok(())
}
