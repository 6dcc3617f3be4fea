use async_trait::async_trait;
use http::request::Parts;
use signpost_core::hash::hex_hmac_sha256;
use signpost_core::{Context, ProvideCredential, Result, SignRequest, SigningCredential, StaticEnv};
use std::collections::HashMap;

// Define a custom credential type
#[derive(Clone, Debug)]
struct ApiKeyCredential {
    key_id: String,
    secret: String,
}

impl SigningCredential for ApiKeyCredential {
    fn is_valid(&self) -> bool {
        !self.key_id.is_empty() && !self.secret.is_empty()
    }
}

// Implement a credential provider that resolves from the environment
#[derive(Debug)]
struct EnvApiKeyProvider;

#[async_trait]
impl ProvideCredential for EnvApiKeyProvider {
    type Credential = ApiKeyCredential;

    async fn provide_credential(
        &self,
        ctx: &Context,
        _scope: &str,
    ) -> Result<Option<Self::Credential>> {
        let (Some(key_id), Some(secret)) =
            (ctx.env_var("MY_API_KEY_ID"), ctx.env_var("MY_API_SECRET"))
        else {
            return Ok(None);
        };

        Ok(Some(ApiKeyCredential { key_id, secret }))
    }
}

// Implement a signer for a toy HMAC scheme: the payload digest goes into a header
#[derive(Debug)]
struct ApiKeySigner;

#[async_trait]
impl SignRequest for ApiKeySigner {
    type Credential = ApiKeyCredential;

    async fn sign_request(
        &self,
        _ctx: &Context,
        req: &mut Parts,
        payload: &[u8],
        cred: &Self::Credential,
    ) -> Result<()> {
        let signature = hex_hmac_sha256(cred.secret.as_bytes(), payload);

        req.headers.insert("x-api-key", cred.key_id.parse()?);
        req.headers.insert("x-api-signature", signature.parse()?);

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A static environment keeps the example self-contained; use `OsEnv`
    // to read the real process environment instead.
    let ctx = Context::new().with_env(StaticEnv {
        envs: HashMap::from_iter([
            ("MY_API_KEY_ID".to_string(), "demo-key".to_string()),
            ("MY_API_SECRET".to_string(), "demo-secret".to_string()),
        ]),
    });

    let provider = EnvApiKeyProvider;
    let signer = ApiKeySigner;

    let (mut parts, body) = http::Request::builder()
        .method("POST")
        .uri("https://api.example.com/v1/items")
        .body(r#"{"name": "example"}"#)?
        .into_parts();

    let Some(cred) = provider.provide_credential(&ctx, "demo").await? else {
        println!("no credential found in environment");
        return Ok(());
    };

    signer
        .sign_request(&ctx, &mut parts, body.as_bytes(), &cred)
        .await?;

    println!("signed request headers:");
    for (name, value) in parts.headers.iter() {
        println!("  {name}: {value:?}");
    }

    Ok(())
}
