use anyhow::Result;
use signpost::aws::{Client, Config};
use signpost::{Context, DefaultContext};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // Create a default context implementation
    let ctx_impl = DefaultContext::new();

    // Create a Context from the implementation
    let ctx = Context::new()
        .with_http_send(ctx_impl.clone())
        .with_env(ctx_impl);

    // Resolve region, endpoint and credentials from the environment
    let config = Config::default().from_env(&ctx);

    // Create the dispatching client
    let client = Client::from_config(ctx, "DynamoDB_20120810", "dynamodb", &config)?;

    // Call an operation; retries and credential refresh happen inside
    let tables = client.call("ListTables", b"{}").await?;
    println!("tables: {}", String::from_utf8_lossy(&tables));

    Ok(())
}
