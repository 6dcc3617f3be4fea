//! Example of dispatching a JSON protocol call with retries.

use std::time::Duration;

use signpost_aws_v4::{Client, Config};
use signpost_core::{Context, OsEnv};
use signpost_http_send_reqwest::ReqwestHttpSend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let ctx = Context::new()
        .with_env(OsEnv)
        .with_http_send(ReqwestHttpSend::default());

    // Region, endpoint and credentials resolve from the environment; set
    // AWS_REGION and AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY before running.
    let config = Config::default().from_env(&ctx);

    let client = Client::from_config(ctx, "DynamoDB_20120810", "dynamodb", &config)?
        .with_max_retries(5)
        .with_base_delay(Duration::from_millis(100))
        .with_timeout(Duration::from_secs(10));

    match client.call("ListTables", b"{}").await {
        Ok(resp) => println!("tables: {}", String::from_utf8_lossy(&resp)),
        Err(err) if err.is_exhausted() => println!("gave up after retries: {err}"),
        Err(err) => println!("call failed: {err}"),
    }

    Ok(())
}
