use std::env;

use anyhow::Result;
use log::warn;
use signpost_aws_v4::{Client, Config};
use signpost_core::{Context, OsEnv};
use signpost_http_send_reqwest::ReqwestHttpSend;

/// Live tests against a real service, gated behind `SIGNPOST_AWS_V4_TEST=on`.
///
/// Required environment:
///
/// - `SIGNPOST_AWS_V4_SERVICE`: signing name, e.g. `dynamodb`
/// - `SIGNPOST_AWS_V4_TARGET`: target prefix, e.g. `DynamoDB_20120810`
/// - `SIGNPOST_AWS_V4_OPERATION`: operation to call, e.g. `ListTables`
///
/// Credentials and region resolve the usual way (`AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`, or the instance metadata service).
fn init_client() -> Result<Option<Client>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("SIGNPOST_AWS_V4_TEST").unwrap_or_default() != "on" {
        return Ok(None);
    }

    let ctx = Context::new()
        .with_env(OsEnv)
        .with_http_send(ReqwestHttpSend::default());
    let config = Config::default().from_env(&ctx);

    let service =
        env::var("SIGNPOST_AWS_V4_SERVICE").expect("env SIGNPOST_AWS_V4_SERVICE must set");
    let target = env::var("SIGNPOST_AWS_V4_TARGET").expect("env SIGNPOST_AWS_V4_TARGET must set");

    Ok(Some(Client::from_config(ctx, &target, &service, &config)?))
}

#[tokio::test]
async fn test_json_call() -> Result<()> {
    let Some(client) = init_client()? else {
        warn!("SIGNPOST_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let operation =
        env::var("SIGNPOST_AWS_V4_OPERATION").expect("env SIGNPOST_AWS_V4_OPERATION must set");
    let body = env::var("SIGNPOST_AWS_V4_BODY").unwrap_or_else(|_| "{}".to_string());

    let resp = client.call(&operation, body.as_bytes()).await?;
    println!("{}", String::from_utf8_lossy(&resp));

    Ok(())
}

#[tokio::test]
async fn test_unknown_operation_is_classified() -> Result<()> {
    let Some(client) = init_client()? else {
        warn!("SIGNPOST_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let err = client
        .call("DefinitelyNotAnOperation", b"{}")
        .await
        .expect_err("unknown operation must fail");

    // The service rejects the target outright, which must neither burn the
    // retry budget nor look like a credential problem.
    assert!(!err.is_retryable());
    assert!(!err.is_exhausted());

    Ok(())
}
