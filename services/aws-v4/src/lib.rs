//! AWS Signature Version 4 signing and dispatch.
//!
//! This crate signs requests with [Signature Version 4](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
//! and drives JSON protocol calls through a retrying dispatcher. Credentials
//! resolve through composable providers, failed responses are classified by
//! their service error code, and rejected credentials get invalidated so the
//! next attempt signs with fresh material.
//!
//! ## Example
//!
//! ```no_run
//! use signpost_aws_v4::{Client, Config};
//! use signpost_core::{Context, OsEnv};
//!
//! #[tokio::main]
//! async fn main() -> signpost_core::Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let config = Config::default().from_env(&ctx);
//!
//!     let client = Client::from_config(ctx, "DynamoDB_20120810", "dynamodb", &config)?;
//!     let tables = client.call("ListTables", b"{}").await?;
//!     println!("{}", String::from_utf8_lossy(&tables));
//!     Ok(())
//! }
//! ```

mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::{Credential, CredentialScope};

mod classify;
pub use classify::{parse_error_body, ClassifyError, DefaultErrorClassifier, ErrorBody};

mod client;
pub use client::{Client, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::RequestSigner;
