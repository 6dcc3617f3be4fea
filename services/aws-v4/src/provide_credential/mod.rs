//! Credential providers for aws services.

mod chain;
pub use chain::ProvideCredentialChain;

mod default;
pub use default::DefaultCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod metadata;
pub use metadata::MetadataCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;
