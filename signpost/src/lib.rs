#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use signpost_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::DefaultContext;

#[cfg(feature = "aws")]
pub mod aws {
    //! AWS Signature Version 4 signing and dispatch.
    pub use signpost_aws_v4::*;
}
