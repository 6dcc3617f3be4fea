use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;

use signpost_core::time::{now, DateTime};
use signpost_core::utils::Redact;
use signpost_core::SigningCredential;

/// Credential that holds the access_key and secret_key.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id for aws services.
    pub access_key_id: String,
    /// Secret access key for aws services.
    pub secret_access_key: String,
    /// Session token for aws services.
    pub session_token: Option<String>,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return false;
        }
        // Take 120s as buffer to avoid edge cases.
        if let Some(valid) = self
            .expires_in
            .map(|v| v > now() + chrono::TimeDelta::try_minutes(2).expect("in bounds"))
        {
            return valid;
        }

        true
    }
}

/// CredentialScope names the region/service pair a signature is valid for.
///
/// The scope shows up in two places: its short form keys credential lookups,
/// and its full form, extended with the signing date, is embedded into every
/// signature. A signature made for one scope never verifies in another.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CredentialScope {
    region: String,
    service: String,
}

impl CredentialScope {
    /// Create a scope from region and service names.
    pub fn new(region: &str, service: &str) -> Self {
        Self {
            region: region.to_string(),
            service: service.to_string(),
        }
    }

    /// The region this scope signs for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The service this scope signs for.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The short form used as a credential lookup key: `region/service`.
    pub fn short(&self) -> String {
        format!("{}/{}", self.region, self.service)
    }

    /// The full form embedded in signatures:
    /// `date/region/service/aws4_request`.
    pub fn full(&self, date: &str) -> String {
        format!("{}/{}/{}/aws4_request", date, self.region, self.service)
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.service)
    }
}
