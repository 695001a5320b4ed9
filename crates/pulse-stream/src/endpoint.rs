//! Stream endpoint addressing

use std::fmt;

/// Query parameter carrying the tenant scope.
pub const TENANT_PARAM: &str = "tenant";

/// A single logical stream, optionally scoped to a tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// Resource URL, e.g. "http://127.0.0.1:8080/api/events/stream"
    pub url: String,
    /// Tenant identifier sent as `?tenant=<id>`.
    pub tenant: Option<String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tenant: None,
        }
    }

    pub fn with_tenant(mut self, tenant: Option<String>) -> Self {
        self.tenant = tenant.filter(|t| !t.trim().is_empty());
        self
    }

    /// Full URL as it would be requested, for logging.
    pub fn display_url(&self) -> String {
        match &self.tenant {
            Some(tenant) => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}{}={}", self.url, sep, TENANT_PARAM, tenant)
            }
            None => self.url.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_url())
    }
}
