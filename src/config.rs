use std::env;
use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the storage account name.
pub const ACCOUNT_ENV_VAR: &str = "AZURE_STORAGE_ACCOUNT_NAME";

/// Environment variable holding the SAS token.
pub const SAS_TOKEN_ENV_VAR: &str = "AZURE_STORAGE_SAS_TOKEN";

/// Credentials for one invocation, resolved once at startup and passed down
/// by reference. Nothing below the command layer reads the environment.
#[derive(Clone)]
pub struct Config {
    pub account: String,
    pub sas_token: String,
}

impl Config {
    /// Resolve the configuration from the process environment.
    ///
    /// Either variable missing or empty is a [`Error::MissingConfig`]
    /// failure before any I/O happens.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve the configuration through an injectable lookup, so tests can
    /// exercise resolution without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account = lookup(ACCOUNT_ENV_VAR).filter(|v| !v.is_empty());
        let sas_token = lookup(SAS_TOKEN_ENV_VAR).filter(|v| !v.is_empty());
        match (account, sas_token) {
            (Some(account), Some(sas_token)) => Ok(Self { account, sas_token }),
            _ => Err(Error::MissingConfig),
        }
    }

    /// Derive the account's blob endpoint. Pure string-to-URL construction,
    /// no network I/O; fails only if the account name yields an unparseable
    /// URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let endpoint = format!("https://{}.blob.core.windows.net", self.account);
        Url::parse(&endpoint).map_err(|source| Error::InvalidEndpoint {
            account: self.account.clone(),
            source,
        })
    }
}

// The SAS token is a credential and must never reach logs or panic output.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("account", &self.account)
            .field("sas_token", &"<redacted>")
            .finish()
    }
}
