//! OAuth client configuration, built once at startup.

use tracing::warn;

use super::providers::Provider;
use crate::common::config::{ConfigError, Lookup};

const DEFAULT_POST_LOGIN_REDIRECT: &str = "http://localhost:3000";

/// Where a provider's authorization server and account API live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    /// Base of the account API; profile paths are appended to it.
    pub api_base: String,
}

impl ProviderEndpoints {
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Google => Self {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                api_base: "https://www.googleapis.com".to_string(),
            },
            Provider::GitHub => Self {
                auth_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                api_base: "https://api.github.com".to_string(),
            },
        }
    }
}

/// Client credentials for one identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub endpoints: ProviderEndpoints,
}

impl ProviderConfig {
    /// Both halves of the client credential are present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    fn from_lookup(provider: Provider, lookup: Lookup<'_>) -> Self {
        let prefix = provider.env_prefix();
        let client_id = lookup(&format!("{}_CLIENT_ID", prefix)).unwrap_or_default();
        let client_secret = lookup(&format!("{}_CLIENT_SECRET", prefix)).unwrap_or_default();
        let redirect_url = lookup(&format!("{}_REDIRECT_URL", prefix)).unwrap_or_else(|| {
            format!("http://localhost:8080/auth/{}/callback", provider.slug())
        });

        if client_id.is_empty() {
            warn!("{}_CLIENT_ID is not set - {} OAuth will not work", prefix, provider);
        }
        if client_secret.is_empty() {
            warn!("{}_CLIENT_SECRET is not set - {} OAuth will not work", prefix, provider);
        }

        Self {
            client_id,
            client_secret,
            redirect_url,
            endpoints: ProviderEndpoints::for_provider(provider),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub google: ProviderConfig,
    pub github: ProviderConfig,
    /// Where the callback sends the browser when the initiate request
    /// named no `redirect_uri`.
    pub default_redirect: String,
}

impl OAuthConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let default_redirect = lookup("OAUTH_DEFAULT_REDIRECT")
            .unwrap_or_else(|| DEFAULT_POST_LOGIN_REDIRECT.to_string());
        if !default_redirect.starts_with("http://") && !default_redirect.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "OAUTH_DEFAULT_REDIRECT must be an http(s) URL: {}",
                default_redirect
            )));
        }

        Ok(Self {
            google: ProviderConfig::from_lookup(Provider::Google, lookup),
            github: ProviderConfig::from_lookup(Provider::GitHub, lookup),
            default_redirect,
        })
    }

    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Google => &self.google,
            Provider::GitHub => &self.github,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        let client = |provider: Provider| ProviderConfig {
            client_id: format!("{}-client", provider.slug()),
            client_secret: format!("{}-secret", provider.slug()),
            redirect_url: format!("http://localhost:8080/auth/{}/callback", provider.slug()),
            endpoints: ProviderEndpoints::for_provider(provider),
        };
        Self {
            google: client(Provider::Google),
            github: client(Provider::GitHub),
            default_redirect: DEFAULT_POST_LOGIN_REDIRECT.to_string(),
        }
    }
}
