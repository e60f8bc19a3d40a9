//! Identity provider clients (Google, GitHub).
//!
//! Each client drives the provider half of the authorization-code flow
//! through an `oauth2` [`BasicClient`]: build the authorization URL and
//! exchange the returned code for an access token. The account profile is
//! then read from the provider's API with plain `reqwest` calls.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use reqwest::{header, redirect, Client};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use super::config::{OAuthConfig, ProviderConfig};
use super::linkage::split_name;
use crate::common::ApiError;

const GOOGLE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];
const GOOGLE_USERINFO_PATH: &str = "/oauth2/v2/userinfo";

const GITHUB_SCOPES: [&str; 1] = ["user:email"];
const GITHUB_USER_PATH: &str = "/user";
const GITHUB_EMAILS_PATH: &str = "/user/emails";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("standoff-api/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    GitHub,
}

impl Provider {
    /// Path segment under `/auth/`.
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }

    pub fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Google => "GOOGLE",
            Provider::GitHub => "GITHUB",
        }
    }

    /// Column on `users` holding this provider's account id.
    pub fn id_column(&self) -> &'static str {
        match self {
            Provider::Google => "google_id",
            Provider::GitHub => "github_id",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::GitHub => "GitHub",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("OAuth not configured")]
    NotConfigured,

    #[error("failed to exchange code for token: {0}")]
    Exchange(String),

    #[error("failed to get user info: {0}")]
    Provider(String),

    #[error("invalid OAuth endpoint: {0}")]
    Endpoint(String),
}

impl From<OAuthError> for ApiError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::NotConfigured | OAuthError::Endpoint(_) => {
                ApiError::InternalServer(e.to_string())
            }
            OAuthError::Exchange(_) => ApiError::ExchangeError(e.to_string()),
            OAuthError::Provider(_) => ApiError::ProviderError(e.to_string()),
        }
    }
}

/// What a provider tells us about the account that just signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub provider_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn is_configured(&self) -> bool;

    /// URL to send the browser to, carrying `state` through the round trip.
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    /// Trades an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalProfile, OAuthError>;
}

/// The configured clients, one per supported provider.
#[derive(Clone)]
pub struct OAuthProviders {
    google: Arc<dyn IdentityProvider>,
    github: Arc<dyn IdentityProvider>,
}

impl OAuthProviders {
    pub fn new(google: Arc<dyn IdentityProvider>, github: Arc<dyn IdentityProvider>) -> Self {
        Self { google, github }
    }

    pub fn from_config(config: &OAuthConfig) -> Self {
        let client = http_client();
        Self::new(
            Arc::new(GoogleProvider::new(
                config.provider(Provider::Google).clone(),
                client.clone(),
            )),
            Arc::new(GitHubProvider::new(
                config.provider(Provider::GitHub).clone(),
                client,
            )),
        )
    }

    pub fn get(&self, provider: Provider) -> &Arc<dyn IdentityProvider> {
        match provider {
            Provider::Google => &self.google,
            Provider::GitHub => &self.github,
        }
    }
}

/// Shared by the token exchange and the profile calls. Redirects are not
/// followed so a token endpoint cannot bounce the code elsewhere.
fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .redirect(redirect::Policy::none())
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// `oauth2` client with the authorization and token endpoints set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

fn oauth_client(config: &ProviderConfig) -> Result<ConfiguredClient, OAuthError> {
    let endpoint = |e: oauth2::url::ParseError| OAuthError::Endpoint(e.to_string());

    Ok(BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_client_secret(ClientSecret::new(config.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(config.endpoints.auth_url.clone()).map_err(endpoint)?)
        .set_token_uri(TokenUrl::new(config.endpoints.token_url.clone()).map_err(endpoint)?)
        .set_redirect_uri(RedirectUrl::new(config.redirect_url.clone()).map_err(endpoint)?)
        .set_auth_type(AuthType::RequestBody))
}

fn authorization_url(
    config: &ProviderConfig,
    scopes: &[&str],
    extra: &[(&'static str, &'static str)],
    state: &str,
) -> Result<String, OAuthError> {
    let client = oauth_client(config)?;
    let mut request = client
        .authorize_url(|| CsrfToken::new(state.to_string()))
        .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())));
    for (name, value) in extra {
        request = request.add_extra_param(*name, *value);
    }
    let (url, _) = request.url();
    Ok(url.to_string())
}

/// Trades the code at the token endpoint. GitHub answers a bad code with
/// `200 {"error": ...}`, which fails to parse as a token and lands here too.
async fn exchange(config: &ProviderConfig, http: &Client, code: &str) -> Result<String, OAuthError> {
    let client = oauth_client(config)?;
    let token = client
        .exchange_code(AuthorizationCode::new(code.to_string()))
        .request_async(http)
        .await
        .map_err(|e| {
            error!(error = %e, "Token exchange failed");
            OAuthError::Exchange(e.to_string())
        })?;

    let access_token = token.access_token().secret();
    if access_token.is_empty() {
        return Err(OAuthError::Exchange("no access token in response".to_string()));
    }
    Ok(access_token.clone())
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    http: &Client,
    url: &str,
    access_token: &str,
    accept: &str,
) -> Result<T, OAuthError> {
    let response = http
        .get(url)
        .bearer_auth(access_token)
        .header(header::ACCEPT, accept)
        .send()
        .await
        .map_err(|e| OAuthError::Provider(e.to_string()))?;

    if !response.status().is_success() {
        return Err(OAuthError::Provider(format!(
            "{} returned status {}",
            url,
            response.status()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| OAuthError::Provider(e.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---- Google ----

pub struct GoogleProvider {
    config: ProviderConfig,
    http: Client,
}

impl GoogleProvider {
    pub fn new(config: ProviderConfig, http: Client) -> Self {
        Self { config, http }
    }
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        authorization_url(
            &self.config,
            &GOOGLE_SCOPES,
            &[("access_type", "offline")],
            state,
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        debug!("Exchanging Google authorization code");
        exchange(&self.config, &self.http, code).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalProfile, OAuthError> {
        let url = format!("{}{}", self.config.endpoints.api_base, GOOGLE_USERINFO_PATH);
        let info: GoogleUserInfo =
            get_json(&self.http, &url, access_token, "application/json").await?;

        let email = non_empty(info.email)
            .ok_or_else(|| OAuthError::Provider("Google account has no email".to_string()))?;

        Ok(ExternalProfile {
            provider_id: info.id,
            email,
            first_name: non_empty(info.given_name),
            last_name: non_empty(info.family_name),
        })
    }
}

// ---- GitHub ----

pub struct GitHubProvider {
    config: ProviderConfig,
    http: Client,
}

impl GitHubProvider {
    pub fn new(config: ProviderConfig, http: Client) -> Self {
        Self { config, http }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoints.api_base, path)
    }
}

#[derive(Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
}

/// The primary address, else the first one listed.
pub fn pick_github_email(emails: &[GitHubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary)
        .or_else(|| emails.first())
        .map(|e| e.email.clone())
        .filter(|e| !e.is_empty())
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        authorization_url(&self.config, &GITHUB_SCOPES, &[], state)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        debug!("Exchanging GitHub authorization code");
        exchange(&self.config, &self.http, code).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalProfile, OAuthError> {
        let user: GitHubUser = get_json(
            &self.http,
            &self.api_url(GITHUB_USER_PATH),
            access_token,
            GITHUB_ACCEPT,
        )
        .await?;

        let email = match non_empty(user.email) {
            Some(email) => Some(email),
            None => {
                debug!(github_id = user.id, "No public email, listing account emails");
                let emails: Vec<GitHubEmail> = get_json(
                    &self.http,
                    &self.api_url(GITHUB_EMAILS_PATH),
                    access_token,
                    GITHUB_ACCEPT,
                )
                .await?;
                pick_github_email(&emails)
            }
        };
        let email = email
            .ok_or_else(|| OAuthError::Provider("GitHub account has no email".to_string()))?;

        let (first_name, last_name) = split_name(user.name.as_deref(), &user.login);

        Ok(ExternalProfile {
            provider_id: user.id.to_string(),
            email,
            first_name,
            last_name,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::config::ProviderEndpoints;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> OAuthConfig {
        OAuthConfig::for_tests()
    }

    /// Provider config whose endpoints all point at `server`.
    fn mocked(mut config: ProviderConfig, server: &MockServer) -> ProviderConfig {
        config.endpoints = ProviderEndpoints {
            auth_url: format!("{}/login/oauth/authorize", server.uri()),
            token_url: format!("{}/login/oauth/access_token", server.uri()),
            api_base: server.uri(),
        };
        config
    }

    fn github(server: &MockServer) -> GitHubProvider {
        GitHubProvider::new(mocked(config().github, server), http_client())
    }

    fn google(server: &MockServer) -> GoogleProvider {
        GoogleProvider::new(mocked(config().google, server), http_client())
    }

    #[test]
    fn test_google_authorization_url() {
        let provider = GoogleProvider::new(config().google, Client::new());
        let url = provider.authorization_url("st/ate").unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=google-client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("state=st%2Fate"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("userinfo.email"));
        assert!(url.contains("userinfo.profile"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fgoogle%2Fcallback"
        ));
    }

    #[test]
    fn test_github_authorization_url() {
        let provider = GitHubProvider::new(config().github, Client::new());
        let url = provider.authorization_url("abc").unwrap();

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("scope=user%3Aemail"));
        assert!(url.contains("state=abc"));
        assert!(!url.contains("access_type"));
    }

    #[test]
    fn test_invalid_endpoint_is_reported() {
        let mut github = config().github;
        github.endpoints.auth_url = "not a url".to_string();
        let err = GitHubProvider::new(github, Client::new())
            .authorization_url("abc")
            .unwrap_err();
        assert!(matches!(err, OAuthError::Endpoint(_)));
        assert!(matches!(ApiError::from(err), ApiError::InternalServer(_)));
    }

    #[tokio::test]
    async fn test_exchange_returns_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=good-code"))
            .and(body_string_contains("client_id=github-client"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_token",
                "token_type": "bearer",
                "scope": "user:email"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = github(&server).exchange_code("good-code").await.unwrap();
        assert_eq!(token, "gho_token");
    }

    #[tokio::test]
    async fn test_github_error_body_with_200_is_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let err = github(&server).exchange_code("stale").await.unwrap_err();
        assert!(matches!(err, OAuthError::Exchange(_)));
        assert!(matches!(ApiError::from(err), ApiError::ExchangeError(_)));
    }

    #[tokio::test]
    async fn test_token_endpoint_rejection_is_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let err = google(&server).exchange_code("bad").await.unwrap_err();
        assert!(matches!(err, OAuthError::Exchange(_)));
    }

    #[tokio::test]
    async fn test_github_profile_with_public_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header_is("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "login": "octocat",
                "name": "Mona Lisa Octocat",
                "email": "mona@x.com"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let profile = github(&server).fetch_profile("tok").await.unwrap();
        assert_eq!(profile.provider_id, "7");
        assert_eq!(profile.email, "mona@x.com");
        assert_eq!(profile.first_name.as_deref(), Some("Mona"));
        assert_eq!(profile.last_name.as_deref(), Some("Lisa Octocat"));
    }

    #[tokio::test]
    async fn test_github_profile_falls_back_to_primary_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "login": "octocat",
                "name": null,
                "email": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .and(header_is("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "email": "second@x.com", "primary": false, "verified": true },
                { "email": "main@x.com", "primary": true, "verified": true }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let profile = github(&server).fetch_profile("tok").await.unwrap();
        assert_eq!(profile.email, "main@x.com");
        assert_eq!(profile.first_name.as_deref(), Some("octocat"));
        assert!(profile.last_name.is_none());
    }

    #[tokio::test]
    async fn test_github_profile_without_primary_takes_first_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "login": "octocat", "email": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "email": "first@x.com", "primary": false },
                { "email": "other@x.com", "primary": false }
            ])))
            .mount(&server)
            .await;

        let profile = github(&server).fetch_profile("tok").await.unwrap();
        assert_eq!(profile.email, "first@x.com");
    }

    #[tokio::test]
    async fn test_github_email_listing_failure_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "login": "octocat", "email": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = github(&server).fetch_profile("tok").await.unwrap_err();
        assert!(matches!(err, OAuthError::Provider(_)));
        assert!(matches!(ApiError::from(err), ApiError::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_google_profile_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/v2/userinfo"))
            .and(header_is("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "1180",
                "email": "grace@x.com",
                "verified_email": true,
                "given_name": "Grace",
                "family_name": "Hopper"
            })))
            .mount(&server)
            .await;

        let profile = google(&server).fetch_profile("tok").await.unwrap();
        assert_eq!(
            profile,
            ExternalProfile {
                provider_id: "1180".to_string(),
                email: "grace@x.com".to_string(),
                first_name: Some("Grace".to_string()),
                last_name: Some("Hopper".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_google_profile_without_email_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/v2/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1180" })))
            .mount(&server)
            .await;

        let err = google(&server).fetch_profile("tok").await.unwrap_err();
        assert!(matches!(err, OAuthError::Provider(_)));
    }

    #[test]
    fn test_pick_github_email() {
        let emails = vec![
            GitHubEmail { email: "second@x.com".into(), primary: false },
            GitHubEmail { email: "main@x.com".into(), primary: true },
        ];
        assert_eq!(pick_github_email(&emails).as_deref(), Some("main@x.com"));
        assert_eq!(pick_github_email(&[]), None);
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::GitHub.to_string(), "GitHub");
        assert_eq!(Provider::Google.slug(), "google");
        assert_eq!(Provider::GitHub.id_column(), "github_id");
        assert_eq!(Provider::Google.env_prefix(), "GOOGLE");
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            ApiError::from(OAuthError::Exchange("x".into())),
            ApiError::ExchangeError(_)
        ));
        assert!(matches!(
            ApiError::from(OAuthError::Provider("x".into())),
            ApiError::ProviderError(_)
        ));
        match ApiError::from(OAuthError::NotConfigured) {
            ApiError::InternalServer(msg) => assert_eq!(msg, "OAuth not configured"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
