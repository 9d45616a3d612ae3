//! OAuth 2.0 management for YouTube API authentication.
//!
//! This module wraps the `oauth2` crate for the three operations an upload run may need: building
//! the authorization URL for a first-time user, exchanging the code they paste back for a token,
//! and refreshing an expired token. The client identity comes from the Google "installed
//! application" client secret file downloaded from the Cloud console.

use eyre::Context;
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenUrl,
};
use oauth2::{RequestTokenError, TokenResponse};
use serde::Deserialize;
use std::path::Path;

/// Google's default authorization endpoint, used when the client secret file doesn't name one.
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google OAuth2 token endpoint URL used for both initial authentication and token refresh
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Out-of-band redirect: the consent page shows the code and the user pastes it into the console.
const OOB_REDIRECT_URL: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Upload videos, plus manage playlists and thumbnails.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube",
];

type TokenClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    #[serde(alias = "web")]
    installed: ClientSecretEntry,
}

#[derive(Debug, Deserialize)]
struct ClientSecretEntry {
    client_id: String,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// An authorization URL handed to the user, along with the PKCE verifier needed to redeem the code
/// that comes back.
#[derive(Debug)]
pub struct PendingAuthorization {
    pub url: oauth2::url::Url,
    pkce_verifier: PkceCodeVerifier,
}

/// Manages OAuth 2.0 authentication flows for YouTube API access.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_id: String,
    client_secret: Option<String>,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    http_client: oauth2::reqwest::Client,
}

impl OAuthManager {
    /// Creates a manager for the given client identity and endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        auth_url: &str,
        token_url: &str,
    ) -> eyre::Result<Self> {
        let http_client = oauth2::reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .context("build OAuth HTTP client")?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret,
            auth_url: AuthUrl::new(auth_url.to_string()).context("parse authorization URL")?,
            token_url: TokenUrl::new(token_url.to_string()).context("parse token URL")?,
            http_client,
        })
    }

    /// Reads the client identity from a Google client secret file.
    ///
    /// Both the `installed` and `web` layouts are accepted. Endpoints missing from the file fall
    /// back to Google's defaults.
    pub async fn from_client_secret_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read client secret file {}", path.display()))?;
        let ClientSecretFile { installed: entry } = serde_json::from_str(&json)
            .with_context(|| format!("parse client secret file {}", path.display()))?;

        Self::new(
            entry.client_id,
            entry.client_secret,
            entry.auth_uri.as_deref().unwrap_or(AUTH_URL),
            entry.token_uri.as_deref().unwrap_or(TOKEN_URL),
        )
    }

    /// Builds the URL the user must visit to grant us access.
    ///
    /// Requests offline access and forces the consent screen so that Google always hands out a
    /// refresh token, even if the user has authorized this client before.
    pub fn authorization_url(&self) -> eyre::Result<PendingAuthorization> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(oob_redirect()?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, _csrf_token) = client
            // There is no redirect for the state to come back through.
            .authorize_url(CsrfToken::new_random)
            .add_scopes(SCOPES.iter().map(|scope| Scope::new(scope.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok(PendingAuthorization { url, pkce_verifier })
    }

    /// Exchanges the code the user obtained from [`Self::authorization_url`] for a token.
    pub async fn exchange_code(
        &self,
        pending: PendingAuthorization,
        code: &str,
    ) -> eyre::Result<BasicTokenResponse> {
        let client = self.token_client().set_redirect_uri(oob_redirect()?);

        client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(pending.pkce_verifier)
            .request_async(&self.http_client)
            .await
            .context("exchange authorization code with access token")
    }

    /// Exchanges the refresh token in `token` for a fresh access token.
    ///
    /// The returned token may lack a refresh token of its own; callers that persist it should
    /// carry the old one over.
    pub async fn refresh_token(
        &self,
        token: &BasicTokenResponse,
    ) -> eyre::Result<BasicTokenResponse> {
        let Some(refresh_token) = token.refresh_token() else {
            eyre::bail!("no refresh token available, cannot refresh");
        };

        tracing::debug!("attempting to refresh OAuth token");
        match self
            .token_client()
            .exchange_refresh_token(refresh_token)
            .request_async(&self.http_client)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(new_token)
            }
            Err(ref e @ RequestTokenError::ServerResponse(ref sr))
                if matches!(sr.error(), BasicErrorResponseType::InvalidGrant) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                eyre::bail!(
                    "refresh token was rejected by the authorization server; \
                    remove the token store to authorize again"
                )
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    fn token_client(&self) -> TokenClient {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_token_uri(self.token_url.clone());
        match &self.client_secret {
            Some(secret) => client.set_client_secret(ClientSecret::new(secret.clone())),
            None => client,
        }
    }
}

fn oob_redirect() -> eyre::Result<RedirectUrl> {
    RedirectUrl::new(OOB_REDIRECT_URL.to_string()).context("construct redirect url")
}
