//! Acquisition and persistence of the OAuth token used for an upload run.

use crate::oauth::OAuthManager;
use eyre::Context;
use jiff::{SignedDuration, Timestamp};
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;

/// Tokens are considered expired this long before Google would actually reject them.
const EXPIRY_BUFFER: SignedDuration = SignedDuration::from_secs(300);

/// Assumed lifetime (already buffered) when the token response doesn't say.
const DEFAULT_LIFETIME: SignedDuration = SignedDuration::from_secs(3300);

/// An OAuth token together with the moment it stops being usable.
///
/// This is what lives in the token store between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: BasicTokenResponse,
    pub expires_at: Timestamp,
}

impl StoredToken {
    /// Wraps a token that was just issued, computing its expiry from `expires_in`.
    pub fn fresh(token: BasicTokenResponse) -> Self {
        let lifetime = token
            .expires_in()
            .and_then(|d| SignedDuration::try_from(d).ok())
            .map(|d| d.checked_sub(EXPIRY_BUFFER).unwrap_or(SignedDuration::ZERO))
            .unwrap_or(DEFAULT_LIFETIME);
        let expires_at = Timestamp::now()
            .checked_add(lifetime)
            .unwrap_or(Timestamp::MAX);
        Self { token, expires_at }
    }

    pub fn is_valid(&self) -> bool {
        Timestamp::now() < self.expires_at
    }

    pub fn access_token(&self) -> &str {
        self.token.access_token().secret()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.token.refresh_token().is_some()
    }
}

/// Hands out a usable token, refreshing or re-authorizing as needed.
///
/// Any token obtained through the network is written to the token store before it is returned.
#[derive(Debug)]
pub struct CredentialManager {
    oauth: OAuthManager,
    store_path: PathBuf,
}

impl CredentialManager {
    pub fn new(oauth: OAuthManager, store_path: impl Into<PathBuf>) -> Self {
        Self {
            oauth,
            store_path: store_path.into(),
        }
    }

    /// Returns a currently valid token.
    ///
    /// In order of preference: the stored token as-is, the stored token refreshed, or a brand new
    /// token from interactive authorization. For the latter, `code_provider` is given the URL the
    /// user needs to visit and must return the authorization code they got there.
    ///
    /// A failed refresh is returned as an error; it does not fall back to interactive
    /// authorization.
    #[tracing::instrument(skip_all, fields(store = %self.store_path.display()))]
    pub async fn obtain<F>(&self, mut code_provider: F) -> eyre::Result<StoredToken>
    where
        F: AsyncFnMut(&str) -> eyre::Result<String>,
    {
        let stored = self.load().await?;

        let token = match stored {
            Some(stored) if stored.is_valid() => {
                tracing::debug!(expires_at = %stored.expires_at, "stored token still valid");
                return Ok(stored);
            }
            Some(stored) if stored.has_refresh_token() => {
                tracing::info!("stored token expired, refreshing");
                let mut new_token = self
                    .oauth
                    .refresh_token(&stored.token)
                    .await
                    .context("refresh stored OAuth token")?;

                // If the new token doesn't have a refresh token, preserve the original one
                if new_token.refresh_token().is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    new_token.set_refresh_token(stored.token.refresh_token().cloned());
                }
                StoredToken::fresh(new_token)
            }
            _ => {
                tracing::info!("no usable stored token, asking user to authorize");
                let pending = self
                    .oauth
                    .authorization_url()
                    .context("build authorization URL")?;
                let code = code_provider(pending.url.as_str())
                    .await
                    .context("obtain authorization code")?;
                let code = code.trim();
                if code.is_empty() {
                    eyre::bail!("no authorization code was entered");
                }
                let token = self
                    .oauth
                    .exchange_code(pending, code)
                    .await
                    .context("authorize user to YouTube")?;
                StoredToken::fresh(token)
            }
        };

        self.save(&token).await?;
        Ok(token)
    }

    async fn load(&self) -> eyre::Result<Option<StoredToken>> {
        if !tokio::fs::try_exists(&self.store_path)
            .await
            .context("check for token store")?
        {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&self.store_path)
            .await
            .context("read token store")?;
        let stored = serde_json::from_str(&json).context("parse token store")?;
        Ok(Some(stored))
    }

    async fn save(&self, token: &StoredToken) -> eyre::Result<()> {
        let json = serde_json::to_string_pretty(token).context("serialize token")?;
        tokio::fs::write(&self.store_path, json)
            .await
            .with_context(|| format!("write token store {}", self.store_path.display()))
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }
}

/// Asks the person at the terminal to authorize us and paste back the code.
pub async fn prompt_on_console(auth_url: &str) -> eyre::Result<String> {
    println!("\nOpen this URL in your browser:\n");
    println!("{auth_url}");
    print!("\nPaste the authorization code here: ");
    std::io::stdout().flush().context("flush stdout")?;

    let mut line = String::new();
    let n = tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("read authorization code from stdin")?;
    if n == 0 {
        eyre::bail!("stdin closed before an authorization code was entered");
    }
    Ok(line.trim().to_string())
}
