//! OAuth session auth against the hosted backend (`/auth/v1`).

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::models::UserId;
use crate::util::{normalize_text_option, parse_api_error};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const FALLBACK_DISPLAY_NAME: &str = "Anonymous";

/// Signed-in participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Identity providers offered on the sign-in page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OAuthProvider {
    #[default]
    Google,
}

impl OAuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Sign-in redirect was not usable: {0}")]
    Redirect(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(config: &ClientConfig, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(&config.supabase_url)?;
        let anon_key = normalize_text_option(Some(config.supabase_anon_key.clone())).ok_or(
            AuthError::InvalidConfiguration("Supabase anon key must not be empty"),
        )?;

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    /// Browser URL that starts the OAuth flow and comes back to `redirect_to`.
    pub fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> AuthResult<String> {
        let mut url = Url::parse(&format!("{}/authorize", self.auth_url))
            .map_err(|_| AuthError::InvalidConfiguration("Supabase URL is not a valid URL"))?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        Ok(url.into())
    }

    /// Finish sign-in from the URL the provider redirected back to.
    pub async fn session_from_redirect(&self, redirect_url: &str) -> AuthResult<AuthSession> {
        let tokens = parse_redirect(redirect_url)?;
        let user = self.fetch_user(&tokens.access_token).await?;
        let session = AuthSession {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
            user,
        };
        self.store.save_session(&session)?;
        tracing::info!("Signed in as {}", session.user.display_name);
        Ok(session)
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let response: TokenResponse = self.send_json(request).await?;
        let session = response.into_session()?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    /// Revoke the session server-side and forget it locally.
    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        let response = request.send().await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        self.store.clear_session()?;
        tracing::info!("Signed out");
        Ok(())
    }

    async fn fetch_user(&self, access_token: &str) -> AuthResult<AuthUser> {
        let request = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        let user: SupabaseUser = self.send_json(request).await?;
        Ok(user.into())
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> AuthResult<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<T>().await?)
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct RedirectTokens {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
}

/// Tokens come back in the fragment; provider errors may come in either
/// the fragment or the query.
fn parse_redirect(redirect_url: &str) -> AuthResult<RedirectTokens> {
    let url = Url::parse(redirect_url.trim())
        .map_err(|error| AuthError::Redirect(format!("not a URL ({error})")))?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if let Some(fragment) = url.fragment() {
        pairs.extend(
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        );
    }
    let lookup = |name: &str| {
        pairs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| normalize_text_option(Some(value.clone())))
    };

    if let Some(error) = lookup("error_description").or_else(|| lookup("error")) {
        return Err(AuthError::Redirect(error));
    }

    let access_token = lookup("access_token")
        .ok_or_else(|| AuthError::Redirect("missing access_token".to_string()))?;
    let refresh_token = lookup("refresh_token")
        .ok_or_else(|| AuthError::Redirect("missing refresh_token".to_string()))?;
    let expires_at = lookup("expires_at")
        .and_then(|value| value.parse::<i64>().ok())
        .or_else(|| {
            lookup("expires_in")
                .and_then(|value| value.parse::<i64>().ok())
                .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
        })
        .ok_or_else(|| AuthError::Redirect("missing token expiry".to_string()))?;

    Ok(RedirectTokens {
        access_token,
        refresh_token,
        expires_at,
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

impl TokenResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
        });

        match (self.access_token, self.refresh_token, expires_at, self.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user: user.into(),
                })
            }
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: UserId,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        let metadata = value.user_metadata;
        let display_name = normalize_text_option(metadata.full_name)
            .or_else(|| normalize_text_option(metadata.name))
            .or_else(|| {
                value
                    .email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .and_then(|local| normalize_text_option(Some(local.to_string())))
            })
            .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string());

        Self {
            id: value.id,
            email: value.email,
            display_name,
            avatar_url: normalize_text_option(metadata.avatar_url)
                .or_else(|| normalize_text_option(metadata.picture)),
        }
    }
}

fn unix_timestamp_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| {
            i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
        })
}
