//! Session persistence in the OS keychain and helpers for signed-in commands.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use hearth_core::auth::{AuthResult, SessionPersistence, SupabaseAuthClient};
pub use hearth_core::auth::{AuthError, AuthSession};
use hearth_core::ClientConfig;

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "hearth-cli";

#[derive(Clone)]
pub struct SessionStore {
    username: String,
}

impl SessionStore {
    pub fn new(project_url: &str) -> Self {
        Self {
            username: format!("supabase_session:{}", project_url.trim_end_matches('/')),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

pub type AuthClient = SupabaseAuthClient<SessionStore>;

pub fn auth_client(config: &ClientConfig) -> Result<AuthClient, CliError> {
    Ok(SupabaseAuthClient::new(
        config,
        SessionStore::new(&config.supabase_url),
    )?)
}

/// Stored session, refreshed when it has expired.
pub async fn require_session(config: &ClientConfig) -> Result<AuthSession, CliError> {
    auth_client(config)?
        .restore_session()
        .await?
        .ok_or(CliError::NotSignedIn)
}

#[cfg(test)]
mod tests {
    use hearth_core::auth::AuthUser;
    use hearth_core::models::UserId;
    use pretty_assertions::assert_eq;

    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: "0190f0a8-8f4e-7a55-9f8e-5f3c2b1a0d01".parse::<UserId>().unwrap(),
                email: Some("ana@example.com".to_string()),
                display_name: "Ana".to_string(),
                avatar_url: None,
            },
        }
    }

    #[test]
    fn store_round_trips_and_clears() {
        let store = SessionStore::new("https://store-test.supabase.co/");
        store.save_session(&session()).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(session()));

        store.clear_session().unwrap();
        assert_eq!(store.load_session().unwrap(), None);
        store.clear_session().unwrap();
    }

    #[test]
    fn sessions_are_kept_per_project() {
        let first = SessionStore::new("https://first.supabase.co");
        let second = SessionStore::new("https://second.supabase.co");
        first.save_session(&session()).unwrap();

        assert!(second.load_session().unwrap().is_none());
        first.clear_session().unwrap();
    }
}
