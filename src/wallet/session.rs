// src/wallet/session.rs
//! Session context for the logged-in account.
//!
//! Everything the client remembers about "who is logged in" lives here and
//! is handed to each operation explicitly:
//! - the bearer token, persisted in a [`SessionStore`] under a fixed key
//! - the account returned by the login or `me` endpoint
//! - the credential records fetched for the holder's dashboard
//!
//! # Lifecycle
//! Created empty, filled by [`SessionContext::begin`] at login, emptied by
//! [`SessionContext::end`] at logout or when the API rejects the token.

use crate::error::{PortalError, PortalResult};
use crate::models::credential::CredentialRecord;
use crate::models::user::User;
use crate::storage::session_store::{SessionStore, EMAIL_KEY, TOKEN_KEY};
use crate::wallet::credential_storage::CredentialStorage;
use log::info;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct SessionContext {
    /// Persistent token storage
    store: Arc<dyn SessionStore>,

    /// Account of the current session, known after login or restore
    user: Arc<Mutex<Option<User>>>,

    /// Credential list cache; read-only while a presentation is requested
    credential_storage: Arc<Mutex<CredentialStorage>>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        SessionContext {
            store,
            user: Arc::new(Mutex::new(None)),
            credential_storage: Arc::new(Mutex::new(CredentialStorage::new())),
        }
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> PortalResult<Option<String>> {
        Ok(self.store.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    /// The stored bearer token.
    ///
    /// # Errors
    /// `Authentication` when no token is stored.
    pub fn require_token(&self) -> PortalResult<String> {
        self.token()?.ok_or_else(|| {
            PortalError::Authentication("no session token stored, log in first".into())
        })
    }

    /// Email remembered from the last login.
    pub fn stored_email(&self) -> PortalResult<Option<String>> {
        self.store.get(EMAIL_KEY)
    }

    /// Starts a session: persists the token and remembers the account.
    pub fn begin(&self, token: &str, user: User) -> PortalResult<()> {
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(EMAIL_KEY, &user.email)?;
        info!("Session started for {} ({})", user.email, user.role);
        self.set_user(user);
        Ok(())
    }

    pub fn set_user(&self, user: User) {
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn user(&self) -> Option<User> {
        self.user.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Ends the session: forgets the token, the account and the cache.
    pub fn end(&self) -> PortalResult<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(EMAIL_KEY)?;
        self.user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.credential_storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    /// Replaces the cached credential list.
    pub fn cache_credentials(&self, records: Vec<CredentialRecord>) {
        let mut storage = self
            .credential_storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        storage.replace_all(records);
    }

    /// A cached record, cloned so no lock is held across awaits.
    pub fn credential(&self, cred_id: i64) -> Option<CredentialRecord> {
        let storage = self
            .credential_storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        storage.get_credential(cred_id).cloned()
    }

    pub fn credential_count(&self) -> usize {
        let storage = self
            .credential_storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        storage.count_credentials()
    }

    /// Cached records whose title matches `term`.
    pub fn search_credentials(&self, term: &str) -> Vec<CredentialRecord> {
        let storage = self
            .credential_storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        storage.search(term).into_iter().cloned().collect()
    }
}
