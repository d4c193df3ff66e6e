//! In-memory store fakes for exercising the gate and the auth service
//! without a database. Test-only.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::auth::stores::{
    CredentialStore, RevocationLedger, SessionStore, StoreError, VerifiedUser, hash_token,
};
use crate::core::db::models::{RefreshTokenRecord, Session};

/// Ledger fake keyed by token hash, with a call counter and a one-shot
/// failure injection for fail-closed tests.
pub struct MemoryLedger {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
    next_error: Mutex<Option<StoreError>>,
    pub find_calls: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_error: Mutex::new(None),
            find_calls: AtomicUsize::new(0),
        }
    }

    /// Make the next ledger operation fail with the given error.
    pub fn fail_next(&self, error: StoreError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    fn take_error(&self) -> Option<StoreError> {
        self.next_error.lock().unwrap().take()
    }
}

#[async_trait]
impl RevocationLedger for MemoryLedger {
    async fn persist(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        token_value: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(err) = self.take_error() {
            return Err(err);
        }

        let token_hash = hash_token(token_value);
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            token_hash: token_hash.clone(),
            expires_at,
            revoked_at: None,
            created_at: Utc::now(),
        };

        self.records.lock().unwrap().insert(token_hash, record);
        Ok(())
    }

    async fn find(&self, token_value: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.take_error() {
            return Err(err);
        }

        let records = self.records.lock().unwrap();
        Ok(records.get(&hash_token(token_value)).cloned())
    }

    async fn revoke(&self, token_value: &str) -> Result<bool, StoreError> {
        if let Some(err) = self.take_error() {
            return Err(err);
        }

        let mut records = self.records.lock().unwrap();
        match records.get_mut(&hash_token(token_value)) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Session fake with an activity counter.
pub struct MemorySessions {
    sessions: Mutex<HashMap<Uuid, Session>>,
    pub activity_calls: AtomicUsize,
}

impl MemorySessions {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            activity_calls: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.lock().unwrap().get(&session_id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Uuid, StoreError> {
        let session_id = Uuid::new_v4();
        let now = Utc::now();
        let session = Session {
            id: session_id,
            user_id,
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
            is_active: true,
            login_at: now,
            logout_at: None,
            last_seen_at: Some(now),
        };

        self.sessions.lock().unwrap().insert(session_id, session);
        Ok(session_id)
    }

    async fn deactivate(&self, session_id: Uuid) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&session_id) {
            if session.is_active {
                session.is_active = false;
                session.logout_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn record_activity(&self, session_id: Uuid) -> Result<(), StoreError> {
        self.activity_calls.fetch_add(1, Ordering::SeqCst);

        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&session_id) {
            session.last_seen_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Credential fake over plaintext passwords.
pub struct MemoryCredentials {
    users: Mutex<HashMap<String, (Uuid, String, bool)>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Register a user; returns its id.
    pub fn insert(&self, email: &str, password: &str, is_active: bool) -> Uuid {
        let user_id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            email.to_string(),
            (user_id, password.to_string(), is_active),
        );
        user_id
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedUser>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(email).and_then(|(user_id, stored, is_active)| {
            (stored == password).then_some(VerifiedUser {
                user_id: *user_id,
                is_active: *is_active,
            })
        }))
    }
}
