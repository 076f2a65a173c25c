//! # Sessions
//!
//! The session gate only cares whether a request carries a live session. Where
//! sessions come from is the session store's business:
//!
//! - A sign-in flow (outside this service) writes a one-time auth code
//! - `/auth/callback` exchanges that code for an opaque session token cookie
//! - Every routed request looks the token up, extending it when close to expiry
//! - Sign-out deletes the token and clears the cookie
//!
//! Any cookie the store wants changed comes back as [`SetCookie`] values so the
//! router can attach them to whatever response it ends up producing.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::{AppError, StoreError},
    request::{CookieJar, SetCookie},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

/// Result of resolving a cookie jar, plus any cookie changes it caused.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionLookup {
    pub session: Option<Session>,
    pub cookies: Vec<SetCookie>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, cookies: &CookieJar) -> Result<SessionLookup, AppError>;

    async fn exchange_code(&self, code: &str) -> Result<SessionLookup, AppError>;

    async fn destroy(&self, cookies: &CookieJar) -> Result<Vec<SetCookie>, AppError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionGate {
    Unauthenticated,
    Authenticated(Session),
}

impl SessionGate {
    /// Resolves the gate for one request along with the cookie changes the
    /// store made while doing so. A failing store counts as no session.
    pub async fn evaluate(store: &dyn SessionStore, cookies: &CookieJar) -> (Self, Vec<SetCookie>) {
        match store.get_session(cookies).await {
            Ok(SessionLookup {
                session: Some(session),
                cookies,
            }) => (Self::Authenticated(session), cookies),
            Ok(SessionLookup {
                session: None,
                cookies,
            }) => (Self::Unauthenticated, cookies),
            Err(e) => {
                warn!("Session check failed, treating request as signed out: {e}");
                (Self::Unauthenticated, Vec::new())
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

pub struct RedisSessionStore {
    connection: ConnectionManager,
    prefix: String,
    config: SessionConfig,
}

impl RedisSessionStore {
    pub fn new(connection: ConnectionManager, prefix: &str, config: SessionConfig) -> Self {
        Self {
            connection,
            prefix: prefix.to_string(),
            config,
        }
    }

    fn session_key(&self, token: &str) -> String {
        format!("{}:session:{token}", self.prefix)
    }

    fn code_key(&self, code: &str) -> String {
        format!("{}:auth_code:{code}", self.prefix)
    }

    fn cookie(&self, token: &str) -> SetCookie {
        SetCookie::session(
            &self.config.cookie_name,
            token,
            self.config.ttl,
            self.config.secure_cookies,
        )
    }

    fn removal(&self) -> SetCookie {
        SetCookie::removal(&self.config.cookie_name, self.config.secure_cookies)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get_session(&self, cookies: &CookieJar) -> Result<SessionLookup, AppError> {
        let Some(token) = cookies.get(&self.config.cookie_name) else {
            return Ok(SessionLookup::default());
        };

        let mut connection = self.connection.clone();
        let key = self.session_key(token);

        let (user_id, ttl): (Option<String>, i64) = redis::pipe()
            .get(&key)
            .ttl(&key)
            .query_async(&mut connection)
            .await
            .map_err(StoreError::from)?;

        let Some(user_id) = user_id else {
            return Ok(SessionLookup {
                session: None,
                cookies: vec![self.removal()],
            });
        };

        let mut refreshed = Vec::new();
        if needs_refresh(ttl, &self.config) {
            let _: () = connection
                .expire(&key, self.config.ttl.as_secs() as i64)
                .await
                .map_err(StoreError::from)?;

            refreshed.push(self.cookie(token));
        }

        Ok(SessionLookup {
            session: Some(Session {
                token: token.to_string(),
                user_id,
            }),
            cookies: refreshed,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<SessionLookup, AppError> {
        let mut connection = self.connection.clone();

        let user_id: Option<String> = connection
            .get_del(self.code_key(code))
            .await
            .map_err(StoreError::from)?;

        let Some(user_id) = user_id else {
            return Ok(SessionLookup::default());
        };

        let token = Uuid::new_v4().to_string();
        let _: () = connection
            .set_ex(self.session_key(&token), &user_id, self.config.ttl.as_secs())
            .await
            .map_err(StoreError::from)?;

        Ok(SessionLookup {
            cookies: vec![self.cookie(&token)],
            session: Some(Session { token, user_id }),
        })
    }

    async fn destroy(&self, cookies: &CookieJar) -> Result<Vec<SetCookie>, AppError> {
        if let Some(token) = cookies.get(&self.config.cookie_name) {
            let mut connection = self.connection.clone();
            let _: () = connection
                .del(self.session_key(token))
                .await
                .map_err(StoreError::from)?;
        }

        Ok(vec![self.removal()])
    }
}

/// `ttl` is the Redis TTL reply: seconds left, or negative when the key has
/// no expiry.
fn needs_refresh(ttl: i64, config: &SessionConfig) -> bool {
    ttl < 0 || (ttl as u64) < config.refresh_window.as_secs()
}

struct MemoryEntry {
    user_id: String,
    expires_at: Instant,
}

/// In-process session store with the same refresh semantics as the Redis one.
pub struct MemorySessionStore {
    config: SessionConfig,
    sessions: Mutex<HashMap<String, MemoryEntry>>,
    codes: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            codes: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a session directly and returns its token.
    pub async fn sign_in(&self, user_id: &str, lifetime: Duration) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.lock().await.insert(
            token.clone(),
            MemoryEntry {
                user_id: user_id.to_string(),
                expires_at: Instant::now() + lifetime,
            },
        );
        token
    }

    pub async fn issue_code(&self, code: &str, user_id: &str) {
        self.codes
            .lock()
            .await
            .insert(code.to_string(), user_id.to_string());
    }

    fn cookie(&self, token: &str) -> SetCookie {
        SetCookie::session(
            &self.config.cookie_name,
            token,
            self.config.ttl,
            self.config.secure_cookies,
        )
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_session(&self, cookies: &CookieJar) -> Result<SessionLookup, AppError> {
        let Some(token) = cookies.get(&self.config.cookie_name) else {
            return Ok(SessionLookup::default());
        };

        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        if !sessions.get(token).is_some_and(|e| e.expires_at > now) {
            sessions.remove(token);
            return Ok(SessionLookup {
                session: None,
                cookies: vec![SetCookie::removal(
                    &self.config.cookie_name,
                    self.config.secure_cookies,
                )],
            });
        }

        let Some(entry) = sessions.get_mut(token) else {
            return Ok(SessionLookup::default());
        };

        let mut refreshed = Vec::new();
        if entry.expires_at - now < self.config.refresh_window {
            entry.expires_at = now + self.config.ttl;
            refreshed.push(self.cookie(token));
        }

        Ok(SessionLookup {
            session: Some(Session {
                token: token.to_string(),
                user_id: entry.user_id.clone(),
            }),
            cookies: refreshed,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<SessionLookup, AppError> {
        let Some(user_id) = self.codes.lock().await.remove(code) else {
            return Ok(SessionLookup::default());
        };

        let token = self.sign_in(&user_id, self.config.ttl).await;

        Ok(SessionLookup {
            cookies: vec![self.cookie(&token)],
            session: Some(Session { token, user_id }),
        })
    }

    async fn destroy(&self, cookies: &CookieJar) -> Result<Vec<SetCookie>, AppError> {
        if let Some(token) = cookies.get(&self.config.cookie_name) {
            self.sessions.lock().await.remove(token);
        }

        Ok(vec![SetCookie::removal(
            &self.config.cookie_name,
            self.config.secure_cookies,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar_with(token: &str) -> CookieJar {
        let mut jar = CookieJar::default();
        jar.insert("fb-session", token);
        jar
    }

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn get_session(&self, _: &CookieJar) -> Result<SessionLookup, AppError> {
            Err(AppError::Store(StoreError::Malformed {
                key: "session".to_string(),
                reason: "unreachable".to_string(),
            }))
        }

        async fn exchange_code(&self, _: &str) -> Result<SessionLookup, AppError> {
            Ok(SessionLookup::default())
        }

        async fn destroy(&self, _: &CookieJar) -> Result<Vec<SetCookie>, AppError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_needs_refresh() {
        let config = SessionConfig::default();
        assert!(needs_refresh(60, &config));
        assert!(needs_refresh(-1, &config));
        assert!(!needs_refresh(3 * 24 * 60 * 60, &config));
    }

    #[tokio::test]
    async fn test_no_cookie_is_unauthenticated() {
        let store = MemorySessionStore::new(SessionConfig::default());
        let (gate, cookies) = SessionGate::evaluate(&store, &CookieJar::default()).await;

        assert_eq!(gate, SessionGate::Unauthenticated);
        assert!(cookies.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_session_is_not_refreshed() {
        let store = MemorySessionStore::new(SessionConfig::default());
        let token = store.sign_in("user-1", Duration::from_secs(5 * 24 * 60 * 60)).await;

        let (gate, cookies) = SessionGate::evaluate(&store, &jar_with(&token)).await;
        assert!(gate.is_authenticated());
        assert!(cookies.is_empty());
    }

    #[tokio::test]
    async fn test_session_near_expiry_is_refreshed() {
        let store = MemorySessionStore::new(SessionConfig::default());
        let token = store.sign_in("user-1", Duration::from_secs(60)).await;

        let (gate, cookies) = SessionGate::evaluate(&store, &jar_with(&token)).await;
        assert_eq!(
            gate,
            SessionGate::Authenticated(Session {
                token: token.clone(),
                user_id: "user-1".to_string(),
            })
        );
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, token);
        assert_eq!(cookies[0].max_age, Some(SessionConfig::default().ttl));
    }

    #[tokio::test]
    async fn test_unknown_token_clears_cookie() {
        let store = MemorySessionStore::new(SessionConfig::default());
        let (gate, cookies) = SessionGate::evaluate(&store, &jar_with("stale")).await;

        assert_eq!(gate, SessionGate::Unauthenticated);
        assert_eq!(cookies, vec![SetCookie::removal("fb-session", true)]);
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let (gate, cookies) = SessionGate::evaluate(&FailingStore, &jar_with("abc")).await;

        assert_eq!(gate, SessionGate::Unauthenticated);
        assert!(cookies.is_empty());
    }

    #[tokio::test]
    async fn test_code_exchange_is_single_use() {
        let store = MemorySessionStore::new(SessionConfig::default());
        store.issue_code("code-123", "user-7").await;

        let first = store.exchange_code("code-123").await.expect("exchange");
        let session = first.session.expect("session");
        assert_eq!(session.user_id, "user-7");
        assert_eq!(first.cookies[0].value, session.token);

        let second = store.exchange_code("code-123").await.expect("exchange");
        assert!(second.session.is_none());
        assert!(second.cookies.is_empty());

        let (gate, _) = SessionGate::evaluate(&store, &jar_with(&session.token)).await;
        assert!(gate.is_authenticated());
    }

    #[tokio::test]
    async fn test_destroy_signs_out() {
        let store = MemorySessionStore::new(SessionConfig::default());
        let token = store.sign_in("user-1", Duration::from_secs(3600)).await;

        let cookies = store.destroy(&jar_with(&token)).await.expect("destroy");
        assert_eq!(cookies[0].max_age, Some(Duration::ZERO));

        let (gate, _) = SessionGate::evaluate(&store, &jar_with(&token)).await;
        assert_eq!(gate, SessionGate::Unauthenticated);
    }
}
