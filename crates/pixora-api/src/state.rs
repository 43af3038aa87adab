//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! AppState holds:
//! - **Workflow**: the verification-request service and its document store
//! - **Users**: read-only directory used to resolve authenticated callers
//! - **Database pool**: present when `DATABASE_URL` is configured
//! - **Configuration**: port, auth secret, listing policy

use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;

use crate::store::DocumentStore;
use crate::users::UserDirectory;
use crate::workflow::VerificationWorkflow;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// Compound operations (check-then-insert, match-then-update) run under a
/// single write guard so concurrent callers observe them as one step.
#[derive(Debug)]
pub struct Store<K, V> {
    data: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    /// Insert `value` unless some stored record satisfies `conflicts`.
    ///
    /// Returns the first conflicting record on refusal.
    pub fn insert_unless(
        &self,
        key: K,
        value: V,
        conflicts: impl Fn(&V) -> bool,
    ) -> Result<(), V> {
        let mut guard = self.data.write();
        if let Some(existing) = guard.values().find(|v| conflicts(v)) {
            return Err(existing.clone());
        }
        guard.insert(key, value);
        Ok(())
    }

    /// Retrieve a record by key.
    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Return every record matching `pred`.
    pub fn filter(&self, pred: impl Fn(&V) -> bool) -> Vec<V> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Apply `f` to every record matching `pred` under one write lock.
    ///
    /// `f` returns whether it actually modified the record; the count of
    /// modified records is returned.
    pub fn update_where(
        &self,
        pred: impl Fn(&V) -> bool,
        mut f: impl FnMut(&mut V) -> bool,
    ) -> u64 {
        let mut guard = self.data.write();
        let mut modified = 0;
        for value in guard.values_mut() {
            if pred(value) && f(value) {
                modified += 1;
            }
        }
        modified
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// -- Configuration ------------------------------------------------------------

/// What an admin listing returns when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyListPolicy {
    /// 200 with `[]`.
    #[default]
    EmptyList,
    /// 404 with a "No ... found" detail.
    NotFound,
}

impl FromStr for EmptyListPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "empty" => Ok(Self::EmptyList),
            "not_found" => Ok(Self::NotFound),
            other => Err(ConfigError::Invalid {
                var: "EMPTY_LIST_POLICY",
                reason: format!("expected 'empty' or 'not_found', got '{other}'"),
            }),
        }
    }
}

/// Error reading configuration from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_secret` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// JWT signing key. If `None`, every authenticated route answers 401.
    pub auth_secret: Option<String>,
    pub empty_list_policy: EmptyListPolicy,
    /// JSON file of user profiles loaded when running without a database.
    pub users_file: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_secret",
                &self.auth_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("empty_list_policy", &self.empty_list_policy)
            .field("users_file", &self.users_file)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_secret: None,
            empty_list_policy: EmptyListPolicy::default(),
            users_file: None,
        }
    }
}

impl AppConfig {
    /// Read `PORT`, `AUTH_SECRET`, `EMPTY_LIST_POLICY` and `USERS_FILE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let auth_secret = lookup("AUTH_SECRET").filter(|s| !s.is_empty());

        let empty_list_policy = match lookup("EMPTY_LIST_POLICY") {
            Some(raw) => raw.parse()?,
            None => EmptyListPolicy::default(),
        };

        let users_file = lookup("USERS_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            port,
            auth_secret,
            empty_list_policy,
            users_file,
        })
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub workflow: VerificationWorkflow,
    pub users: UserDirectory,
    /// PostgreSQL pool. `None` in in-memory mode.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration and no users.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), UserDirectory::in_memory([]))
    }

    /// In-memory state with the given configuration and user directory.
    pub fn with_config(config: AppConfig, users: UserDirectory) -> Self {
        let workflow =
            VerificationWorkflow::new(DocumentStore::in_memory(), config.empty_list_policy);
        Self {
            workflow,
            users,
            db_pool: None,
            config,
        }
    }

    /// Postgres-backed state. Requests and users are both read from `pool`.
    pub fn with_pool(config: AppConfig, pool: PgPool) -> Self {
        let workflow = VerificationWorkflow::new(
            DocumentStore::Postgres(pool.clone()),
            config.empty_list_policy,
        );
        Self {
            workflow,
            users: UserDirectory::Postgres(pool.clone()),
            db_pool: Some(pool),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
