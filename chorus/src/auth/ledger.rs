use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use redis::aio::ConnectionManager;

use crate::{errors::Error, keys::KeyContext};

/// Tracks refresh-token identifiers that may still be exchanged.
///
/// `consume` must be atomic: of two concurrent calls with the same `jti`, at most one returns `true`.
#[allow(async_fn_in_trait)]
pub trait RefreshLedger {
    /// Records `jti` as exchangeable until `expires_at`; `now` is the issuing clock reading.
    async fn register(&self, jti: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), Error>;

    /// Removes `jti`, returning whether it was present and unexpired at `now`.
    async fn consume(&self, jti: &str, now: DateTime<Utc>) -> Result<bool, Error>;
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    active: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }

    /// Drops entries that expired before `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        self.active.lock().retain(|_, expiry| *expiry > now);
    }
}

impl RefreshLedger for MemoryLedger {
    /// Registering also evicts entries that expired before `now`.
    async fn register(&self, jti: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), Error> {
        let mut active = self.active.lock();
        active.retain(|_, expiry| *expiry > now);
        active.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn consume(&self, jti: &str, now: DateTime<Utc>) -> Result<bool, Error> {
        Ok(self
            .active
            .lock()
            .remove(jti)
            .is_some_and(|expiry| expiry > now))
    }
}

/// Redis-backed ledger: one key per live refresh token, expiring with it.
#[derive(Clone)]
pub struct RedisLedger {
    conn: ConnectionManager,
    prefix: String,
    service: String,
}

impl RedisLedger {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            service: service.into(),
        }
    }

    fn key(&self, jti: &str) -> String {
        KeyContext::new(&self.prefix, &self.service).refresh_token(jti)
    }
}

impl RefreshLedger for RedisLedger {
    async fn register(&self, jti: &str, expires_at: DateTime<Utc>, _now: DateTime<Utc>) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(self.key(jti))
            .arg(1)
            .arg("EXAT")
            .arg(expires_at.timestamp())
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn consume(&self, jti: &str, _now: DateTime<Utc>) -> Result<bool, Error> {
        // Expired keys are already gone; DEL reports whether this caller removed it.
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL").arg(self.key(jti)).query_async(&mut conn).await?;
        Ok(removed == 1)
    }
}
