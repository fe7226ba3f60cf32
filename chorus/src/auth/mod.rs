//! Identity and session handling: credential hashing, signed tokens and the refresh ledger.

pub mod ledger;
pub mod password;
pub mod token;

use serde::Deserialize;

pub use ledger::{MemoryLedger, RedisLedger, RefreshLedger};
pub use password::PasswordHasher;
pub use token::{Claims, Refreshed, TokenKind, TokenPair, TokenService, TokenSettings};

/// Body of a token request.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub handle: String,
    pub password: String,
}

impl Credentials {
    pub fn new(handle: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            password: password.into(),
        }
    }
}
