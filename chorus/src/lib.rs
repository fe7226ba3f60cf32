//! Chorus core library.
//!
//! Posts, groups, comments and follow edges behind an ownership policy, with
//! signed bearer tokens for identity and in-memory or Redis storage.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod id;
pub mod keys;
pub mod models;
pub mod policy;
pub mod runtime;
pub mod store;
pub mod validators;
pub mod views;

pub use api::Api;
pub use auth::{Credentials, MemoryLedger, PasswordHasher, RedisLedger, RefreshLedger, TokenService, TokenSettings};
pub use config::ChorusConfig;
pub use errors::*;
pub use models::*;
pub use policy::{Action, Decision, DenyReason, Resource, authorize};
pub use store::{MemoryStore, RedisStore, Store};
pub use views::*;

pub use redis;
pub use redis::aio::ConnectionManager;
