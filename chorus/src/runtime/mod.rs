//! Redis mutation runtime: JSON commands executed atomically by Lua scripts.

pub mod commands;
pub mod executor;
pub mod scripts;

pub use commands::*;
pub use executor::{MutationExecutor, RedisExecutor, execute_command};
