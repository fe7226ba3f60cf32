use std::path::Path;

use anyhow::{Context, Result};
use chorus::{
    Api, ChorusConfig, PasswordHasher, RedisLedger, RedisStore, RefreshLedger, TokenService,
    models::{Identity, UserId},
};

use crate::output::OutputManager;

/// Identity the CLI acts under for administrative commands. Never a stored user.
pub const OPERATOR: UserId = UserId(0);

pub fn operator() -> Identity {
    Identity::admin(OPERATOR)
}

/// Configuration plus lazily opened connections for one CLI invocation.
pub struct CliContext {
    pub config: ChorusConfig,
}

impl CliContext {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = ChorusConfig::load(path).context("Failed to load configuration")?;
        Ok(Self { config })
    }

    pub async fn store(&self, output: &OutputManager) -> Result<RedisStore> {
        let url = self
            .config
            .redis_url()
            .context("REDIS_URL environment variable not set. Set it to connect to Redis.")?;
        output.progress("Connecting to Redis");
        let store = RedisStore::connect(&url, self.config.redis.prefix.clone(), self.config.listing)
            .await
            .context("Failed to connect to Redis")?;
        output.clear_line();
        output.verbose(&format!("connected, key prefix {}:{}", store.prefix(), store.service()));
        Ok(store)
    }

    pub fn token_service<L: RefreshLedger>(&self, ledger: L) -> Result<TokenService<L>> {
        let secret = self
            .config
            .auth
            .secret()
            .context("CHORUS_SECRET must be set to a value of at least 32 bytes")?;
        let settings = self.config.auth.token_settings()?;
        Ok(TokenService::new(secret.as_bytes(), settings, ledger))
    }

    pub async fn api(&self, output: &OutputManager) -> Result<Api<RedisStore, RedisLedger>> {
        let store = self.store(output).await?;
        let ledger = RedisLedger::new(store.connection(), store.prefix(), store.service());
        let tokens = self.token_service(ledger)?;
        let hasher = PasswordHasher::new(self.config.auth.password_iterations);
        Ok(Api::new(store, tokens, hasher))
    }
}
