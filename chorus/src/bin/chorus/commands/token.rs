use anyhow::Result;
use chorus::{Credentials, MemoryLedger};
use chrono::Utc;
use clap::Subcommand;

use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Obtaining Tokens",
        commands: &[
            "chorus token obtain alice --password s3cret",
            "chorus token obtain alice --output compact   # Print only the access token",
        ],
    },
    ExampleGroup {
        title: "Refreshing and Inspecting",
        commands: &[
            "chorus token refresh <refresh-token>",
            "chorus token inspect <token>                 # Verify the signature and show claims",
        ],
    },
];

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Exchange credentials for an access/refresh token pair
    #[command(name = "obtain")]
    Obtain {
        handle: String,

        #[arg(long, env = "CHORUS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Exchange a refresh token for a new access token
    #[command(name = "refresh")]
    Refresh { token: String },

    /// Verify a token's signature and print its claims
    #[command(name = "inspect")]
    Inspect { token: String },
}

pub async fn handle_token_commands(command: TokenCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    match command {
        TokenCommands::Obtain { handle, password } => {
            let api = ctx.api(output).await?;
            let pair = api.obtain_tokens(&Credentials::new(handle, password)).await?;
            output.display(&pair)?;
        }
        TokenCommands::Refresh { token } => {
            let api = ctx.api(output).await?;
            let refreshed = api.refresh_token(&token).await?;
            if refreshed.refresh.is_some() {
                output.info("The previous refresh token has been consumed");
            }
            output.display(&refreshed)?;
        }
        TokenCommands::Inspect { token } => {
            // Signature checks only need the secret, not the ledger.
            let tokens = ctx.token_service(MemoryLedger::new())?;
            let claims = tokens.decode(&token)?;
            if claims.is_expired_at(Utc::now()) {
                output.warning(&format!("Token expired at {}", claims.expires_at().to_rfc3339()));
            }
            output.display(&claims)?;
        }
    }
    Ok(())
}
