use anyhow::Result;
use chorus::models::Role;
use clap::Subcommand;

use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Registration",
    commands: &[
        "chorus user register alice --password s3cret         # Register a member",
        "chorus user register root --password s3cret --admin  # Register an administrator",
        "CHORUS_PASSWORD=s3cret chorus user register bob      # Read the password from the environment",
    ],
}];

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    #[command(name = "register")]
    Register {
        /// Unique handle (letters, digits and @.+-_)
        handle: String,

        /// Password for the new account
        #[arg(long, env = "CHORUS_PASSWORD", hide_env_values = true)]
        password: String,

        /// Grant the administrator role
        #[arg(long)]
        admin: bool,
    },
}

pub async fn handle_user_commands(command: UserCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    match command {
        UserCommands::Register {
            handle,
            password,
            admin,
        } => {
            let api = ctx.api(output).await?;
            let role = if admin { Role::Admin } else { Role::Member };
            let user = api.register(&handle, &password, role).await?;
            output.success(&format!("Registered {}", user.handle));
            output.display(&user)?;
        }
    }
    Ok(())
}
