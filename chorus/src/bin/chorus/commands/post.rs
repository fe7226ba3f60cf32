use anyhow::Result;
use chorus::models::{GroupId, Page, PostId, PostQuery};
use clap::Subcommand;

use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Browsing Posts",
    commands: &[
        "chorus post list                        # Newest first",
        "chorus post list --group 2 --limit 10",
        "chorus post list --token <access> --following",
        "chorus post show 42",
    ],
}];

#[derive(Subcommand)]
pub enum PostCommands {
    /// List posts, newest first
    #[command(name = "list")]
    List {
        /// Only posts in this group
        #[arg(long)]
        group: Option<u64>,

        /// Only posts by users the token's owner follows
        #[arg(long, requires = "token")]
        following: bool,

        /// Access token identifying the reader
        #[arg(long, env = "CHORUS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show one post
    #[command(name = "show")]
    Show { id: u64 },
}

pub async fn handle_post_commands(command: PostCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let api = ctx.api(output).await?;

    match command {
        PostCommands::List {
            group,
            following,
            token,
            limit,
            offset,
        } => {
            let query = PostQuery {
                group: group.map(GroupId),
                following,
                page: Page { limit, offset },
            };
            let listing = api.list_posts(token.as_deref(), &query).await?;
            output.heading(&format!("Posts ({} total)", listing.count));
            output.display(&listing)?;
        }
        PostCommands::Show { id } => {
            let post = api.get_post(None, PostId(id)).await?;
            output.display(&post)?;
        }
    }
    Ok(())
}
