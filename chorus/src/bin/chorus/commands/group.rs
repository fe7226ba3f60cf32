use anyhow::Result;
use chorus::{
    GroupView, Store,
    models::{GroupId, NewGroup, Page},
};
use clap::Subcommand;

use crate::context::{CliContext, operator};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Managing Groups",
        commands: &[
            "chorus group create rust --title \"Rust\" --description \"Systems talk\"",
            "chorus group delete 3                  # Posts in the group are kept, ungrouped",
        ],
    },
    ExampleGroup {
        title: "Listing",
        commands: &[
            "chorus group list",
            "chorus group list --limit 5 --offset 10 --output json",
        ],
    },
];

/// Group management runs as the administrative operator.
#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a group
    #[command(name = "create")]
    Create {
        /// URL-safe unique slug
        slug: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,
    },

    /// List groups by id
    #[command(name = "list")]
    List {
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Delete a group, detaching its posts
    #[command(name = "delete")]
    Delete { id: u64 },
}

pub async fn handle_group_commands(command: GroupCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let store = ctx.store(output).await?;
    let operator = operator();

    match command {
        GroupCommands::Create {
            slug,
            title,
            description,
        } => {
            let group = store
                .create_group(
                    Some(&operator),
                    NewGroup {
                        title,
                        slug,
                        description,
                    },
                )
                .await?;
            output.success(&format!("Created group {}", group.slug));
            output.display(&GroupView::from(group))?;
        }
        GroupCommands::List { limit, offset } => {
            let listing = store.list_groups(&Page { limit, offset }).await?.map(GroupView::from);
            output.heading(&format!("Groups ({} total)", listing.count));
            output.display(&listing)?;
        }
        GroupCommands::Delete { id } => {
            store.delete_group(Some(&operator), GroupId(id)).await?;
            output.success(&format!("Deleted group {id}"));
        }
    }
    Ok(())
}
