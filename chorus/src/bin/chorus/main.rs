mod commands;
mod context;
mod examples;
mod output;
mod theme;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{Styles, styling::AnsiColor},
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};

use commands::{
    group::{GroupCommands, handle_group_commands},
    post::{PostCommands, handle_post_commands},
    token::{TokenCommands, handle_token_commands},
    user::{UserCommands, handle_user_commands},
};
use context::CliContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL (default for [redis] url)"),
    ("CHORUS_SECRET", "Token signing secret, at least 32 bytes (default for [auth] secret)"),
    ("CHORUS_PASSWORD", "Password for 'user register' and 'token obtain'"),
    ("CHORUS_TOKEN", "Access token for 'post list --following'"),
    ("RUST_LOG", "Log filter, e.g. chorus=debug"),
];

#[derive(Parser)]
#[command(name = "chorus")]
#[command(version)]
#[command(
    about = "Operator CLI for the chorus content service",
    long_about = r#"Operator CLI for the chorus content service:

• Register users and administrators
• Manage groups as the administrative operator
• Obtain, refresh and inspect bearer tokens
• Browse posts and following feeds

Commands:
  user    Register users
  group   Create, list and delete groups
  token   Obtain, refresh and inspect tokens
  post    List and show posts
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (defaults to ./chorus.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register users
    #[command(subcommand)]
    User(UserCommands),

    /// Create, list and delete groups
    #[command(subcommand)]
    Group(GroupCommands),

    /// Obtain, refresh and inspect bearer tokens
    #[command(subcommand)]
    Token(TokenCommands),

    /// List and show posts
    #[command(subcommand)]
    Post(PostCommands),
}

impl Cli {
    /// Parses arguments with the themed help styles and per-command examples.
    fn parse_styled() -> Self {
        let matches = build_command()
            .styles(help_styles())
            .try_get_matches()
            .unwrap_or_else(|err| exit_with(err));
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| exit_with(err))
    }
}

fn exit_with(err: clap::error::Error) -> ! {
    let informational = matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
    blank_line(informational);
    if let Err(io_err) = err.print()
        && io_err.kind() != io::ErrorKind::BrokenPipe
    {
        eprintln!("Failed to print usage: {io_err}");
    }
    blank_line(informational);
    std::process::exit(err.exit_code());
}

fn blank_line(stdout: bool) {
    let _ = if stdout {
        writeln!(io::stdout())
    } else {
        writeln!(io::stderr())
    };
}

fn build_command() -> Command {
    let use_color = ShouldColorize::from_env().should_colorize();
    let mut command = Cli::command()
        .color(if use_color { ColorChoice::Auto } else { ColorChoice::Never })
        .after_long_help(appendix(use_color));
    for entry in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(entry.name) {
            *subcommand = subcommand.clone().after_long_help(examples_help(entry.groups, use_color));
        }
    }
    command
}

/// Accumulates help text, painting it with the theme when colour is on.
struct HelpText {
    use_color: bool,
    text: String,
}

impl HelpText {
    fn new(use_color: bool) -> Self {
        Self {
            use_color,
            text: String::new(),
        }
    }

    fn paint(&self, text: &str, color: ThemeColor, bold: bool) -> String {
        if !self.use_color {
            return text.to_string();
        }
        let painted = text.color(color);
        if bold { painted.bold().to_string() } else { painted.to_string() }
    }

    fn heading(&mut self, title: &str) {
        let line = self.paint(title, THEME.accent, true);
        self.text.push_str(&line);
        self.text.push('\n');
    }

    fn line(&mut self, indent: usize, parts: &[String]) {
        self.text.push_str(&" ".repeat(indent));
        self.text.push_str(&parts.join(" "));
        self.text.push('\n');
    }

    fn gap(&mut self) {
        self.text.push('\n');
    }
}

fn examples_help(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut help = HelpText::new(use_color);
    help.heading("Examples:");
    for (position, group) in groups.iter().enumerate() {
        if position > 0 {
            help.gap();
        }
        let title = help.paint(group.title, THEME.title, true);
        help.line(2, &[title]);
        for example in group.commands {
            let arrow = help.paint(ICONS.arrow, THEME.command, false);
            let example = help.paint(example, THEME.command, false);
            help.line(4, &[arrow, example]);
        }
    }
    help.text
}

fn appendix(use_color: bool) -> String {
    let mut help = HelpText::new(use_color);
    help.heading("Environment Variables:");
    for (name, meaning) in ENVIRONMENT_VARIABLES {
        let name = help.paint(name, THEME.label, true);
        let meaning = help.paint(meaning, THEME.text, false);
        help.line(2, &[format!("{name} "), meaning]);
    }
    help.gap();
    let tip = help.paint("Tip:", THEME.accent, true);
    let hint = help.paint("run 'chorus <command> --help' for worked examples.", THEME.command, false);
    help.line(0, &[tip, hint]);
    help.text
}

/// Clap styles matching the output theme.
fn help_styles() -> Styles {
    Styles::styled()
        .usage(AnsiColor::BrightBlue.on_default().bold())
        .header(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Magenta.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().bold())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_styled();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli, &output).await {
        output.error(&format!("{err:#}"));
        if let Some(chorus_err) = err.downcast_ref::<chorus::Error>() {
            for issue in chorus_err.validation_issues() {
                output.error(&format!("  {}: {} ({})", issue.field, issue.message, issue.code));
            }
        }
        std::process::exit(1);
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let ctx = CliContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::User(command) => handle_user_commands(command, &ctx, output).await,
        Commands::Group(command) => handle_group_commands(command, &ctx, output).await,
        Commands::Token(command) => handle_token_commands(command, &ctx, output).await,
        Commands::Post(command) => handle_post_commands(command, &ctx, output).await,
    }
}
