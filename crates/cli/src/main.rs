use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod settings;

#[derive(Parser)]
#[command(name = "pinboard")]
#[command(about = "Pin messages of saved chat pages and browse them as folders", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pin store file (overrides PINBOARD_STORE)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Configuration file with [timing] and [[sites]] (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured sites and the hosts they serve
    Sites,

    /// List the pinnable messages of a page
    Scan(PageArgs),

    /// Pin a message, or unpin it when already pinned
    Toggle {
        #[command(flatten)]
        page: PageArgs,

        /// Message index, as printed by `scan`
        #[arg(long)]
        index: usize,
    },

    /// Jump to a pin of the page's conversation; removes it if it no longer resolves
    Jump {
        #[command(flatten)]
        page: PageArgs,

        /// Pin id, as printed by `list`
        #[arg(long)]
        pin: String,
    },

    /// Show every conversation's pins as the sidebar would
    List {
        /// Page URL whose conversation is treated as current
        #[arg(long)]
        url: Option<String>,
    },

    /// Delete one pin or a whole conversation folder
    Delete {
        /// Conversation path, e.g. /chat/abc
        #[arg(long)]
        conversation: String,

        /// Only this pin
        #[arg(long)]
        pin: Option<String>,
    },
}

#[derive(Args, Clone)]
struct PageArgs {
    /// Page URL; its host selects the site and its path the conversation
    #[arg(long)]
    url: String,

    /// Saved HTML of the page
    #[arg(long)]
    html: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let settings = settings::Settings::load(cli.config.as_deref(), cli.store.clone())?;
    let out = output::Output::new(cli.json);

    match cli.command {
        Commands::Sites => commands::sites(&settings, &out),
        Commands::Scan(page) => commands::scan(&settings, &out, &page.url, &page.html).await,
        Commands::Toggle { page, index } => {
            commands::toggle(&settings, &out, &page.url, &page.html, index).await
        }
        Commands::Jump { page, pin } => {
            commands::jump(&settings, &out, &page.url, &page.html, &pin).await
        }
        Commands::List { url } => commands::list(&settings, &out, url.as_deref()).await,
        Commands::Delete { conversation, pin } => {
            commands::delete(&settings, &out, &conversation, pin.as_deref()).await
        }
    }
}
