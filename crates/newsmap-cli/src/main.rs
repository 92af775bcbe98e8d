mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::article::ArticleSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "newsmap",
    about = "Build and serve a Google News sitemap of recently published articles",
    version,
    propagate_version = true
)]
struct Cli {
    /// Site root (default: nearest directory containing .newsmap/)
    #[arg(long, global = true, env = "NEWSMAP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .newsmap/ with a default config and an empty content database
    Init {
        /// Publication name (default: the root directory's name)
        #[arg(long)]
        name: Option<String>,

        /// Publication language code
        #[arg(long)]
        language: Option<String>,
    },

    /// Rebuild the cached sitemap once
    Build,

    /// Serve the sitemap and admin pages, rebuilding on the configured interval
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show cache freshness and the rebuild schedule
    Status,

    /// Manage articles in the content database
    Article {
        #[command(subcommand)]
        subcommand: ArticleSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name, language } => {
            cmd::init::run(&root, name.as_deref(), language.as_deref())
        }
        Commands::Build => cmd::build::run(&root, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Article { subcommand } => cmd::article::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
