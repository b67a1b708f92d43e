//! CLI entry point for blogfront

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blogfront::config::StoreConfig;
use blogfront::helpers::ImageUrls;
use blogfront::store::{ContentStore, HttpStore, MemoryStore};
use blogfront::Blog;

#[derive(Parser)]
#[command(name = "blogfront")]
#[command(version)]
#[command(about = "A blog front end with moderated comments", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Serve documents from a local JSON/NDJSON file instead of the store
    #[arg(short, long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prerender all posts and start the server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,
    },

    /// Render every post into the public folder
    #[command(alias = "g")]
    Generate,

    /// List post slugs
    List,

    /// Remove the public folder
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "blogfront=debug,info"
    } else {
        "blogfront=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let fixture = cli.fixture.as_deref();

    match cli.command {
        Commands::Serve { port, ip } => {
            let blog = open_blog(&base_dir, fixture, true)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            blogfront::server::start(&blog, &ip, port).await?;
        }

        Commands::Generate => {
            let blog = open_blog(&base_dir, fixture, false)?;
            tracing::info!("Generating static files...");
            blog.generate().await?;
            println!("Generated successfully!");
        }

        Commands::List => {
            let blog = open_blog(&base_dir, fixture, false)?;
            blogfront::commands::list::run(&blog).await?;
        }

        Commands::Clean => {
            // Only the site config is needed; no store connection.
            tracing::info!("Cleaning public folder...");
            blogfront::commands::clean::run(&base_dir)?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("blogfront version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Open the content store and the site rooted at `base_dir`.
///
/// Store settings are validated here, before any work starts. With
/// `needs_writes`, a missing API token is fatal unless a fixture is used.
fn open_blog(base_dir: &Path, fixture: Option<&Path>, needs_writes: bool) -> Result<Blog> {
    let (store, images): (Arc<dyn ContentStore>, ImageUrls) = match fixture {
        Some(path) => {
            let store = MemoryStore::from_file(path)
                .with_context(|| format!("failed to load fixture {:?}", path))?;
            tracing::info!("Using fixture documents from {:?}", path);
            let images = match StoreConfig::from_env() {
                Ok(config) => config.images(),
                Err(e) => {
                    tracing::debug!("No store config for image URLs: {}", e);
                    ImageUrls::new("fixture", "production")
                }
            };
            (Arc::new(store), images)
        }
        None => {
            let config = StoreConfig::from_env()?;
            if needs_writes {
                config.write_token()?;
            }
            tracing::debug!(
                project = %config.project_id,
                dataset = %config.dataset,
                cdn = config.use_cdn,
                "Content store configured"
            );
            (Arc::new(HttpStore::new(&config)?), config.images())
        }
    };

    Blog::new(base_dir, store, images)
}
