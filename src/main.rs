mod db;
mod documents;
mod fetch;
mod parser;
mod pipeline;
mod roles;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use db::RoleStore;
use documents::{DocumentStore, MovieFilter};
use fetch::HttpFetcher;
use pipeline::Pipeline;
use settings::Settings;

#[derive(Parser)]
#[command(name = "boxoffice_scraper", about = "Top movies per genre into a role table and genre collections")]
struct Cli {
    /// Configuration file (default: ./boxoffice.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape listings and title pages, replacing each genre's collection
    Run {
        /// Genres to scrape (default: the configured list)
        #[arg(short, long = "genre")]
        genres: Vec<String>,
    },
    /// List rank and title of stored movies, optionally filtered by people
    Query {
        genre: String,
        #[arg(long)]
        director: Option<String>,
        #[arg(long)]
        writer: Option<String>,
        #[arg(long)]
        actor: Option<String>,
    },
    /// Print the stored document for one title
    Detail { genre: String, title: String },
    /// List the names recorded for a role (Directors, Writers, Stars, ...)
    Roles { role: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run { genres } => {
            let genres = if genres.is_empty() {
                settings.genres.clone()
            } else {
                genres
            };
            let roles = RoleStore::open(&settings.roles_db)?;
            let mut docs = DocumentStore::open(&settings.documents_db)?;
            info!("Scraping {} genres", genres.len());

            let fetcher = HttpFetcher::new(&settings)?;
            let stats = Pipeline::new(&settings, fetcher, &roles, &mut docs)?
                .run(&genres)
                .await?;
            println!(
                "Stored {} movies across {} genres; roles: {} new, {} duplicate, {} failed ({} total).",
                stats.movies,
                stats.genres,
                stats.roles_inserted,
                stats.roles_duplicate,
                stats.roles_failed,
                roles.count()?,
            );

            roles.close()?;
            docs.close()?;
            Ok(())
        }
        Commands::Query {
            genre,
            director,
            writer,
            actor,
        } => {
            let docs = DocumentStore::open(&settings.documents_db)?;
            let filter = MovieFilter {
                director,
                writer,
                actor,
            };
            let rows = query_and_close(docs, &genre, &filter)?;
            if rows.is_empty() {
                println!("No movies found. Run 'run' first or loosen the filters.");
            } else {
                println!("{:>4} | {:<50}", "Rank", "Title");
                println!("{}", "-".repeat(57));
                for (rank, title) in &rows {
                    println!("{:>4} | {:<50}", rank, truncate(title, 50));
                }
                println!("\n{} movies in {}", rows.len(), documents::genre_collection(&genre));
            }
            Ok(())
        }
        Commands::Detail { genre, title } => {
            let mut docs = DocumentStore::open(&settings.documents_db)?;
            match docs.get_detail(&genre, &title)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("No movie titled {:?} in {}.", title, documents::genre_collection(&genre)),
            }
            docs.close()
        }
        Commands::Roles { role } => {
            let store = RoleStore::open(&settings.roles_db)?;
            let names = store.names_for_role(&role)?;
            for name in &names {
                println!("{}", name);
            }
            println!("\n{} names for {}", names.len(), roles::normalize_role(&role));
            store.close()
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// The store is closed whether or not anything matched.
fn query_and_close(
    mut docs: DocumentStore,
    genre: &str,
    filter: &MovieFilter,
) -> anyhow::Result<Vec<(String, String)>> {
    let rows = docs.query(genre, filter)?;
    docs.close()?;
    Ok(rows)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
