use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use tracing::info;
use url::Url;

use crate::db::{RoleInsert, RoleStore};
use crate::documents::{genre_collection, DocumentStore, MovieRecord};
use crate::fetch::PageSource;
use crate::parser::{detail, listing};
use crate::settings::Settings;

/// Totals for one run, across all genres.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub genres: usize,
    pub movies: usize,
    pub roles_inserted: usize,
    pub roles_duplicate: usize,
    pub roles_failed: usize,
}

impl RunStats {
    fn record_role(&mut self, outcome: RoleInsert) {
        match outcome {
            RoleInsert::Inserted => self.roles_inserted += 1,
            RoleInsert::Duplicate => self.roles_duplicate += 1,
            RoleInsert::Skipped | RoleInsert::Failed => self.roles_failed += 1,
        }
    }
}

/// Drives one scrape: listing → details → both stores, one page at a time.
pub struct Pipeline<'a, S: PageSource> {
    settings: &'a Settings,
    base: Url,
    source: S,
    roles: &'a RoleStore,
    documents: &'a mut DocumentStore,
}

impl<'a, S: PageSource> Pipeline<'a, S> {
    pub fn new(
        settings: &'a Settings,
        source: S,
        roles: &'a RoleStore,
        documents: &'a mut DocumentStore,
    ) -> Result<Self> {
        Ok(Self {
            settings,
            base: settings.base_url()?,
            source,
            roles,
            documents,
        })
    }

    /// Scrape every genre in order. Fetch and extraction errors abort the run;
    /// whatever was already written stays.
    pub async fn run(&mut self, genres: &[String]) -> Result<RunStats> {
        let mut stats = RunStats::default();
        for genre in genres {
            self.scrape_genre(genre, &mut stats)
                .await
                .with_context(|| format!("Genre {} failed", genre))?;
            stats.genres += 1;
        }
        Ok(stats)
    }

    async fn scrape_genre(&mut self, genre: &str, stats: &mut RunStats) -> Result<()> {
        let genre = genre.to_lowercase();
        info!("Starting genre {}", genre);

        let list_url = self.settings.listing_url_for(&genre);
        let body = self.source.fetch(&list_url).await?;
        let entries = {
            let doc = Html::parse_document(&body);
            listing::extract(&doc, &self.base)
                .with_context(|| format!("Unexpected listing markup at {}", list_url))?
        };
        info!("{} movies listed for {}", entries.len(), genre);

        let collection = genre_collection(&genre);
        let removed = self.documents.reset_genre_collection(&collection)?;
        if removed > 0 {
            info!("Cleared {} documents from {}", removed, collection);
        }

        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        pb.set_message(genre.clone());

        for entry in entries {
            info!("{}. {} ({})", entry.rank, entry.title, entry.url);
            let body = self.source.fetch(&entry.url).await?;
            let page = {
                let doc = Html::parse_document(&body);
                detail::extract(&doc)
                    .with_context(|| format!("Unexpected title markup at {}", entry.url))?
            };

            for role in &page.roles {
                stats.record_role(self.roles.insert(&role.name, &role.label));
            }

            let record = MovieRecord::from_parts(entry, page);
            let id = self.documents.insert(&record)?;
            info!("Stored '{}' as document {}", record.title, id);
            stats.movies += 1;
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!("{} now holds {} documents", collection, self.documents.count()?);
        Ok(())
    }
}
