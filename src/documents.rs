use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::connect;
use crate::parser::detail::DetailPage;
use crate::parser::listing::ListingEntry;

/// Field names owned by the record itself; discovered metadata may not reuse them.
const FIXED_FIELDS: &[&str] = &["Rank", "Title", "URL", "Genre", "Plot"];

/// One movie document. Metadata groups discovered on the detail page are
/// flattened next to the fixed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(rename = "Rank")]
    pub rank: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Genre")]
    pub genre: Vec<String>,
    #[serde(rename = "Plot")]
    pub plot: String,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Vec<String>>,
}

impl MovieRecord {
    pub fn from_parts(entry: ListingEntry, detail: DetailPage) -> Self {
        let mut metadata = detail.metadata;
        metadata.retain(|key, _| {
            let fixed = FIXED_FIELDS.contains(&key.as_str());
            if fixed {
                warn!("Dropping metadata group '{}' on {}: reserved field", key, entry.title);
            }
            !fixed
        });
        Self {
            rank: entry.rank,
            title: entry.title,
            url: entry.url,
            genre: detail.genres,
            plot: detail.plot,
            metadata,
        }
    }
}

/// Collection name holding one genre's movies.
pub fn genre_collection(genre: &str) -> String {
    format!("{}boxoffice", genre.to_lowercase())
}

/// Optional people filters for [`DocumentStore::query`].
#[derive(Debug, Default, Clone)]
pub struct MovieFilter {
    pub director: Option<String>,
    pub writer: Option<String>,
    pub actor: Option<String>,
}

impl MovieFilter {
    /// (value, singular field, plural field) for every supplied, non-empty filter.
    fn clauses(&self) -> Vec<(&str, &'static str, &'static str)> {
        [
            (self.director.as_deref(), "Director", "Directors"),
            (self.writer.as_deref(), "Writer", "Writers"),
            (self.actor.as_deref(), "Star", "Stars"),
        ]
        .into_iter()
        .filter_map(|(value, singular, plural)| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| (v, singular, plural))
        })
        .collect()
    }
}

/// JSON documents partitioned by collection name, kept in one SQLite table.
pub struct DocumentStore {
    conn: Connection,
    current: Option<String>,
}

impl DocumentStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path).context("Document store unavailable")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id         INTEGER PRIMARY KEY,
                collection TEXT NOT NULL,
                body       TEXT NOT NULL CHECK (json_valid(body))
            );
            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
            ",
        )
        .context("Failed to create documents table")?;
        Ok(Self {
            conn,
            current: None,
        })
    }

    pub fn select_collection(&mut self, name: &str) {
        self.current = Some(name.to_string());
    }

    /// Select `name` and delete everything in it.
    pub fn reset_genre_collection(&mut self, name: &str) -> Result<usize> {
        self.select_collection(name);
        let removed = self
            .conn
            .execute("DELETE FROM documents WHERE collection = ?1", [name])
            .with_context(|| format!("Failed to clear collection {}", name))?;
        Ok(removed)
    }

    /// Insert into the selected collection, returning the new document id.
    pub fn insert(&self, record: &MovieRecord) -> Result<i64> {
        let collection = self.selected()?;
        let body = serde_json::to_string(record)?;
        self.conn
            .execute(
                "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
                rusqlite::params![collection, body],
            )
            .with_context(|| format!("Failed to insert '{}' into {}", record.title, collection))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// (Rank, Title) of the genre's movies matching every supplied filter.
    pub fn query(&mut self, genre: &str, filter: &MovieFilter) -> Result<Vec<(String, String)>> {
        let collection = genre_collection(genre);
        self.select_collection(&collection);

        let mut conditions = vec!["collection = ?1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        params.push(Box::new(collection));

        for (value, singular, plural) in filter.clauses() {
            let n = params.len() + 1;
            conditions.push(format!(
                "({} OR {})",
                field_holds(singular, n),
                field_holds(plural, n)
            ));
            params.push(Box::new(value.to_string()));
        }

        let sql = format!(
            "SELECT json_extract(body, '$.Rank'), json_extract(body, '$.Title')
             FROM documents
             WHERE {}
             ORDER BY id",
            conditions.join(" AND ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The genre's document titled exactly `title`. With duplicate titles the
    /// earliest inserted one wins.
    pub fn get_detail(&mut self, genre: &str, title: &str) -> Result<Option<MovieRecord>> {
        self.select_collection(&genre_collection(genre));
        let collection = self.selected()?;
        let mut stmt = self.conn.prepare(
            "SELECT body FROM documents
             WHERE collection = ?1 AND json_extract(body, '$.Title') = ?2
             ORDER BY id
             LIMIT 1",
        )?;
        let mut rows = stmt.query(rusqlite::params![collection, title])?;
        match rows.next()? {
            Some(row) => {
                let body: String = row.get(0)?;
                let record = serde_json::from_str(&body)
                    .with_context(|| format!("Malformed document for '{}'", title))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Number of documents in the selected collection.
    pub fn count(&self) -> Result<usize> {
        let collection = self.selected()?;
        let n: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close document store")
    }

    fn selected(&self) -> Result<&str> {
        self.current
            .as_deref()
            .context("No collection selected")
    }
}

/// SQL predicate: `field` equals `?n`, or is an array containing it.
fn field_holds(field: &str, n: usize) -> String {
    format!(
        "EXISTS (SELECT 1 FROM json_each(body, '$.\"{}\"') WHERE json_each.value = ?{})",
        field, n
    )
}
