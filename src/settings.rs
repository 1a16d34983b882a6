use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

const DEFAULT_CONFIG: &str = "boxoffice";

const GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Animation",
    "Biography",
    "Comedy",
    "Crime",
    "Drama",
    "Family",
    "Fantasy",
    "Film-Noir",
    "History",
    "Horror",
    "Music",
    "Musical",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Short",
    "Sport",
    "Superhero",
    "Thriller",
    "War",
    "Western",
];

/// Run configuration. Every field can come from `boxoffice.toml` or a
/// `BOXOFFICE_*` environment variable; anything unset keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base that relative movie links are resolved against.
    pub site_base_url: String,
    /// Genre search page; the lowercased genre is appended.
    pub listing_url: String,
    pub user_agent: String,
    pub genres: Vec<String>,
    pub roles_db: PathBuf,
    pub documents_db: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_base_url: "http://www.imdb.com".to_string(),
            listing_url:
                "https://www.imdb.com/search/title/?title_type=feature&explore=genres&view=simple&genres="
                    .to_string(),
            user_agent: "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/109.0.0.0 Mobile Safari/537.36"
                .to_string(),
            genres: GENRES.iter().map(|g| g.to_string()).collect(),
            roles_db: PathBuf::from("data/movieroles.sqlite"),
            documents_db: PathBuf::from("data/boxoffice.sqlite"),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Layer an explicit (required) or default (optional) file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("BOXOFFICE")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("genres"),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(settings)
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.site_base_url)
            .with_context(|| format!("Invalid site_base_url {:?}", self.site_base_url))
    }

    pub fn listing_url_for(&self, genre: &str) -> String {
        format!("{}{}", self.listing_url, genre.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // `load` reads process-wide env vars; tests that call it take turns.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_cover_all_genres() {
        let s = Settings::default();
        assert_eq!(s.genres.len(), 23);
        assert_eq!(s.genres.first().map(String::as_str), Some("Action"));
        assert!(s.base_url().is_ok());
    }

    #[test]
    fn listing_url_lowercases_genre() {
        let s = Settings::default();
        assert!(s.listing_url_for("Sci-Fi").ends_with("&genres=sci-fi"));
    }

    #[test]
    fn file_overrides_only_what_it_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxoffice.toml");
        std::fs::write(
            &path,
            r#"
genres = ["Action", "Drama"]
roles_db = "/tmp/roles.sqlite"
"#,
        )
        .unwrap();

        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.genres, vec!["Action", "Drama"]);
        assert_eq!(s.roles_db, PathBuf::from("/tmp/roles.sqlite"));
        assert_eq!(s.documents_db, Settings::default().documents_db);
        assert_eq!(s.request_timeout_secs, 30);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn env_vars_override_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("BOXOFFICE_GENRES", "Action,Drama");
        std::env::set_var("BOXOFFICE_REQUEST_TIMEOUT_SECS", "5");
        let loaded = Settings::load(None);
        std::env::remove_var("BOXOFFICE_GENRES");
        std::env::remove_var("BOXOFFICE_REQUEST_TIMEOUT_SECS");

        let s = loaded.unwrap();
        assert_eq!(s.genres, vec!["Action", "Drama"]);
        assert_eq!(s.request_timeout_secs, 5);
        assert_eq!(s.roles_db, Settings::default().roles_db);
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let s = Settings {
            site_base_url: "not a url".to_string(),
            ..Settings::default()
        };
        assert!(s.base_url().is_err());
    }
}
