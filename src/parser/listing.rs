use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::{clean_text, first, ExtractError, ExtractResult};

static LIST: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.lister-list").unwrap());
static ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.lister-item.mode-simple").unwrap());
static TITLE_COL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.col-title").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static RANK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.lister-item-index.unbold.text-primary").unwrap());

/// One row of a genre listing, in site rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub rank: String,
    pub title: String,
    pub url: String,
}

/// Extract every listed movie. Any entry missing its expected parts fails the page.
pub fn extract(doc: &Html, base: &Url) -> ExtractResult<Vec<ListingEntry>> {
    let list = first(doc.root_element(), &LIST, "div.lister-list")?;

    list.select(&ITEM)
        .map(|item| -> ExtractResult<ListingEntry> {
            let col = first(item, &TITLE_COL, "div.col-title")?;
            let link = first(col, &LINK, "div.col-title a")?;
            let href = link.value().attr("href").ok_or(ExtractError::MissingAttribute {
                element: "div.col-title a",
                attr: "href",
            })?;
            let url = base.join(href).map_err(|source| ExtractError::BadLink {
                href: href.to_string(),
                source,
            })?;
            let rank_text = clean_text(first(col, &RANK, "span.lister-item-index")?);
            let rank = rank_text
                .strip_suffix('.')
                .unwrap_or(&rank_text)
                .to_string();

            Ok(ListingEntry {
                rank,
                title: clean_text(link),
                url: url.to_string(),
            })
        })
        .collect()
}
