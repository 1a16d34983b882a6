use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{clean_text, first, ExtractResult};

static GENRE_CHIP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.ipc-chip__text").unwrap());
static PLOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[data-testid="plot-xl"]"#).unwrap());
static CREDITS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "ul.ipc-metadata-list.ipc-metadata-list--dividers-all.title-pc-list.ipc-metadata-list--baseAlt",
    )
    .unwrap()
});
static CREDIT_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"li[data-testid="title-pc-principal-credit"]"#).unwrap());
static CREDIT_LABEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[class*="ipc-metadata-list-item__label ipc-metadata-list-item__label"]"#)
        .unwrap()
});
static CREDIT_VALUE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[class*="ipc-metadata-list-item__list-content-item ipc-metadata-list-item__list-content-item"]"#,
    )
    .unwrap()
});

/// A person credited under a metadata group, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEvent {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailPage {
    pub genres: Vec<String>,
    pub plot: String,
    /// Metadata group label → credited names. A repeated label keeps the last group.
    pub metadata: BTreeMap<String, Vec<String>>,
    pub roles: Vec<RoleEvent>,
}

/// Pull genre chips, plot and principal credits from a title page.
pub fn extract(doc: &Html) -> ExtractResult<DetailPage> {
    let root = doc.root_element();

    let genres = root.select(&GENRE_CHIP).map(clean_text).collect();
    let plot = clean_text(first(root, &PLOT, "span[data-testid=plot-xl]")?);

    let credits = first(root, &CREDITS, "ul.title-pc-list")?;
    let mut metadata = BTreeMap::new();
    let mut roles = Vec::new();

    for item in credits.select(&CREDIT_ITEM) {
        let label = clean_text(first(item, &CREDIT_LABEL, "ipc-metadata-list-item__label")?);
        let names: Vec<String> = item.select(&CREDIT_VALUE).map(clean_text).collect();
        roles.extend(names.iter().map(|name| RoleEvent {
            name: name.clone(),
            label: label.clone(),
        }));
        metadata.insert(label, names);
    }

    Ok(DetailPage {
        genres,
        plot,
        metadata,
        roles,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parser::ExtractError;

    fn credit(label: &str, names: &[&str]) -> String {
        let items: String = names
            .iter()
            .map(|n| {
                format!(
                    r#"<li role="presentation" class="ipc-inline-list__item">
                         <a class="ipc-metadata-list-item__list-content-item ipc-metadata-list-item__list-content-item--link" href="/name/nm1/">{n}</a>
                       </li>"#
                )
            })
            .collect();
        format!(
            r#"<li role="presentation" class="ipc-metadata-list__item" data-testid="title-pc-principal-credit">
                 <span class="ipc-metadata-list-item__label ipc-metadata-list-item__label--btn">{label}</span>
                 <div class="ipc-metadata-list-item__content-container">
                   <ul class="ipc-inline-list ipc-inline-list--show-dividers baseAlt" role="presentation">{items}</ul>
                 </div>
               </li>"#
        )
    }

    /// A minimal title page with the given chips, plot and credit groups.
    pub(crate) fn title_page(genres: &[&str], plot: &str, credits: &[(&str, &[&str])]) -> String {
        let chips: String = genres
            .iter()
            .map(|g| format!(r#"<a class="ipc-chip ipc-chip--on-baseAlt"><span class="ipc-chip__text">{g}</span></a>"#))
            .collect();
        let groups: String = credits.iter().map(|(l, n)| credit(l, n)).collect();
        format!(
            r#"<html><body>
                 <div class="ipc-chip-list__scroller">{chips}</div>
                 <p data-testid="plot"><span data-testid="plot-xs_to_m">short</span><span data-testid="plot-xl">{plot}</span></p>
                 <ul class="ipc-metadata-list ipc-metadata-list--dividers-all title-pc-list ipc-metadata-list--baseAlt" role="presentation">{groups}</ul>
               </body></html>"#
        )
    }

    #[test]
    fn extracts_genres_plot_and_groups() {
        let html = title_page(
            &["Action", "Sci-Fi"],
            "A hacker learns\n   the truth.",
            &[
                ("Director", &["Jane Doe"]),
                ("Writers", &["Wendy Writer", "Will Writer"]),
                ("Stars", &["Sam Star", "Ann Lead", "Bo Third"]),
            ],
        );
        let page = extract(&Html::parse_document(&html)).unwrap();

        assert_eq!(page.genres, vec!["Action", "Sci-Fi"]);
        assert_eq!(page.plot, "A hacker learns the truth.");
        assert_eq!(page.metadata.len(), 3);
        assert_eq!(page.metadata["Director"], vec!["Jane Doe"]);
        assert_eq!(page.metadata["Writers"], vec!["Wendy Writer", "Will Writer"]);
        assert_eq!(page.metadata["Stars"].len(), 3);
    }

    #[test]
    fn one_role_event_per_credited_name() {
        let html = title_page(
            &[],
            "Plot.",
            &[("Director", &["Jane Doe"]), ("Stars", &["Jane Doe", "Sam Star"])],
        );
        let page = extract(&Html::parse_document(&html)).unwrap();
        let events: Vec<(&str, &str)> = page
            .roles
            .iter()
            .map(|r| (r.name.as_str(), r.label.as_str()))
            .collect();
        assert_eq!(
            events,
            vec![
                ("Jane Doe", "Director"),
                ("Jane Doe", "Stars"),
                ("Sam Star", "Stars"),
            ]
        );
    }

    #[test]
    fn unknown_groups_are_kept() {
        let html = title_page(&[], "Plot.", &[("Creators", &["Cara Creator"])]);
        let page = extract(&Html::parse_document(&html)).unwrap();
        assert_eq!(page.metadata["Creators"], vec!["Cara Creator"]);
    }

    #[test]
    fn repeated_label_keeps_last_group() {
        let html = title_page(&[], "Plot.", &[("Director", &["First"]), ("Director", &["Second"])]);
        let page = extract(&Html::parse_document(&html)).unwrap();
        assert_eq!(page.metadata["Director"], vec!["Second"]);
        assert_eq!(page.roles.len(), 2);
    }

    #[test]
    fn missing_plot_is_an_error() {
        let html = title_page(&[], "Plot.", &[]).replace("plot-xl", "plot-gone");
        assert!(matches!(
            extract(&Html::parse_document(&html)),
            Err(ExtractError::MissingElement("span[data-testid=plot-xl]"))
        ));
    }

    #[test]
    fn missing_credit_list_is_an_error() {
        let html = title_page(&["Drama"], "Plot.", &[]).replace("title-pc-list", "other-list");
        assert!(matches!(
            extract(&Html::parse_document(&html)),
            Err(ExtractError::MissingElement("ul.title-pc-list"))
        ));
    }
}
