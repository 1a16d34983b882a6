pub mod detail;
pub mod listing;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Page markup did not have the shape the extractors rely on.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("missing element: {0}")]
    MissingElement(&'static str),
    #[error("element {element} has no {attr} attribute")]
    MissingAttribute {
        element: &'static str,
        attr: &'static str,
    },
    #[error("cannot resolve link {href:?}: {source}")]
    BadLink {
        href: String,
        source: url::ParseError,
    },
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// First match of `selector` under `scope`, or a `MissingElement` naming `what`.
fn first<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    what: &'static str,
) -> ExtractResult<ElementRef<'a>> {
    scope
        .select(selector)
        .next()
        .ok_or(ExtractError::MissingElement(what))
}

/// Element text with whitespace runs collapsed.
fn clean_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    WS_RE.replace_all(raw.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn clean_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<p>\n  Some   <b>bold</b>\n text  </p>");
        let p = doc.select(&Selector::parse("p").unwrap()).next().unwrap();
        assert_eq!(clean_text(p), "Some bold text");
    }

    #[test]
    fn first_reports_what_is_missing() {
        let doc = Html::parse_fragment("<div></div>");
        let sel = Selector::parse("span").unwrap();
        let err = first(doc.root_element(), &sel, "span.thing").unwrap_err();
        assert_eq!(err.to_string(), "missing element: span.thing");
    }
}
