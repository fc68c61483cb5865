//! Parser for zonatmo.com. Chapters list under `#chapters` as
//! collapsible list-group items headed by "Capítulo X".

use crate::chapter;
use scraper::{Html, Selector};

pub fn latest_chapter(html: &str) -> Option<f64> {
    let doc = Html::parse_document(html);

    let primary = Selector::parse("#chapters li.list-group-item h4 a.btn-collapse").unwrap();
    let labels: Vec<String> = doc
        .select(&primary)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect();

    if let Some(max) = chapter::extract_max(&labels) {
        return Some(max);
    }

    // Markup changes now and then; fall back to any link that mentions
    // a chapter.
    let anchors = Selector::parse("a").unwrap();
    let fallback: Vec<String> = doc
        .select(&anchors)
        .map(|a| a.text().collect::<Vec<_>>().join(" "))
        .filter(|t| t.to_lowercase().contains("cap"))
        .collect();

    chapter::extract_max(fallback)
}
