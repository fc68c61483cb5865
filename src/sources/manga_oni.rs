//! Parser for manga-oni.com. Chapter lists render as
//! `#c_list a` entries; the anchor text carries "Capítulo X".

use crate::chapter;
use scraper::{Html, Selector};

pub fn latest_chapter(html: &str) -> Option<f64> {
    let doc = Html::parse_document(html);

    let primary = Selector::parse("#c_list a, ul.episodes-list li a").unwrap();
    let labels: Vec<String> = doc
        .select(&primary)
        .map(|a| a.text().collect::<Vec<_>>().join(" "))
        .collect();

    if let Some(max) = chapter::extract_max(&labels) {
        return Some(max);
    }

    // Fallback: any link that mentions a chapter.
    let anchors = Selector::parse("a").unwrap();
    let fallback: Vec<String> = doc
        .select(&anchors)
        .map(|a| a.text().collect::<Vec<_>>().join(" "))
        .filter(|t| t.to_lowercase().contains("cap"))
        .collect();

    chapter::extract_max(fallback)
}
