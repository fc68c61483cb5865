//! Parser for animebbg.net (XenForo). Release cards render as
//! `structItem--resourceAlbum` blocks whose title carries "Capítulo X".

use crate::chapter;
use scraper::{Html, Selector};

pub fn latest_chapter(html: &str) -> Option<f64> {
    let doc = Html::parse_document(html);

    let titles = Selector::parse(".structItem--resourceAlbum .structItem-title").unwrap();
    let labels: Vec<String> = doc
        .select(&titles)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect();

    if let Some(max) = chapter::extract_max(&labels) {
        return Some(max);
    }

    // Fallback: scan every link on the page.
    let anchors = Selector::parse("a").unwrap();
    let fallback: Vec<String> = doc
        .select(&anchors)
        .map(|a| a.text().collect::<Vec<_>>().join(" "))
        .collect();

    chapter::extract_max(fallback)
}
