//! Shared parser for WordPress Madara-theme sites (mangasnosekai.com,
//! m440.in, bokugents.com). Chapter lists render as
//! `<li class="wp-manga-chapter"><a>Capítulo X</a></li>`.

use crate::chapter;
use scraper::{Html, Selector};

pub fn latest_chapter(html: &str) -> Option<f64> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("li.wp-manga-chapter a").unwrap();

    let labels: Vec<String> = doc
        .select(&selector)
        .map(|a| a.text().collect::<Vec<_>>().join(" "))
        .collect();

    chapter::extract_max(labels)
}
