use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sites we know how to parse. Several Spanish aggregators run the
/// WordPress Madara theme and share a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    MangaOni,
    MangasNoSekai,
    M440,
    Zonatmo,
    Bokugents,
    AnimeBbg,
}

impl Site {
    /// Parse a site name or alias from a library record.
    pub fn parse(s: &str) -> Option<Site> {
        match s.to_lowercase().trim() {
            "manga-oni" | "mangaoni" => Some(Site::MangaOni),
            "mangasnosekai" | "mangas-no-sekai" => Some(Site::MangasNoSekai),
            "m440" | "m440.in" => Some(Site::M440),
            "zonatmo" | "tmo" => Some(Site::Zonatmo),
            "bokugents" => Some(Site::Bokugents),
            "animebbg" => Some(Site::AnimeBbg),
            _ => None,
        }
    }

    /// Guess the site from a URL's host when the record's `site` field
    /// is missing or unrecognized.
    pub fn from_url(url: &str) -> Option<Site> {
        let u = url.to_lowercase();
        if u.contains("manga-oni.com") {
            Some(Site::MangaOni)
        } else if u.contains("mangasnosekai.com") {
            Some(Site::MangasNoSekai)
        } else if u.contains("m440.in") {
            Some(Site::M440)
        } else if u.contains("zonatmo.com") {
            Some(Site::Zonatmo)
        } else if u.contains("bokugents.com") {
            Some(Site::Bokugents)
        } else if u.contains("animebbg.net") {
            Some(Site::AnimeBbg)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Site::MangaOni => "manga-oni",
            Site::MangasNoSekai => "mangasnosekai",
            Site::M440 => "m440",
            Site::Zonatmo => "zonatmo",
            Site::Bokugents => "bokugents",
            Site::AnimeBbg => "animebbg",
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One tracked series, as stored in the library file.
///
/// `site` stays a raw string so an unknown value still deserializes and
/// gets reported as `UnsupportedSite` at run time instead of poisoning
/// the whole library load. `last_chapter: None` means the series has
/// never been baselined; never a sentinel zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub site: String,
    pub url: String,
    #[serde(default)]
    pub last_chapter: Option<f64>,
}

impl Series {
    pub fn key(&self) -> SeriesKey {
        SeriesKey {
            name: self.name.clone(),
            site: self.site.clone(),
            url: self.url.clone(),
        }
    }
}

/// Composite identity for baseline bookkeeping. Using all three fields
/// keeps same-name series on different sites distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub name: String,
    pub site: String,
    pub url: String,
}

/// Per-series detection failure. None of these abort a run.
#[derive(Debug, Clone, Error)]
pub enum DetectError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("page structure not recognized: {0}")]
    Parse(String),
    #[error("no chapter number found on page")]
    NotFound,
    #[error("unsupported site: {0:?}")]
    UnsupportedSite(String),
}

/// A detected chapter advance worth notifying.
///
/// `previous` is always `Some` on an emitted event: the first successful
/// detection for a series only establishes the baseline, silently.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub name: String,
    pub site: String,
    pub url: String,
    #[serde(rename = "previous_chapter")]
    pub previous: Option<f64>,
    pub new_chapter: f64,
}

/// Render a chapter number without a trailing `.0` for whole chapters.
pub fn fmt_chapter(n: f64) -> String {
    if (n - n.round()).abs() < 1e-9 {
        format!("{}", n.round() as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_aliases() {
        assert_eq!(Site::parse("zonatmo"), Some(Site::Zonatmo));
        assert_eq!(Site::parse("TMO"), Some(Site::Zonatmo));
        assert_eq!(Site::parse("m440.in"), Some(Site::M440));
        assert_eq!(Site::parse("mangas-no-sekai"), Some(Site::MangasNoSekai));
        assert_eq!(Site::parse("webtoons"), None);
    }

    #[test]
    fn test_site_from_url() {
        assert_eq!(
            Site::from_url("https://zonatmo.com/library/manga/123/foo"),
            Some(Site::Zonatmo)
        );
        assert_eq!(
            Site::from_url("https://m440.in/manga/some-series"),
            Some(Site::M440)
        );
        assert_eq!(Site::from_url("https://example.com/x"), None);
    }

    #[test]
    fn test_fmt_chapter() {
        assert_eq!(fmt_chapter(12.0), "12");
        assert_eq!(fmt_chapter(12.5), "12.5");
        assert_eq!(fmt_chapter(7.2), "7.2");
    }
}
