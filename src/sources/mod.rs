//! Per-site chapter detection.
//!
//! Each site module exposes a synchronous `latest_chapter(html)` parse
//! function; fetching and dispatch live here. Parsing stays out of
//! async code so no parsed document is ever held across an await.

pub mod animebbg;
pub mod madara;
pub mod manga_oni;
pub mod zonatmo;

use crate::http_client::FetchClient;
use crate::models::{DetectError, Series, Site};

/// Anti-bot interstitials parse as valid HTML but carry no chapter
/// data; without this check they would report as `NotFound` and hide
/// the real problem.
pub fn is_challenge_page(html: &str) -> bool {
    let h = html.to_lowercase();
    h.contains("cf-browser-verification")
        || h.contains("just a moment...")
        || h.contains("checking your browser before accessing")
        || h.contains("cf-challenge")
}

/// Fetch a series page and return the highest chapter number on it.
pub async fn detect(client: &FetchClient, site: Site, url: &str) -> Result<f64, DetectError> {
    let html = client
        .fetch_html(url)
        .await
        .map_err(|e| DetectError::Fetch(e.to_string()))?;

    if is_challenge_page(&html) {
        return Err(DetectError::Parse("anti-bot challenge page".into()));
    }

    let latest = match site {
        Site::MangasNoSekai | Site::M440 | Site::Bokugents => madara::latest_chapter(&html),
        Site::MangaOni => manga_oni::latest_chapter(&html),
        Site::Zonatmo => zonatmo::latest_chapter(&html),
        Site::AnimeBbg => animebbg::latest_chapter(&html),
    };

    latest.ok_or(DetectError::NotFound)
}

/// Something that can report the latest chapter for a series. The live
/// implementation hits the network; tests substitute canned results.
pub trait ChapterSource {
    fn latest(
        &self,
        series: &Series,
    ) -> impl std::future::Future<Output = Result<f64, DetectError>> + Send;
}

/// Production source: resolves the site from the record (falling back
/// to the URL host) and dispatches to the matching parser.
pub struct LiveSources {
    client: FetchClient,
}

impl LiveSources {
    pub fn new(client: FetchClient) -> Self {
        Self { client }
    }
}

impl ChapterSource for LiveSources {
    async fn latest(&self, series: &Series) -> Result<f64, DetectError> {
        let site = Site::parse(&series.site)
            .or_else(|| Site::from_url(&series.url))
            .ok_or_else(|| DetectError::UnsupportedSite(series.site.clone()))?;
        detect(&self.client, site, &series.url).await
    }
}
