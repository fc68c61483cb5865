//! Change classification: detection result vs. stored baseline.

use crate::models::{ChangeEvent, DetectError, Series};

/// What one series' check amounts to.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// First successful detection: record the baseline, say nothing.
    SilentBaseline(f64),
    /// Detected chapter does not exceed the baseline.
    NoChange,
    /// Strict advance past the baseline; notify.
    Advanced(ChangeEvent),
    /// Fetch/parse/dispatch failure; baseline untouched.
    Error(DetectError),
}

/// Classify a detection against the series' baseline.
///
/// Pure and idempotent. A null baseline never produces an event, no
/// matter how large the detected chapter: a newly added series must
/// not flood the channel with its back catalog. Equal or lower values
/// are `NoChange`, which guards against re-numbering and mirrored
/// listings that show a lower maximum.
pub fn classify(
    series: &Series,
    detection: Result<f64, DetectError>,
    baseline: Option<f64>,
) -> Outcome {
    let n = match detection {
        Ok(n) => n,
        Err(e) => return Outcome::Error(e),
    };
    match baseline {
        None => Outcome::SilentBaseline(n),
        Some(b) if n > b => Outcome::Advanced(ChangeEvent {
            name: series.name.clone(),
            site: series.site.clone(),
            url: series.url.clone(),
            previous: Some(b),
            new_chapter: n,
        }),
        Some(_) => Outcome::NoChange,
    }
}
