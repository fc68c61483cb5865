//! Run orchestration: iterate the series list, detect, classify,
//! aggregate.
//!
//! Series are processed sequentially with a randomized pause between
//! requests to stay under WAF radar. All baseline mutation is deferred
//! to the `updated_baselines` map, applied by the caller after the run;
//! adapters never touch shared state.

use crate::detector::{self, Outcome};
use crate::models::{ChangeEvent, DetectError, Series, SeriesKey};
use crate::sources::ChapterSource;
use rand::Rng;
use std::collections::BTreeMap;
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Commit new baselines. When false the run is a dry check:
    /// detect and notify, persist nothing.
    pub save: bool,
    /// Pause between consecutive requests, in milliseconds (min, max).
    /// `None` disables pacing (tests).
    pub pace_ms: Option<(u64, u64)>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            save: false,
            pace_ms: Some((4000, 9000)),
        }
    }
}

/// One series' failure, kept for the run summary.
#[derive(Debug)]
pub struct RunError {
    pub name: String,
    pub url: String,
    pub error: DetectError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Advances to notify, batched into a single message downstream.
    pub events: Vec<ChangeEvent>,
    pub errors: Vec<RunError>,
    /// New baselines to persist. Empty unless the run was started
    /// with `save`.
    pub updated_baselines: BTreeMap<SeriesKey, f64>,
}

/// Check every series once. A failing series is recorded and skipped;
/// it never aborts the rest of the run.
pub async fn run<S: ChapterSource>(
    sources: &S,
    series_list: &[Series],
    opts: &RunOptions,
) -> RunReport {
    let mut report = RunReport::default();

    for (idx, series) in series_list.iter().enumerate() {
        if idx > 0 {
            if let Some((lo, hi)) = opts.pace_ms {
                let pause = rand::thread_rng().gen_range(lo..=hi);
                sleep(Duration::from_millis(pause)).await;
            }
        }

        if series.url.trim().is_empty() {
            log::warn!("Series {:?} has no URL, skipping", series.name);
            report.errors.push(RunError {
                name: series.name.clone(),
                url: String::new(),
                error: DetectError::Fetch("series has no URL".into()),
            });
            continue;
        }

        let detection = sources.latest(series).await;
        match detector::classify(series, detection, series.last_chapter) {
            Outcome::SilentBaseline(n) => {
                log::info!(
                    "{}: first observation, baseline {} (silent)",
                    series.name,
                    n
                );
                if opts.save {
                    report.updated_baselines.insert(series.key(), n);
                }
            }
            Outcome::Advanced(ev) => {
                log::info!(
                    "{}: {:?} -> {} (new chapter)",
                    series.name,
                    ev.previous,
                    ev.new_chapter
                );
                if opts.save {
                    report.updated_baselines.insert(series.key(), ev.new_chapter);
                }
                report.events.push(ev);
            }
            Outcome::NoChange => {
                log::debug!("{}: no change", series.name);
            }
            Outcome::Error(e) => {
                log::warn!("{}: {}", series.name, e);
                report.errors.push(RunError {
                    name: series.name.clone(),
                    url: series.url.clone(),
                    error: e,
                });
            }
        }
    }

    report
}
