//! Chapter number extraction from messy chapter labels.
//!
//! Sites label chapters in many ways ("Capítulo 12", "Chapter 12.5",
//! "Ch 7-20", "#12"). Everything here is pure string work, no I/O.

use regex::Regex;

/// Labeled patterns tried first: "Capítulo X", "Chapter X", "Ch X".
/// The number part accepts `.`, `,` or `-` as a decimal separator
/// ("7-20" is how some sites write 7.20).
const LABELED_PATTERNS: &[&str] = &[
    r"cap[ií]tulo\s*([0-9]+(?:[.,-][0-9]+)?)",
    r"chapter\s*([0-9]+(?:[.,-][0-9]+)?)",
    r"\bch\s*([0-9]+(?:[.,-][0-9]+)?)\b",
];

/// Extract a chapter number from a single label.
///
/// Prefers an explicitly labeled number; falls back to the first bare
/// number in the text. Returns `None` when nothing parses.
pub fn normalize_chapter(text: &str) -> Option<f64> {
    let t = text.to_lowercase();
    let t = t.trim();
    if t.is_empty() {
        return None;
    }

    for pat in LABELED_PATTERNS {
        let re = Regex::new(pat).unwrap();
        if let Some(caps) = re.captures(t) {
            let raw = caps.get(1).unwrap().as_str();
            let normalized = raw.replace([',', '-'], ".");
            if let Ok(v) = normalized.parse::<f64>() {
                return Some(v);
            }
        }
    }

    // No label matched, take the first reasonable number.
    let fallback = Regex::new(r"([0-9]+(?:[.,][0-9]+)?)").unwrap();
    let caps = fallback.captures(t)?;
    let raw = caps.get(1)?.as_str().replace(',', ".");
    raw.parse::<f64>().ok()
}

/// Extract the maximum chapter number among candidate labels.
///
/// Listing order on the sites flips between ascending and descending,
/// and mirrored entries sometimes repeat lower chapters, so the max is
/// the only safe pick. `None` when no label parses.
pub fn extract_max<I, S>(labels: I) -> Option<f64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .filter_map(|l| normalize_chapter(l.as_ref()))
        .fold(None, |acc: Option<f64>, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}

/// Whether a stored chapter value looks like an actual chapter.
///
/// Scrapes occasionally pick up years or database IDs instead of
/// chapter numbers; those poison the baseline and suppress future
/// notifications.
pub fn plausible(v: f64) -> bool {
    if v.is_nan() || v.is_infinite() {
        return false;
    }
    if (1900.0..=2100.0).contains(&v) {
        return false;
    }
    if v > 3000.0 {
        return false;
    }
    v > 0.0
}

/// Round an over-precise chapter value to one decimal place; whole
/// numbers stay whole.
pub fn round_chapter(v: f64) -> f64 {
    if (v - v.round()).abs() < 1e-9 {
        v.round()
    } else {
        (v * 10.0).round() / 10.0
    }
}
