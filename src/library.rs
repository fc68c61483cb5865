//! The series library: one YAML file holding the tracked series and
//! their last-seen chapters. This is the baseline store; it is read
//! once at the start of a run and written once at the end, and only
//! when the run commits.
//!
//! Runs must be serialized externally (the scheduler does this). Saves
//! are still atomic (write to a temp file, then rename) so a crash or
//! an overlapping reader never sees a half-written file.

use crate::chapter;
use crate::models::{Series, SeriesKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("cannot read library {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write library {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed library {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub series: Vec<Series>,
}

/// One baseline correction made by [`Library::sanitize`].
#[derive(Debug)]
pub struct SanitizedEntry {
    pub name: String,
    pub old: f64,
    /// `None` means the value was implausible and got cleared.
    pub new: Option<f64>,
}

impl Library {
    /// Load the library. A missing file is an empty library (first
    /// deployment); a present but unreadable or malformed file is
    /// fatal, since proceeding would risk clobbering real state.
    pub fn load(path: &Path) -> Result<Library, LibraryError> {
        if !path.exists() {
            log::warn!("Library {} does not exist, starting empty", path.display());
            return Ok(Library::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| LibraryError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_yaml::from_str(&content).map_err(|e| LibraryError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save atomically: serialize to `<path>.tmp`, back up the old file
    /// to `<path>.bak`, then rename the temp file into place.
    pub fn save(&self, path: &Path) -> Result<(), LibraryError> {
        let yaml = serde_yaml::to_string(self).map_err(|e| LibraryError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let write_err = |e: std::io::Error| LibraryError::Write {
            path: path.to_path_buf(),
            source: e,
        };

        let tmp = append_suffix(path, ".tmp");
        std::fs::write(&tmp, &yaml).map_err(write_err)?;
        if path.exists() {
            std::fs::copy(path, append_suffix(path, ".bak")).map_err(write_err)?;
        }
        std::fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }

    /// Baseline map keyed by series identity.
    pub fn baselines(&self) -> BTreeMap<SeriesKey, Option<f64>> {
        self.series
            .iter()
            .map(|s| (s.key(), s.last_chapter))
            .collect()
    }

    /// Write updated baselines back onto the series records. Keys not
    /// present in the library are ignored (the series was edited away
    /// mid-run).
    pub fn apply_baselines(&mut self, updated: &BTreeMap<SeriesKey, f64>) {
        for s in &mut self.series {
            if let Some(&n) = updated.get(&s.key()) {
                s.last_chapter = Some(n);
            }
        }
    }

    /// Clear implausible baselines (years, huge IDs, non-positive
    /// values) and round over-precise ones to a single decimal.
    /// Returns what changed so the caller can report it.
    pub fn sanitize(&mut self) -> Vec<SanitizedEntry> {
        let mut touched = Vec::new();
        for s in &mut self.series {
            let Some(v) = s.last_chapter else { continue };
            if !chapter::plausible(v) {
                s.last_chapter = None;
                touched.push(SanitizedEntry {
                    name: s.name.clone(),
                    old: v,
                    new: None,
                });
            } else {
                let rounded = chapter::round_chapter(v);
                if rounded != v {
                    s.last_chapter = Some(rounded);
                    touched.push(SanitizedEntry {
                        name: s.name.clone(),
                        old: v,
                        new: Some(rounded),
                    });
                }
            }
        }
        touched
    }
}

/// `manga_library.yml` + `.bak` -> `manga_library.yml.bak`; keeps the
/// original extension visible.
fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(name: &str, last: Option<f64>) -> Series {
        Series {
            name: name.into(),
            site: "zonatmo".into(),
            url: format!("https://zonatmo.com/library/{}", name),
            last_chapter: last,
        }
    }

    #[test]
    fn test_baselines_keyed_by_identity() {
        let lib = Library {
            series: vec![series("a", Some(10.0)), series("b", None)],
        };
        let map = lib.baselines();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&lib.series[0].key()], Some(10.0));
        assert_eq!(map[&lib.series[1].key()], None);
    }

    #[test]
    fn test_apply_baselines_ignores_unknown_keys() {
        let mut lib = Library {
            series: vec![series("a", Some(10.0))],
        };
        let mut updated = BTreeMap::new();
        updated.insert(lib.series[0].key(), 11.0);
        updated.insert(series("ghost", None).key(), 99.0);
        lib.apply_baselines(&updated);
        assert_eq!(lib.series[0].last_chapter, Some(11.0));
        assert_eq!(lib.series.len(), 1);
    }

    #[test]
    fn test_sanitize_clears_years_and_rounds() {
        let mut lib = Library {
            series: vec![
                series("year", Some(2024.0)),
                series("huge", Some(123456.0)),
                series("long", Some(7.3333333)),
                series("fine", Some(12.5)),
                series("unset", None),
            ],
        };
        let touched = lib.sanitize();
        assert_eq!(touched.len(), 3);
        assert_eq!(lib.series[0].last_chapter, None);
        assert_eq!(lib.series[1].last_chapter, None);
        assert_eq!(lib.series[2].last_chapter, Some(7.3));
        assert_eq!(lib.series[3].last_chapter, Some(12.5));
        assert_eq!(lib.series[4].last_chapter, None);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::load(&dir.path().join("absent.yml")).unwrap();
        assert!(lib.series.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "series: {not: [a, list").unwrap();
        assert!(matches!(
            Library::load(&path),
            Err(LibraryError::Malformed { .. })
        ));
    }

    #[test]
    fn test_save_roundtrip_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manga_library.yml");

        let lib = Library {
            series: vec![series("a", Some(12.5)), series("b", None)],
        };
        lib.save(&path).unwrap();

        let loaded = Library::load(&path).unwrap();
        assert_eq!(loaded.series.len(), 2);
        assert_eq!(loaded.series[0].last_chapter, Some(12.5));
        assert_eq!(loaded.series[1].last_chapter, None);

        // Second save backs up the first.
        lib.save(&path).unwrap();
        let bak = append_suffix(&path, ".bak");
        assert!(bak.exists());
        assert!(Library::load(&bak).is_ok());
        // No temp file left behind.
        assert!(!append_suffix(&path, ".tmp").exists());
    }

    #[test]
    fn test_original_format_parses() {
        // The shape the deployment already has on disk.
        let yaml = r#"
series:
  - name: Serie X
    site: zonatmo
    url: https://zonatmo.com/library/manga/1/serie-x
    last_chapter: 97
  - name: Serie Y
    site: m440
    url: https://m440.in/manga/serie-y
    last_chapter: null
  - name: Serie Z
    site: mangasnosekai
    url: https://mangasnosekai.com/manga/serie-z
"#;
        let lib: Library = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(lib.series.len(), 3);
        assert_eq!(lib.series[0].last_chapter, Some(97.0));
        assert_eq!(lib.series[1].last_chapter, None);
        assert_eq!(lib.series[2].last_chapter, None);
    }

    #[test]
    fn test_same_name_different_site_distinct() {
        let mut a = series("dup", Some(1.0));
        let mut b = series("dup", Some(1.0));
        a.site = "zonatmo".into();
        b.site = "m440".into();
        b.url = "https://m440.in/manga/dup".into();
        assert_ne!(a.key(), b.key());
    }
}
