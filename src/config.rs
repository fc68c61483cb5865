use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path of the YAML series library.
    #[serde(default = "default_library_file")]
    pub library_file: String,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub pacing: PacingSettings,

    #[serde(default)]
    pub notify: NotifySettings,

    /// Self-heal policy: when true, a committing run also clears
    /// implausible baselines (years, scraped IDs) before saving, the
    /// same cleanup `--fix` does manually. Off by default; a corrupted
    /// baseline then needs a manual `--fix`.
    #[serde(default)]
    pub self_heal_baselines: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchSettings {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PacingSettings {
    /// Random pause between consecutive site requests.
    #[serde(default = "default_pace_min")]
    pub min_delay_ms: u64,
    #[serde(default = "default_pace_max")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifySettings {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
}

fn default_library_file() -> String {
    "manga_library.yml".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> usize {
    3
}
fn default_initial_retry_delay() -> u64 {
    1500
}
fn default_max_retry_delay() -> u64 {
    8000
}
fn default_pace_min() -> u64 {
    4000
}
fn default_pace_max() -> u64 {
    9000
}
fn default_username() -> String {
    "notify-mangas".to_string()
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            initial_retry_delay_ms: default_initial_retry_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
        }
    }
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: default_pace_min(),
            max_delay_ms: default_pace_max(),
        }
    }
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            username: default_username(),
            avatar_url: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_file: default_library_file(),
            fetch: FetchSettings::default(),
            pacing: PacingSettings::default(),
            notify: NotifySettings::default(),
            self_heal_baselines: false,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory; any missing or
    /// malformed file falls back to defaults.
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match toml::from_str::<Config>(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Malformed config.toml, using defaults: {}", e),
                }
            }
        }
        Self::default()
    }

    pub fn fetch_config(&self) -> crate::http_client::FetchConfig {
        crate::http_client::FetchConfig {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_retries: self.fetch.max_retries,
            initial_retry_delay_ms: self.fetch.initial_retry_delay_ms,
            max_retry_delay_ms: self.fetch.max_retry_delay_ms,
        }
    }

    pub fn pace_ms(&self) -> Option<(u64, u64)> {
        if self.pacing.max_delay_ms == 0 {
            return None;
        }
        let lo = self.pacing.min_delay_ms.min(self.pacing.max_delay_ms);
        Some((lo, self.pacing.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.library_file, "manga_library.yml");
        assert_eq!(cfg.fetch.timeout_secs, 30);
        assert_eq!(cfg.pace_ms(), Some((4000, 9000)));
        assert!(!cfg.self_heal_baselines);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            library_file = "alt.yml"

            [pacing]
            max_delay_ms = 100
            min_delay_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(cfg.library_file, "alt.yml");
        assert_eq!(cfg.pace_ms(), Some((50, 100)));
        assert_eq!(cfg.fetch.max_retries, 3);
        assert_eq!(cfg.notify.username, "notify-mangas");
    }

    #[test]
    fn test_zero_max_delay_disables_pacing() {
        let cfg: Config = toml::from_str(
            r#"
            [pacing]
            max_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.pace_ms(), None);
    }
}
