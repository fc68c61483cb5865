//! Discord webhook notification.
//!
//! All advances from one run go out as a single batched message,
//! chunked under Discord's 2000-character content limit. Delivery
//! failures are the caller's to log; they must never block baseline
//! persistence.

use crate::models::{fmt_chapter, ChangeEvent};
use crate::runner::RunError;
use serde_json::json;
use thiserror::Error;
use tokio::time::{sleep, Duration};

/// Stay under the 2000 limit with margin for formatting.
const CHUNK_SIZE: usize = 1900;
/// Pause between chunks to dodge the webhook rate limit.
const CHUNK_PAUSE: Duration = Duration::from_millis(1200);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Discord returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub struct Notifier {
    webhook_url: Option<String>,
    username: String,
    avatar_url: Option<String>,
    client: reqwest::Client,
}

impl Notifier {
    /// Webhook URL comes from `DISCORD_WEBHOOK_URL`; with no URL set
    /// the notifier is a no-op (useful for local dry checks).
    pub fn from_env(username: &str, avatar_url: Option<&str>) -> Self {
        let webhook_url = std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if webhook_url.is_none() {
            log::warn!("DISCORD_WEBHOOK_URL not set, notifications disabled");
        }
        Self {
            webhook_url,
            username: username.to_string(),
            avatar_url: avatar_url.map(|s| s.to_string()),
            client: reqwest::Client::new(),
        }
    }

    /// Send one batched message covering every advance in the run,
    /// optionally followed by a warning block for per-series errors.
    pub async fn send_batch(
        &self,
        events: &[ChangeEvent],
        errors: &[RunError],
    ) -> Result<(), NotifyError> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let lines = build_lines(events, errors);
        if lines.is_empty() {
            return Ok(());
        }

        let text = lines.join("\n");
        let blocks = chunk_message(&text, CHUNK_SIZE);
        let total = blocks.len();

        for (i, block) in blocks.iter().enumerate() {
            let mut payload = json!({
                "content": block,
                "username": self.username,
            });
            if let Some(avatar) = &self.avatar_url {
                payload["avatar_url"] = json!(avatar);
            }

            let resp = self
                .client
                .post(url)
                .json(&payload)
                .timeout(Duration::from_secs(20))
                .send()
                .await?;

            let status = resp.status();
            if status.as_u16() >= 400 {
                let body = resp.text().await.unwrap_or_default();
                let body = body.chars().take(300).collect();
                return Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            if i + 1 < total {
                sleep(CHUNK_PAUSE).await;
            }
        }
        Ok(())
    }
}

/// One line per advance, plus a trailing warning block when series
/// failed. Matches the channel's established message format.
pub fn build_lines(events: &[ChangeEvent], errors: &[RunError]) -> Vec<String> {
    let mut lines = Vec::new();
    for ev in events {
        let old = ev
            .previous
            .map(fmt_chapter)
            .unwrap_or_else(|| "0".to_string());
        lines.push(format!(
            "**[NUEVO]** {} — {} -> **{}**\n{}",
            ev.name,
            old,
            fmt_chapter(ev.new_chapter),
            ev.url
        ));
    }
    if !errors.is_empty() {
        lines.push(format!("⚠ {} series con error:", errors.len()));
        for err in errors {
            lines.push(format!("- {}: {}", err.name, err.error));
        }
    }
    lines
}

/// Split a message into chunks no longer than `limit` characters,
/// preferring line boundaries.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        // A single oversized line gets hard-split.
        if line.chars().count() > limit {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                blocks.push(piece.iter().collect());
            }
            continue;
        }
        if !current.is_empty() && current.chars().count() + 1 + line.chars().count() > limit {
            blocks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectError;

    fn event(name: &str, prev: Option<f64>, new: f64) -> ChangeEvent {
        ChangeEvent {
            name: name.into(),
            site: "zonatmo".into(),
            url: format!("https://zonatmo.com/library/{}", name),
            previous: prev,
            new_chapter: new,
        }
    }

    #[test]
    fn test_line_format() {
        let lines = build_lines(&[event("Serie X", Some(10.0), 11.0)], &[]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("**[NUEVO]** Serie X — 10 -> **11**"));
        assert!(lines[0].contains("https://zonatmo.com/library/Serie X"));
    }

    #[test]
    fn test_fractional_chapters_in_lines() {
        let lines = build_lines(&[event("Y", Some(12.0), 12.5)], &[]);
        assert!(lines[0].contains("12 -> **12.5**"));
    }

    #[test]
    fn test_error_block_appended() {
        let errors = vec![RunError {
            name: "Z".into(),
            url: "https://m440.in/manga/z".into(),
            error: DetectError::NotFound,
        }];
        let lines = build_lines(&[], &errors);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("1 series con error"));
        assert!(lines[1].starts_with("- Z:"));
    }

    #[test]
    fn test_chunking_respects_limit() {
        let text = (0..200)
            .map(|i| format!("**[NUEVO]** Serie {} — 10 -> **11**", i))
            .collect::<Vec<_>>()
            .join("\n");
        let blocks = chunk_message(&text, CHUNK_SIZE);
        assert!(blocks.len() > 1);
        for b in &blocks {
            assert!(b.chars().count() <= CHUNK_SIZE);
        }
        // Nothing lost.
        let rejoined = blocks.join("\n");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_chunking_short_message_single_block() {
        let blocks = chunk_message("hola", CHUNK_SIZE);
        assert_eq!(blocks, vec!["hola".to_string()]);
    }

    #[test]
    fn test_oversized_single_line_hard_split() {
        let long = "x".repeat(4500);
        let blocks = chunk_message(&long, 2000);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks.join(""), long);
    }
}
