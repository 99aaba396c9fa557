//! Polls media player windows and feeds their titles into the pipeline.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::models::EpisodeDetection;
use crate::parser::{parse, strip_player_suffix};
use crate::services::orchestrator::PipelineHandle;

/// A visible window owned by a media player process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerWindow {
    pub process: String,
    pub title: String,
}

#[async_trait]
pub trait WindowSource: Send + Sync {
    async fn player_windows(&self) -> Result<Vec<PlayerWindow>>;
}

/// Lists windows with `tasklist /v /fo csv` (Windows only).
pub struct TasklistSource {
    players: HashSet<String>,
}

impl TasklistSource {
    #[must_use]
    pub fn new(players: &[String]) -> Self {
        Self {
            players: players.iter().map(|p| normalize_process(p)).collect(),
        }
    }
}

#[async_trait]
impl WindowSource for TasklistSource {
    async fn player_windows(&self) -> Result<Vec<PlayerWindow>> {
        let output = tokio::time::timeout(
            Duration::from_secs(5),
            tokio::process::Command::new("tasklist")
                .args(["/v", "/fo", "csv"])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .context("tasklist timed out")?
        .context("Failed to run tasklist")?;

        if !output.status.success() {
            bail!("tasklist exited with {}", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tasklist_csv(&stdout, &self.players))
    }
}

fn normalize_process(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower.strip_suffix(".exe").unwrap_or(&lower).to_string()
}

/// Extracts player windows from `tasklist /v /fo csv` output.
///
/// The window title is the ninth column; rows without a title (`N/A`) and
/// processes not in `players` are skipped, as is the header row.
#[must_use]
pub fn parse_tasklist_csv(csv: &str, players: &HashSet<String>) -> Vec<PlayerWindow> {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    let field = FIELD.get_or_init(|| Regex::new(r#""((?:[^"]|"")*)""#).expect("Invalid Regex"));

    csv.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<String> = field
                .captures_iter(line)
                .filter_map(|c| c.get(1).map(|m| m.as_str().replace("\"\"", "\"")))
                .collect();
            if fields.len() < 9 {
                return None;
            }

            let process = normalize_process(&fields[0]);
            let title = fields[8].trim();
            if title.is_empty() || title == "N/A" || !players.contains(&process) {
                return None;
            }

            Some(PlayerWindow {
                process,
                title: title.to_string(),
            })
        })
        .collect()
}

pub struct PlayerWatcher<S> {
    source: S,
    pipeline: PipelineHandle,
    poll_interval: Duration,
    last: Option<(String, u32)>,
}

impl<S: WindowSource> PlayerWatcher<S> {
    #[must_use]
    pub fn new(source: S, pipeline: PipelineHandle, config: &WatcherConfig) -> Self {
        Self {
            source,
            pipeline,
            poll_interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
            last: None,
        }
    }

    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Player watcher started"
        );

        loop {
            interval.tick().await;
            match self.poll_once().await {
                Ok(Some(detection)) => {
                    if self.pipeline.submit(detection).await.is_err() {
                        warn!("Detection pipeline closed, stopping player watcher");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Window listing failed"),
            }
        }
    }

    /// One poll: the first window with a parsable title and episode that
    /// differs from the last forwarded one.
    pub async fn poll_once(&mut self) -> Result<Option<EpisodeDetection>> {
        let windows = self.source.player_windows().await?;

        for window in windows {
            let cleaned = strip_player_suffix(&window.title);
            let parsed = parse(cleaned);
            let (Some(title), Some(episode)) = (parsed.title, parsed.episode) else {
                debug!(window = %window.title, "Skipping window without title or episode");
                continue;
            };

            let key = (title.to_lowercase(), episode);
            if self.last.as_ref() == Some(&key) {
                debug!(title = %title, episode, "Skipping repeated detection");
                continue;
            }
            self.last = Some(key);

            info!(
                event = "player_detected",
                process = %window.process,
                title = %title,
                episode,
                "Detected episode in media player"
            );
            return Ok(Some(EpisodeDetection::local(cleaned)));
        }

        Ok(None)
    }
}
