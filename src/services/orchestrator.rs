//! Detection pipeline: parse, match, resolve, reconcile.
//!
//! Every detection and every disambiguation answer goes through one
//! [`Orchestrator::run`] task fed by an mpsc queue, so commands are handled
//! one at a time and in arrival order. When a detection cannot be attributed
//! with confidence it is parked as a [`PendingDisambiguation`] until a human
//! picks an anime or cancels.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::{MediaProvider, ProviderError};
use crate::config::ResolutionConfig;
use crate::domain::events::NotificationEvent;
use crate::domain::{AnimeId, Platform, WatchStatus};
use crate::models::{
    EpisodeDetection, LibraryEntry, MediaSummary, ProgressClamp, SeasonEntry, TitleMapping,
    usable_episode,
};
use crate::parser::{self, extract_season_number, season_of_titles};
use crate::services::matcher::find_match;
use crate::services::resolver::EpisodeResolver;
use crate::services::timeline::TimelineBuilder;
use crate::services::{LibraryError, LibraryService};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Unknown disambiguation request: {0}")]
    UnknownRequest(Uuid),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Detection pipeline is not running")]
    PipelineClosed,
}

/// What a detection or a disambiguation answer did to the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DetectionOutcome {
    #[serde(rename_all = "camelCase")]
    Updated {
        anime_id: AnimeId,
        title: String,
        episode: u32,
        progress: u32,
        status: WatchStatus,
        clamp: Option<ProgressClamp>,
    },
    /// Attributed, but the entry already reflected the episode.
    #[serde(rename_all = "camelCase")]
    Unchanged {
        anime_id: AnimeId,
        title: String,
        episode: u32,
        progress: u32,
        clamp: Option<ProgressClamp>,
    },
    #[serde(rename_all = "camelCase")]
    NeedsDisambiguation { request_id: Uuid },
    Ignored { reason: String },
}

impl DetectionOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Updated { .. } => "updated",
            Self::Unchanged { .. } => "unchanged",
            Self::NeedsDisambiguation { .. } => "disambiguation",
            Self::Ignored { .. } => "ignored",
        }
    }
}

/// A detection waiting for a human decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDisambiguation {
    pub id: Uuid,
    /// Normalized detection; `raw_title` holds the cleaned title.
    pub detection: EpisodeDetection,
    pub candidates: Vec<MediaSummary>,
    pub created_at: DateTime<Utc>,
}

pub enum PipelineCommand {
    Detect(EpisodeDetection),
    Resolve {
        request_id: Uuid,
        anime_id: AnimeId,
        reply: oneshot::Sender<Result<DetectionOutcome, OrchestratorError>>,
    },
    Cancel {
        request_id: Uuid,
        reply: oneshot::Sender<Result<(), OrchestratorError>>,
    },
}

/// Sending side of the pipeline queue.
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::Sender<PipelineCommand>,
}

impl PipelineHandle {
    /// Creates the queue; the receiver goes to [`Orchestrator::run`].
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PipelineCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queues a detection without waiting for it to be processed.
    pub async fn submit(&self, detection: EpisodeDetection) -> Result<(), OrchestratorError> {
        self.tx
            .send(PipelineCommand::Detect(detection))
            .await
            .map_err(|_| OrchestratorError::PipelineClosed)
    }

    pub async fn resolve(
        &self,
        request_id: Uuid,
        anime_id: AnimeId,
    ) -> Result<DetectionOutcome, OrchestratorError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(PipelineCommand::Resolve {
                request_id,
                anime_id,
                reply,
            })
            .await
            .map_err(|_| OrchestratorError::PipelineClosed)?;
        response
            .await
            .map_err(|_| OrchestratorError::PipelineClosed)?
    }

    pub async fn cancel(&self, request_id: Uuid) -> Result<(), OrchestratorError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(PipelineCommand::Cancel { request_id, reply })
            .await
            .map_err(|_| OrchestratorError::PipelineClosed)?;
        response
            .await
            .map_err(|_| OrchestratorError::PipelineClosed)?
    }
}

struct SearchCandidates {
    candidates: Vec<MediaSummary>,
    season_matched: bool,
}

/// Detection after parsing, ready for matching.
#[derive(Debug)]
struct Observation {
    detection: EpisodeDetection,
    season_hint: Option<u32>,
}

impl Observation {
    fn title(&self) -> &str {
        &self.detection.raw_title
    }

    fn mapping_key(&self) -> String {
        TitleMapping::key_with_season(self.title(), self.season_hint)
    }

    /// Season-relative number when the source knows it, else the overall one.
    fn episode(&self) -> Option<u32> {
        self.detection
            .season_episode
            .or(self.detection.overall_episode)
    }
}

pub struct Orchestrator {
    library: Arc<dyn LibraryService>,
    provider: Arc<dyn MediaProvider>,
    resolver: EpisodeResolver,
    max_relation_steps: usize,
    search_result_limit: usize,
    event_bus: broadcast::Sender<NotificationEvent>,
    pending: RwLock<HashMap<Uuid, PendingDisambiguation>>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        library: Arc<dyn LibraryService>,
        provider: Arc<dyn MediaProvider>,
        config: &ResolutionConfig,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self {
            library,
            provider,
            resolver: EpisodeResolver::new(config),
            max_relation_steps: config.max_relation_steps,
            search_result_limit: config.search_result_limit,
            event_bus,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Processes queued commands until every [`PipelineHandle`] is dropped.
    pub async fn run(self: Arc<Self>, mut commands: mpsc::Receiver<PipelineCommand>) {
        info!("Detection pipeline started");

        while let Some(command) = commands.recv().await {
            match command {
                PipelineCommand::Detect(detection) => {
                    if let Err(e) = self.handle_detection(detection).await {
                        warn!(error = %e, "Detection failed");
                        self.publish(NotificationEvent::Error {
                            message: format!("Detection failed: {e}"),
                        });
                    }
                }
                PipelineCommand::Resolve {
                    request_id,
                    anime_id,
                    reply,
                } => {
                    let result = self.resolve_pending(request_id, anime_id).await;
                    let _ = reply.send(result);
                }
                PipelineCommand::Cancel { request_id, reply } => {
                    let result = self.cancel_pending(request_id).await;
                    let _ = reply.send(result);
                }
            }
        }

        info!("Detection pipeline stopped");
    }

    /// Open disambiguation requests, oldest first.
    pub async fn pending(&self) -> Vec<PendingDisambiguation> {
        let mut pending: Vec<_> = self.pending.read().await.values().cloned().collect();
        pending.sort_by_key(|p| p.created_at);
        pending
    }

    pub async fn handle_detection(
        &self,
        detection: EpisodeDetection,
    ) -> Result<DetectionOutcome, OrchestratorError> {
        metrics::counter!("shiori_detections_total", "platform" => detection.platform.as_str())
            .increment(1);

        let outcome = match normalize(detection) {
            Ok(observation) => {
                self.publish(NotificationEvent::DetectionReceived {
                    platform: observation.detection.platform,
                    title: observation.title().to_string(),
                    episode: observation.episode(),
                });
                self.attribute(observation).await?
            }
            Err((raw_title, reason)) => {
                debug!(title = %raw_title, reason, "Ignoring detection");
                self.publish(NotificationEvent::DetectionIgnored {
                    title: raw_title,
                    reason: reason.to_string(),
                });
                DetectionOutcome::Ignored {
                    reason: reason.to_string(),
                }
            }
        };

        metrics::counter!("shiori_detection_outcomes_total", "outcome" => outcome.label())
            .increment(1);
        Ok(outcome)
    }

    /// Answers a disambiguation request with the anime the user picked.
    ///
    /// Records a title mapping so the same title resolves directly next time.
    pub async fn resolve_pending(
        &self,
        request_id: Uuid,
        anime_id: AnimeId,
    ) -> Result<DetectionOutcome, OrchestratorError> {
        let request = self
            .pending
            .write()
            .await
            .remove(&request_id)
            .ok_or(OrchestratorError::UnknownRequest(request_id))?;

        let entry = match self.entry_for_choice(&request, anime_id).await {
            Ok(entry) => entry,
            Err(e) => {
                // Keep the request answerable.
                self.pending.write().await.insert(request_id, request);
                return Err(e);
            }
        };

        let mapping_key = TitleMapping::key_with_season(
            &request.detection.raw_title,
            request.detection.season_number,
        );
        self.library.add_mapping(&mapping_key, anime_id).await?;

        info!(
            event = "disambiguation_resolved",
            request_id = %request_id,
            anime_id = %anime_id,
            title = %request.detection.raw_title,
            "Disambiguation resolved"
        );
        self.publish(NotificationEvent::DisambiguationResolved {
            request_id,
            anime_id,
        });

        let season_hint = request.detection.season_number;
        let observation = Observation {
            detection: request.detection,
            season_hint,
        };
        self.apply(&entry, &observation).await
    }

    pub async fn cancel_pending(&self, request_id: Uuid) -> Result<(), OrchestratorError> {
        self.pending
            .write()
            .await
            .remove(&request_id)
            .ok_or(OrchestratorError::UnknownRequest(request_id))?;

        info!(event = "disambiguation_cancelled", request_id = %request_id, "Disambiguation cancelled");
        self.publish(NotificationEvent::DisambiguationCancelled { request_id });
        Ok(())
    }

    async fn attribute(
        &self,
        observation: Observation,
    ) -> Result<DetectionOutcome, OrchestratorError> {
        let library = self.library.list_entries().await?;
        let mappings = self.library.list_mappings().await?;

        if let Some(found) = find_match(
            observation.title(),
            observation.season_hint,
            &library,
            &mappings,
        ) {
            debug!(
                title = %observation.title(),
                anime_id = %found.entry.id,
                kind = ?found.kind,
                "Matched library entry"
            );
            let entry = found.entry.clone();
            return self.apply(&entry, &observation).await;
        }

        let found = match self.search_candidates(&observation).await {
            Ok(found) => found,
            Err(e) => {
                warn!(title = %observation.title(), error = %e, "Title search failed");
                return Ok(self.request_disambiguation(observation, Vec::new()).await);
            }
        };

        let accepted = if found.season_matched {
            pick_candidate(observation.title(), &found.candidates)
        } else {
            None
        };

        match accepted {
            Some(media) => {
                info!(
                    event = "auto_accepted",
                    title = %observation.title(),
                    anime_id = %media.id,
                    "Accepted single search result"
                );
                let ensured = self
                    .library
                    .ensure_entry(media, WatchStatus::Watching)
                    .await?;
                self.library
                    .add_mapping(&observation.mapping_key(), media.id)
                    .await?;
                self.apply(&ensured.entry, &observation).await
            }
            None => Ok(self
                .request_disambiguation(observation, found.candidates)
                .await),
        }
    }

    /// Provider search filtered to the detected season.
    ///
    /// When nothing survives the filter the unfiltered results are returned
    /// with `season_matched = false`, so the user still has something to
    /// choose from but nothing is auto-accepted.
    async fn search_candidates(
        &self,
        observation: &Observation,
    ) -> Result<SearchCandidates, ProviderError> {
        let results = self
            .provider
            .search_by_title(observation.title(), observation.season_hint)
            .await?;

        let wanted = observation.season_hint.unwrap_or(1);
        let (mut matching, others): (Vec<MediaSummary>, Vec<MediaSummary>) = results
            .into_iter()
            .partition(|m| season_of_titles(m.titles()) == wanted);

        let season_matched = !matching.is_empty();
        if !season_matched {
            matching = others;
        }
        matching.truncate(self.search_result_limit);

        Ok(SearchCandidates {
            candidates: matching,
            season_matched,
        })
    }

    async fn request_disambiguation(
        &self,
        observation: Observation,
        candidates: Vec<MediaSummary>,
    ) -> DetectionOutcome {
        let request = PendingDisambiguation {
            id: Uuid::new_v4(),
            detection: observation.detection,
            candidates,
            created_at: Utc::now(),
        };
        let request_id = request.id;

        info!(
            event = "disambiguation_needed",
            request_id = %request_id,
            title = %request.detection.raw_title,
            candidates = request.candidates.len(),
            "Detection needs a human decision"
        );
        self.publish(NotificationEvent::DisambiguationNeeded {
            request_id,
            raw_title: request.detection.raw_title.clone(),
            episode: request
                .detection
                .season_episode
                .or(request.detection.overall_episode),
            candidates: request.candidates.clone(),
        });

        self.pending.write().await.insert(request_id, request);
        DetectionOutcome::NeedsDisambiguation { request_id }
    }

    async fn entry_for_choice(
        &self,
        request: &PendingDisambiguation,
        anime_id: AnimeId,
    ) -> Result<LibraryEntry, OrchestratorError> {
        match self.library.get_entry(anime_id).await {
            Ok(entry) => return Ok(entry),
            Err(LibraryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let media = match request.candidates.iter().find(|c| c.id == anime_id) {
            Some(candidate) => candidate.clone(),
            None => self.provider.get_media_relations(anime_id).await?.media,
        };

        Ok(self
            .library
            .ensure_entry(&media, WatchStatus::Watching)
            .await?
            .entry)
    }

    /// Resolves absolute numbering if needed and reconciles the episode.
    async fn apply(
        &self,
        entry: &LibraryEntry,
        observation: &Observation,
    ) -> Result<DetectionOutcome, OrchestratorError> {
        let Some(observed) = observation.episode() else {
            return Ok(DetectionOutcome::Ignored {
                reason: "missing episode".to_string(),
            });
        };

        let (target, episode) = self.resolve_target(entry, observation, observed).await?;

        let reconciliation = self
            .library
            .record_progress(target.id, episode, observation.detection.platform.source())
            .await?;
        let updated = &reconciliation.entry;

        self.publish(NotificationEvent::NowWatching {
            anime_id: updated.id,
            title: updated.title.clone(),
            episode,
        });

        if reconciliation.changed() {
            Ok(DetectionOutcome::Updated {
                anime_id: updated.id,
                title: updated.title.clone(),
                episode,
                progress: updated.progress,
                status: updated.status,
                clamp: reconciliation.clamp,
            })
        } else {
            Ok(DetectionOutcome::Unchanged {
                anime_id: updated.id,
                title: updated.title.clone(),
                episode,
                progress: updated.progress,
                clamp: reconciliation.clamp,
            })
        }
    }

    async fn resolve_target(
        &self,
        entry: &LibraryEntry,
        observation: &Observation,
        observed: u32,
    ) -> Result<(LibraryEntry, u32), OrchestratorError> {
        let detection = &observation.detection;
        if detection.season_episode.is_some()
            || !self.resolver.needs_resolution(
                detection.overall_episode,
                observation.season_hint,
                entry.known_episodes(),
            )
        {
            return Ok((entry.clone(), observed));
        }

        let seed_hint = SeasonEntry {
            anime_id: entry.id,
            title: entry.title.clone(),
            episode_count: entry.episodes,
        };
        let timeline = TimelineBuilder::new(self.provider.as_ref(), self.max_relation_steps)
            .build(entry.id, Some(seed_hint))
            .await;

        if timeline.len() < 2 || !timeline.contains(entry.id) {
            debug!(anime_id = %entry.id, seasons = timeline.len(), "No franchise to resolve against");
            return Ok((entry.clone(), observed));
        }

        let Some(resolved) = self.resolver.resolve(&timeline, observed) else {
            return Ok((entry.clone(), observed));
        };

        info!(
            event = "episode_resolved",
            absolute = observed,
            anime_id = %resolved.anime_id,
            episode = resolved.episode,
            season_index = resolved.season_index,
            extrapolated = resolved.extrapolated,
            partial = timeline.partial,
            "Resolved absolute episode"
        );

        if resolved.anime_id == entry.id {
            return Ok((entry.clone(), resolved.episode));
        }

        let media = timeline
            .seasons
            .iter()
            .find(|s| s.anime_id == resolved.anime_id)
            .map(|season| MediaSummary {
                id: season.anime_id,
                title: season.title.clone(),
                title_english: None,
                title_japanese: None,
                episodes: season.episode_count,
            })
            .unwrap_or_else(|| MediaSummary {
                id: resolved.anime_id,
                title: resolved.title.clone(),
                title_english: None,
                title_japanese: None,
                episodes: None,
            });

        let ensured = self
            .library
            .ensure_entry(&media, WatchStatus::Watching)
            .await?;
        Ok((ensured.entry, resolved.episode))
    }

    fn publish(&self, event: NotificationEvent) {
        let _ = self.event_bus.send(event);
    }
}

/// Parses the detection if needed and derives the season hint.
///
/// Local detections are always parsed; extension detections only when they
/// carry no episode fields.
fn normalize(detection: EpisodeDetection) -> Result<Observation, (String, &'static str)> {
    let mut detection = detection.with_usable_numbers();
    let mut parsed_season = None;

    if detection.platform == Platform::Local || !detection.has_episode() {
        let parsed = parser::parse(&detection.raw_title);
        let Some(title) = parsed.title else {
            return Err((detection.raw_title, "missing title"));
        };
        detection.raw_title = title;
        parsed_season = parsed.season;

        let episode = usable_episode(parsed.episode);
        if parsed.season.is_some() {
            detection.season_episode = episode;
        } else {
            detection.overall_episode = episode;
        }
    } else {
        detection.raw_title = detection.raw_title.trim().to_string();
    }

    if detection.raw_title.is_empty() {
        return Err((detection.raw_title, "missing title"));
    }
    if !detection.has_episode() {
        return Err((detection.raw_title, "missing episode"));
    }

    let season_hint = detection
        .season_number
        .or(parsed_season)
        .or_else(|| extract_season_number(&detection.raw_title));
    detection.season_number = season_hint;

    Ok(Observation {
        detection,
        season_hint,
    })
}

/// Auto-accept rule: an exact title hit, else a single remaining candidate.
fn pick_candidate<'a>(title: &str, candidates: &'a [MediaSummary]) -> Option<&'a MediaSummary> {
    let key = TitleMapping::key_for(title);
    candidates
        .iter()
        .find(|m| m.titles().any(|t| TitleMapping::key_for(t) == key))
        .or_else(|| match candidates {
            [only] => Some(only),
            _ => None,
        })
}
