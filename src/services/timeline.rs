//! Franchise timeline construction over the provider's relation graph.
//!
//! Walks prequel edges back to the root, then sequel edges forward. The
//! relation graph is external data and may contain cycles or dangling edges,
//! so every walk carries a visited set and a hard step bound, and lookup
//! failures degrade to a partial (or seed-only) timeline instead of an error.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::clients::MediaProvider;
use crate::domain::AnimeId;
use crate::models::{FranchiseTimeline, MediaWithRelations, SeasonEntry};

pub struct TimelineBuilder<'a> {
    provider: &'a dyn MediaProvider,
    max_steps: usize,
}

impl<'a> TimelineBuilder<'a> {
    #[must_use]
    pub const fn new(provider: &'a dyn MediaProvider, max_steps: usize) -> Self {
        Self {
            provider,
            max_steps,
        }
    }

    /// Builds the timeline containing `seed`.
    ///
    /// `seed_hint` is what the caller already knows about the seed and is
    /// returned as the single season if the seed lookup itself fails.
    pub async fn build(&self, seed: AnimeId, seed_hint: Option<SeasonEntry>) -> FranchiseTimeline {
        let seed_node = match self.provider.get_media_relations(seed).await {
            Ok(node) => node,
            Err(e) => {
                warn!(anime_id = %seed, error = %e, "Relation lookup failed for seed, using single-season timeline");
                metrics::counter!("shiori_timeline_degraded_total", "phase" => "seed").increment(1);
                let season = seed_hint.unwrap_or_else(|| SeasonEntry {
                    anime_id: seed,
                    title: format!("#{seed}"),
                    episode_count: None,
                });
                return FranchiseTimeline::single(season);
            }
        };

        let mut nodes: HashMap<AnimeId, MediaWithRelations> = HashMap::new();
        nodes.insert(seed, seed_node);

        let mut steps = 0_usize;
        let mut partial = false;

        let root = self
            .find_root(seed, &mut nodes, &mut steps, &mut partial)
            .await;

        let mut timeline = self
            .walk_forward(root, &mut nodes, &mut steps, &mut partial)
            .await;
        timeline.partial = partial;

        if !timeline.contains(seed) {
            debug!(anime_id = %seed, root = %root, "Seed is not on the sequel path of its root");
        }

        debug!(
            anime_id = %seed,
            seasons = timeline.len(),
            partial,
            steps,
            "Built franchise timeline"
        );

        timeline
    }

    async fn find_root(
        &self,
        seed: AnimeId,
        nodes: &mut HashMap<AnimeId, MediaWithRelations>,
        steps: &mut usize,
        partial: &mut bool,
    ) -> AnimeId {
        let mut visited = HashSet::from([seed]);
        let mut current = seed;

        while let Some(prequel) = nodes.get(&current).and_then(|n| n.prequel_id) {
            if visited.contains(&prequel) {
                warn!(anime_id = %current, prequel = %prequel, "Prequel cycle detected, stopping at current node");
                break;
            }
            if *steps >= self.max_steps {
                warn!(anime_id = %current, steps = *steps, "Relation walk step bound reached");
                *partial = true;
                break;
            }
            *steps += 1;

            match self.provider.get_media_relations(prequel).await {
                Ok(node) => {
                    visited.insert(prequel);
                    nodes.insert(prequel, node);
                    current = prequel;
                }
                Err(e) => {
                    warn!(anime_id = %prequel, error = %e, "Prequel lookup failed, treating current node as root");
                    metrics::counter!("shiori_timeline_degraded_total", "phase" => "prequel")
                        .increment(1);
                    *partial = true;
                    break;
                }
            }
        }

        current
    }

    async fn walk_forward(
        &self,
        root: AnimeId,
        nodes: &mut HashMap<AnimeId, MediaWithRelations>,
        steps: &mut usize,
        partial: &mut bool,
    ) -> FranchiseTimeline {
        let mut timeline = FranchiseTimeline::default();
        let mut visited = HashSet::from([root]);
        let mut current = root;

        if let Some(node) = nodes.get(&root) {
            timeline.seasons.push(SeasonEntry::from(&node.media));
        }

        while let Some(sequel) = nodes.get(&current).and_then(|n| n.sequel_id) {
            if visited.contains(&sequel) {
                warn!(anime_id = %current, sequel = %sequel, "Sequel cycle detected, ending timeline");
                break;
            }
            if *steps >= self.max_steps {
                warn!(anime_id = %current, steps = *steps, "Relation walk step bound reached");
                *partial = true;
                break;
            }
            *steps += 1;

            if !nodes.contains_key(&sequel) {
                match self.provider.get_media_relations(sequel).await {
                    Ok(node) => {
                        nodes.insert(sequel, node);
                    }
                    Err(e) => {
                        warn!(anime_id = %sequel, error = %e, "Sequel lookup failed, returning partial timeline");
                        metrics::counter!("shiori_timeline_degraded_total", "phase" => "sequel")
                            .increment(1);
                        *partial = true;
                        break;
                    }
                }
            }

            visited.insert(sequel);
            if let Some(node) = nodes.get(&sequel) {
                timeline.seasons.push(SeasonEntry::from(&node.media));
            }
            current = sequel;
        }

        timeline
    }
}
