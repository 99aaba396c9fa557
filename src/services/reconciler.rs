//! Progress state machine.
//!
//! Applies an observed episode to a library entry: progress never moves
//! backwards, never passes a known episode total, and an observation pulls a
//! stale `plan-to-watch`/`dropped` entry back to `watching` (or straight to
//! `completed` once the total is reached). Corrections are reported through
//! [`ProgressClamp`] rather than as errors.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{WatchSource, WatchStatus};
use crate::models::{ClampReason, LibraryEntry, ProgressClamp, WatchEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub entry: LibraryEntry,
    /// One event per newly crossed episode, in episode order.
    pub events: Vec<WatchEvent>,
    pub clamp: Option<ProgressClamp>,
    pub previous_progress: u32,
    pub previous_status: WatchStatus,
}

impl Reconciliation {
    #[must_use]
    pub const fn progress_advanced(&self) -> bool {
        self.entry.progress > self.previous_progress
    }

    #[must_use]
    pub fn status_changed(&self) -> bool {
        self.entry.status != self.previous_status
    }

    #[must_use]
    pub fn changed(&self) -> bool {
        self.progress_advanced() || self.status_changed()
    }
}

/// Applies `observed_episode` to `entry`.
///
/// `status_override` replaces the automatic status transition when given.
/// `now` becomes `updated_at` and the base for event timestamps; events of
/// one batch are spaced one microsecond apart so their order is preserved.
#[must_use]
pub fn reconcile(
    entry: &LibraryEntry,
    observed_episode: u32,
    source: WatchSource,
    status_override: Option<WatchStatus>,
    now: DateTime<Utc>,
) -> Reconciliation {
    let current = entry.progress;
    let mut next = observed_episode;
    let mut clamp = None;

    if next < current {
        clamp = Some(ProgressClamp {
            reason: ClampReason::Regression,
            clamped_from: next,
            clamped_to: current,
        });
        next = current;
    }

    let total = entry.known_episodes();
    if let Some(total) = total
        && next > total
    {
        clamp = Some(ProgressClamp {
            reason: ClampReason::Ceiling,
            clamped_from: clamp.map_or(next, |c| c.clamped_from),
            clamped_to: total,
        });
        next = total;
    }

    let status = status_override.unwrap_or_else(|| {
        if total.is_some_and(|t| next >= t) {
            WatchStatus::Completed
        } else if matches!(entry.status, WatchStatus::PlanToWatch | WatchStatus::Dropped) {
            WatchStatus::Watching
        } else {
            entry.status
        }
    });

    let events = if next > current {
        (current + 1..=next)
            .map(|episode_number| WatchEvent {
                anime_id: entry.id,
                episode_number,
                timestamp: now + Duration::microseconds(i64::from(episode_number - current - 1)),
                source,
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut updated = entry.clone();
    updated.progress = next;
    updated.status = status;
    updated.updated_at = now;

    Reconciliation {
        entry: updated,
        events,
        clamp,
        previous_progress: current,
        previous_status: entry.status,
    }
}

/// Applies a user-entered progress value.
///
/// Unlike [`reconcile`] the value may move backwards; it is still clamped to
/// a known total. Forward moves log [`WatchSource::Manual`] events, and
/// stepping back below the total reopens a completed entry.
#[must_use]
pub fn override_progress(entry: &LibraryEntry, progress: u32, now: DateTime<Utc>) -> Reconciliation {
    let current = entry.progress;
    let total = entry.known_episodes();

    if progress >= current {
        return reconcile(entry, progress, WatchSource::Manual, None, now);
    }

    let status = if entry.status == WatchStatus::Completed && total.is_some_and(|t| progress < t) {
        WatchStatus::Watching
    } else {
        entry.status
    };

    let mut updated = entry.clone();
    updated.progress = progress;
    updated.status = status;
    updated.updated_at = now;

    Reconciliation {
        entry: updated,
        events: Vec::new(),
        clamp: None,
        previous_progress: current,
        previous_status: entry.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnimeId;

    fn entry(progress: u32, episodes: Option<u32>, status: WatchStatus) -> LibraryEntry {
        LibraryEntry {
            id: AnimeId::new(1),
            title: "Show".to_string(),
            title_english: None,
            title_japanese: None,
            episodes,
            status,
            progress,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn apply(e: &LibraryEntry, observed: u32) -> Reconciliation {
        reconcile(e, observed, WatchSource::Local, None, Utc::now())
    }

    #[test]
    fn test_simple_advance() {
        let r = apply(&entry(4, Some(12), WatchStatus::Watching), 5);
        assert_eq!(r.entry.progress, 5);
        assert_eq!(r.entry.status, WatchStatus::Watching);
        assert_eq!(r.events.len(), 1);
        assert_eq!(r.events[0].episode_number, 5);
        assert_eq!(r.events[0].source, WatchSource::Local);
        assert_eq!(r.clamp, None);
    }

    #[test]
    fn test_completion_boundary() {
        let r = apply(&entry(11, Some(12), WatchStatus::Watching), 12);
        assert_eq!(r.entry.progress, 12);
        assert_eq!(r.entry.status, WatchStatus::Completed);
    }

    #[test]
    fn test_plan_to_watch_promotion() {
        let r = apply(&entry(0, None, WatchStatus::PlanToWatch), 1);
        assert_eq!(r.entry.status, WatchStatus::Watching);
        assert_eq!(r.entry.progress, 1);
        assert!(r.status_changed());
    }

    #[test]
    fn test_dropped_promotion() {
        let r = apply(&entry(3, Some(12), WatchStatus::Dropped), 4);
        assert_eq!(r.entry.status, WatchStatus::Watching);
    }

    #[test]
    fn test_completion_takes_precedence_over_promotion() {
        let r = apply(&entry(0, Some(1), WatchStatus::PlanToWatch), 1);
        assert_eq!(r.entry.status, WatchStatus::Completed);
    }

    #[test]
    fn test_on_hold_is_kept() {
        let r = apply(&entry(3, Some(12), WatchStatus::OnHold), 4);
        assert_eq!(r.entry.status, WatchStatus::OnHold);
        assert_eq!(r.entry.progress, 4);
    }

    #[test]
    fn test_regression_clamped() {
        let r = apply(&entry(8, Some(12), WatchStatus::Watching), 3);
        assert_eq!(r.entry.progress, 8);
        assert!(r.events.is_empty());
        assert_eq!(
            r.clamp,
            Some(ProgressClamp {
                reason: ClampReason::Regression,
                clamped_from: 3,
                clamped_to: 8,
            })
        );
        assert!(!r.changed());
    }

    #[test]
    fn test_ceiling_clamped() {
        let r = apply(&entry(10, Some(12), WatchStatus::Watching), 14);
        assert_eq!(r.entry.progress, 12);
        assert_eq!(r.entry.status, WatchStatus::Completed);
        assert_eq!(r.events.len(), 2);
        assert_eq!(
            r.clamp,
            Some(ProgressClamp {
                reason: ClampReason::Ceiling,
                clamped_from: 14,
                clamped_to: 12,
            })
        );
    }

    #[test]
    fn test_batch_events_ordered() {
        let now = Utc::now();
        let r = reconcile(
            &entry(2, None, WatchStatus::Watching),
            6,
            WatchSource::Extension,
            None,
            now,
        );
        let episodes: Vec<u32> = r.events.iter().map(|e| e.episode_number).collect();
        assert_eq!(episodes, vec![3, 4, 5, 6]);
        assert_eq!(r.events[0].timestamp, now);
        assert!(r.events.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(r.entry.updated_at, now);
    }

    #[test]
    fn test_status_override() {
        let r = reconcile(
            &entry(11, Some(12), WatchStatus::Watching),
            12,
            WatchSource::Manual,
            Some(WatchStatus::OnHold),
            Utc::now(),
        );
        assert_eq!(r.entry.status, WatchStatus::OnHold);
        assert_eq!(r.entry.progress, 12);
    }

    #[test]
    fn test_unknown_total_never_completes() {
        let r = apply(&entry(0, None, WatchStatus::Watching), 500);
        assert_eq!(r.entry.progress, 500);
        assert_eq!(r.entry.status, WatchStatus::Watching);
    }

    #[test]
    fn test_override_moves_backwards() {
        let r = override_progress(&entry(12, Some(12), WatchStatus::Completed), 4, Utc::now());
        assert_eq!(r.entry.progress, 4);
        assert_eq!(r.entry.status, WatchStatus::Watching);
        assert!(r.events.is_empty());
        assert_eq!(r.clamp, None);
        assert!(!r.progress_advanced());
    }

    #[test]
    fn test_override_forward_is_manual_and_clamped() {
        let r = override_progress(&entry(2, Some(6), WatchStatus::OnHold), 9, Utc::now());
        assert_eq!(r.entry.progress, 6);
        assert_eq!(r.entry.status, WatchStatus::Completed);
        assert_eq!(r.events.len(), 4);
        assert!(r.events.iter().all(|e| e.source == WatchSource::Manual));
        assert_eq!(r.clamp.map(|c| c.reason), Some(ClampReason::Ceiling));
    }

    #[test]
    fn test_monotonic_and_ceiling_over_sequences() {
        let sequences: [&[u32]; 4] = [
            &[1, 5, 3, 2, 9, 4],
            &[12, 1, 13, 40, 0],
            &[0, 0, 1, 1, 2],
            &[7, 6, 5, 4, 3, 2, 1],
        ];

        for observed in sequences {
            let mut e = entry(0, Some(10), WatchStatus::PlanToWatch);
            let mut events = 0_usize;
            for &episode in observed {
                let before = e.progress;
                let r = apply(&e, episode);
                assert!(r.entry.progress >= before);
                assert!(r.entry.progress <= 10);
                if r.entry.progress == 10 {
                    assert_eq!(r.entry.status, WatchStatus::Completed);
                }
                events += r.events.len();
                e = r.entry;
            }
            // Every episode up to the final progress is logged exactly once.
            assert_eq!(events, e.progress as usize);
        }
    }
}
