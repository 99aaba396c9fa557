//! End-to-end detection scenarios against an in-memory store.

mod common;

use common::{FakeProvider, media, spawn_state};
use shiori::domain::events::NotificationEvent;
use shiori::domain::{AnimeId, Platform, WatchSource, WatchStatus};
use shiori::models::{ClampReason, EpisodeDetection};
use shiori::services::{DetectionOutcome, LibraryService, OrchestratorError};

fn extension(title: &str, overall: Option<u32>, season: Option<u32>) -> EpisodeDetection {
    EpisodeDetection {
        platform: Platform::Crunchyroll,
        raw_title: title.to_string(),
        overall_episode: overall,
        season_number: season,
        season_episode: None,
        url: None,
    }
}

#[tokio::test]
async fn test_exact_match_updates_progress() {
    let state = spawn_state(FakeProvider::default()).await;
    let library = &state.library_service;
    library
        .ensure_entry(&media(1, "Sousou no Frieren", Some(28)), WatchStatus::Watching)
        .await
        .unwrap();
    library.override_progress(AnimeId::new(1), 4).await.unwrap();

    let outcome = state
        .orchestrator
        .handle_detection(extension("Sousou no Frieren", Some(5), None))
        .await
        .unwrap();

    match outcome {
        DetectionOutcome::Updated {
            anime_id,
            progress,
            status,
            clamp,
            ..
        } => {
            assert_eq!(anime_id, AnimeId::new(1));
            assert_eq!(progress, 5);
            assert_eq!(status, WatchStatus::Watching);
            assert_eq!(clamp, None);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let history = library.history(10).await.unwrap();
    assert_eq!(history[0].episode_number, 5);
    assert_eq!(history[0].source, WatchSource::Extension);
}

#[tokio::test]
async fn test_local_filename_is_parsed() {
    let state = spawn_state(FakeProvider::default()).await;
    state
        .library_service
        .ensure_entry(&media(1, "Sousou no Frieren", Some(28)), WatchStatus::PlanToWatch)
        .await
        .unwrap();

    let outcome = state
        .orchestrator
        .handle_detection(EpisodeDetection::local(
            "[SubsPlease] Sousou no Frieren - 03 (1080p) [ABCD1234].mkv",
        ))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        DetectionOutcome::Updated {
            progress: 3,
            status: WatchStatus::Watching,
            ..
        }
    ));

    let history = state.library_service.history(10).await.unwrap();
    let mut episodes: Vec<u32> = history.iter().map(|e| e.episode_number).collect();
    episodes.sort_unstable();
    assert_eq!(episodes, vec![1, 2, 3]);
    assert!(history.iter().all(|e| e.source == WatchSource::Local));
}

#[tokio::test]
async fn test_regression_is_reported_not_applied() {
    let state = spawn_state(FakeProvider::default()).await;
    let library = &state.library_service;
    library
        .ensure_entry(&media(1, "Sousou no Frieren", Some(28)), WatchStatus::Watching)
        .await
        .unwrap();
    library.override_progress(AnimeId::new(1), 8).await.unwrap();

    let outcome = state
        .orchestrator
        .handle_detection(extension("Sousou no Frieren", Some(3), None))
        .await
        .unwrap();

    match outcome {
        DetectionOutcome::Unchanged {
            progress, clamp, ..
        } => {
            assert_eq!(progress, 8);
            assert_eq!(clamp.map(|c| c.reason), Some(ClampReason::Regression));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(library.get_entry(AnimeId::new(1)).await.unwrap().progress, 8);
}

#[tokio::test]
async fn test_detection_without_episode_is_ignored() {
    let state = spawn_state(FakeProvider::default()).await;
    let outcome = state
        .orchestrator
        .handle_detection(EpisodeDetection::local("Some Random Window"))
        .await
        .unwrap();
    assert!(matches!(outcome, DetectionOutcome::Ignored { .. }));
    assert!(state.library_service.list_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_search_result_is_auto_accepted() {
    let mut provider = FakeProvider::default();
    provider.add_search(
        "Kusuriya no Hitorigoto",
        vec![media(10, "Kusuriya no Hitorigoto", Some(24))],
    );
    let state = spawn_state(provider).await;

    let outcome = state
        .orchestrator
        .handle_detection(extension("Kusuriya no Hitorigoto", Some(2), None))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        DetectionOutcome::Updated { progress: 2, .. }
    ));

    let entry = state
        .library_service
        .get_entry(AnimeId::new(10))
        .await
        .unwrap();
    assert_eq!(entry.status, WatchStatus::Watching);
    assert_eq!(entry.progress, 2);

    let mappings = state.library_service.list_mappings().await.unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].raw_title_key, "kusuriya no hitorigoto");
    assert!(state.orchestrator.pending().await.is_empty());
}

#[tokio::test]
async fn test_ambiguous_search_waits_for_user() {
    let mut provider = FakeProvider::default();
    provider.add_search(
        "Spy Family",
        vec![
            media(20, "Spy x Family", Some(12)),
            media(21, "Spy x Family Code: White", Some(1)),
        ],
    );
    let state = spawn_state(provider).await;
    let mut events = state.event_bus.subscribe();

    let outcome = state
        .orchestrator
        .handle_detection(extension("Spy Family", Some(3), None))
        .await
        .unwrap();
    let DetectionOutcome::NeedsDisambiguation { request_id } = outcome else {
        panic!("expected disambiguation, got {outcome:?}");
    };

    let pending = state.orchestrator.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, request_id);
    assert_eq!(pending[0].candidates.len(), 2);
    assert!(state.library_service.list_entries().await.unwrap().is_empty());

    let mut saw_request = false;
    while let Ok(event) = events.try_recv() {
        if let NotificationEvent::DisambiguationNeeded {
            request_id: id,
            candidates,
            ..
        } = event
        {
            assert_eq!(id, request_id);
            assert_eq!(candidates.len(), 2);
            saw_request = true;
        }
    }
    assert!(saw_request);

    let outcome = state
        .orchestrator
        .resolve_pending(request_id, AnimeId::new(20))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        DetectionOutcome::Updated { progress: 3, .. }
    ));
    assert!(state.orchestrator.pending().await.is_empty());

    // The answer is remembered as a mapping.
    let outcome = state
        .orchestrator
        .handle_detection(extension("Spy Family", Some(4), None))
        .await
        .unwrap();
    match outcome {
        DetectionOutcome::Updated {
            anime_id, progress, ..
        } => {
            assert_eq!(anime_id, AnimeId::new(20));
            assert_eq!(progress, 4);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_and_unknown_requests() {
    let state = spawn_state(FakeProvider::default()).await;

    let outcome = state
        .orchestrator
        .handle_detection(extension("Nothing Matches This", Some(1), None))
        .await
        .unwrap();
    let DetectionOutcome::NeedsDisambiguation { request_id } = outcome else {
        panic!("expected disambiguation, got {outcome:?}");
    };

    state.orchestrator.cancel_pending(request_id).await.unwrap();
    assert!(state.orchestrator.pending().await.is_empty());

    assert!(matches!(
        state.orchestrator.cancel_pending(request_id).await,
        Err(OrchestratorError::UnknownRequest(_))
    ));
    assert!(matches!(
        state
            .orchestrator
            .resolve_pending(request_id, AnimeId::new(1))
            .await,
        Err(OrchestratorError::UnknownRequest(_))
    ));
}

#[tokio::test]
async fn test_search_failure_still_asks_user() {
    let provider = FakeProvider {
        fail_search: true,
        ..FakeProvider::default()
    };
    let state = spawn_state(provider).await;

    let outcome = state
        .orchestrator
        .handle_detection(extension("Offline Show", Some(1), None))
        .await
        .unwrap();
    assert!(matches!(outcome, DetectionOutcome::NeedsDisambiguation { .. }));
    assert!(state.orchestrator.pending().await[0].candidates.is_empty());
}

#[tokio::test]
async fn test_absolute_episode_resolves_into_sequel() {
    let season_one = media(100, "Jujutsu Kaisen", Some(24));
    let season_two = media(101, "Jujutsu Kaisen 2nd Season", Some(23));
    let mut provider = FakeProvider::default();
    provider
        .add_node(season_one.clone(), None, Some(101))
        .add_node(season_two, Some(100), None);
    let state = spawn_state(provider).await;

    let library = &state.library_service;
    library
        .ensure_entry(&season_one, WatchStatus::Watching)
        .await
        .unwrap();
    library.override_progress(AnimeId::new(100), 20).await.unwrap();

    let outcome = state
        .orchestrator
        .handle_detection(extension("Jujutsu Kaisen", Some(26), None))
        .await
        .unwrap();

    match outcome {
        DetectionOutcome::Updated {
            anime_id,
            episode,
            progress,
            ..
        } => {
            assert_eq!(anime_id, AnimeId::new(101));
            assert_eq!(episode, 2);
            assert_eq!(progress, 2);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let sequel = library.get_entry(AnimeId::new(101)).await.unwrap();
    assert_eq!(sequel.title, "Jujutsu Kaisen 2nd Season");
    assert_eq!(sequel.status, WatchStatus::Watching);
    assert_eq!(
        library.get_entry(AnimeId::new(100)).await.unwrap().progress,
        20
    );
}

#[tokio::test]
async fn test_sequel_detection_never_touches_first_season() {
    let mut provider = FakeProvider::default();
    provider.add_search(
        "Oshi no Ko",
        vec![
            media(31, "Oshi no Ko 2nd Season", Some(13)),
            media(30, "Oshi no Ko", Some(11)),
        ],
    );
    let state = spawn_state(provider).await;
    let library = &state.library_service;
    library
        .ensure_entry(&media(30, "Oshi no Ko", Some(11)), WatchStatus::Watching)
        .await
        .unwrap();
    library.override_progress(AnimeId::new(30), 5).await.unwrap();

    let outcome = state
        .orchestrator
        .handle_detection(extension("Oshi no Ko", Some(3), Some(2)))
        .await
        .unwrap();
    match outcome {
        DetectionOutcome::Updated { anime_id, .. } => assert_eq!(anime_id, AnimeId::new(31)),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(library.get_entry(AnimeId::new(30)).await.unwrap().progress, 5);

    // Season 1 detections still land on the first season.
    let outcome = state
        .orchestrator
        .handle_detection(extension("Oshi no Ko", Some(6), None))
        .await
        .unwrap();
    match outcome {
        DetectionOutcome::Updated {
            anime_id, progress, ..
        } => {
            assert_eq!(anime_id, AnimeId::new(30));
            assert_eq!(progress, 6);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_pipeline_handle_round_trip() {
    let mut provider = FakeProvider::default();
    provider.add_search(
        "Dandadan",
        vec![media(40, "Dandadan", Some(12)), media(41, "Dandadan 2nd Season", Some(12))],
    );
    let state = spawn_state(provider).await;

    state
        .pipeline
        .submit(extension("Dandadan", Some(1), None))
        .await
        .unwrap();

    // Resolve goes through the same queue, so the detection above has been
    // processed by the time it is answered.
    let result = state
        .pipeline
        .resolve(uuid::Uuid::new_v4(), AnimeId::new(40))
        .await;
    assert!(matches!(result, Err(OrchestratorError::UnknownRequest(_))));

    let entry = state
        .library_service
        .get_entry(AnimeId::new(40))
        .await
        .unwrap();
    assert_eq!(entry.progress, 1);
}
