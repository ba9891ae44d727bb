// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Favorite add/remove behaviour: ordering, idempotence and failure handling.

use std::sync::Arc;
use story_session::config::ConflictPolicy;
use story_session::error::AppError;
use story_session::models::StoryId;
use story_session::Completion;

mod common;
use common::{logged_in, seeded_api};

fn is_favorite(coordinator: &story_session::ViewCoordinator, id: &str) -> bool {
    coordinator
        .session()
        .current_identity()
        .expect("logged in")
        .is_favorite(&StoryId::from(id))
}

#[tokio::test]
async fn test_add_then_remove_favorite() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;
    let identities = coordinator.identities();

    let outcome = identities.add_favorite(&"s1".into()).await.unwrap();
    assert_eq!(outcome, Completion::Applied);
    assert!(is_favorite(&coordinator, "s1"));
    assert_eq!(api.server_favorites("bob"), vec!["s1"]);

    let outcome = identities.remove_favorite(&"s1".into()).await.unwrap();
    assert_eq!(outcome, Completion::Applied);
    assert!(!is_favorite(&coordinator, "s1"));
    assert!(api.server_favorites("bob").is_empty());
}

#[tokio::test]
async fn test_favorite_shares_collection_story() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api, "bob", ConflictPolicy::Queue).await;

    coordinator
        .identities()
        .add_favorite(&"s2".into())
        .await
        .unwrap();

    coordinator.session().with_state(|state| {
        let fav = state
            .identity
            .as_ref()
            .unwrap()
            .favorites()
            .get(&"s2".into())
            .unwrap()
            .clone();
        let in_collection = state.stories.get(&"s2".into()).unwrap();
        assert!(Arc::ptr_eq(&fav, in_collection));
    });
}

#[tokio::test]
async fn test_add_favorite_is_idempotent() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;
    let identities = coordinator.identities();

    identities.add_favorite(&"s1".into()).await.unwrap();
    let calls = api.favorite_calls();

    let outcome = identities.add_favorite(&"s1".into()).await.unwrap();
    assert_eq!(outcome, Completion::Unchanged);
    assert_eq!(api.favorite_calls(), calls, "No remote call for a no-op");

    let identity = coordinator.session().current_identity().unwrap();
    assert_eq!(identity.favorites().len(), 1);
}

#[tokio::test]
async fn test_remove_non_favorite_is_noop() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;

    let outcome = coordinator
        .identities()
        .remove_favorite(&"s1".into())
        .await
        .unwrap();

    assert_eq!(outcome, Completion::Unchanged);
    assert_eq!(api.favorite_calls(), 0);
    assert!(coordinator
        .session()
        .current_identity()
        .unwrap()
        .favorites()
        .is_empty());
}

#[tokio::test]
async fn test_failed_round_trip_leaves_view_unchanged() {
    let api = seeded_api();
    api.seed_favorite("bob", "s2");
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;
    api.set_fail_favorites(true);

    let err = coordinator
        .identities()
        .add_favorite(&"s1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FavoriteToggle(_)));
    assert!(!is_favorite(&coordinator, "s1"));

    let err = coordinator
        .identities()
        .remove_favorite(&"s2".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FavoriteToggle(_)));
    assert!(is_favorite(&coordinator, "s2"));
}

#[tokio::test]
async fn test_unreachable_service_is_a_toggle_error() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;
    api.set_offline(true);

    let err = coordinator
        .identities()
        .add_favorite(&"s1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FavoriteToggle(_)));
    assert!(!is_favorite(&coordinator, "s1"));
}

#[tokio::test]
async fn test_no_local_change_before_remote_resolves() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;
    let coordinator = Arc::new(coordinator);
    let gate = api.hold_responses();

    let task = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.identities().add_favorite(&"s1".into()).await })
    };

    api.call_entered().await;
    // The service has already recorded it; the local view must not yet.
    assert_eq!(api.server_favorites("bob"), vec!["s1"]);
    assert!(!is_favorite(&coordinator, "s1"));

    gate.add_permits(1);
    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, Completion::Applied);
    assert!(is_favorite(&coordinator, "s1"));
}

#[tokio::test]
async fn test_toggle_sequence_tracks_last_success() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;
    let identities = coordinator.identities();
    let id: StoryId = "s3".into();

    let mut expected = false;
    for round in 0..7 {
        // Every third attempt fails remotely and must not flip anything
        let fail = round % 3 == 2;
        api.set_fail_favorites(fail);

        let result = identities.toggle_favorite(&id).await;
        if fail {
            assert!(matches!(result, Err(AppError::FavoriteToggle(_))));
        } else {
            assert_eq!(result.unwrap(), Completion::Applied);
            expected = !expected;
        }
        assert_eq!(is_favorite(&coordinator, "s3"), expected);
    }
}

#[tokio::test]
async fn test_favorite_requires_identity() {
    let api = seeded_api();
    let (coordinator, _) = common::create_test_coordinator(api, ConflictPolicy::Queue);
    coordinator.start().await.unwrap();

    let err = coordinator
        .identities()
        .add_favorite(&"s1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
}

#[tokio::test]
async fn test_favorite_unknown_story_is_not_found() {
    let api = seeded_api();
    let (coordinator, _) = logged_in(api.clone(), "bob", ConflictPolicy::Queue).await;

    let err = coordinator
        .identities()
        .add_favorite(&"missing".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(api.favorite_calls(), 0);
}
