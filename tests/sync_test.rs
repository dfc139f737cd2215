mod common;

use std::sync::Arc;

use partylist::{error::Error, spotify::PlaylistSynchronizer, types::PlaylistSummary};

use common::{Harness, PLAYLIST_ID, request};

async fn connected() -> Harness {
    let h = Harness::start().await;
    h.connect_shared(3600).await;
    h
}

#[tokio::test]
async fn adds_approved_tracks_to_an_empty_playlist() {
    let h = connected().await;

    let result = h
        .synchronizer()
        .add_approved(&[request("One", Some("t1")), request("Two", Some("t2"))])
        .await
        .unwrap();

    assert_eq!(result.added_count, 2);
    assert!(result.errors.is_empty());
    assert_eq!(h.tracks(), vec!["t1", "t2"]);
    assert_eq!(h.fake.lock().unwrap().add_batches, vec![2]);
}

#[tokio::test]
async fn tracks_already_present_are_skipped_with_a_note() {
    let h = connected().await;
    h.set_tracks(&["t1"]);

    let result = h
        .synchronizer()
        .add_approved(&[request("One", Some("t1")), request("Two", Some("t2"))])
        .await
        .unwrap();

    assert_eq!(result.added_count, 1);
    assert!(result.notes.iter().any(|n| n.contains("t1")));
    assert_eq!(h.tracks(), vec!["t1", "t2"]);
}

#[tokio::test]
async fn repeated_requests_converge_to_a_single_copy() {
    let h = connected().await;
    let requests = [request("One", Some("t1")), request("One again", Some("t1"))];

    let first = h.synchronizer().add_approved(&requests).await.unwrap();
    assert_eq!(first.added_count, 1);
    assert!(first.notes.iter().any(|n| n.contains("more than once")));

    let second = h.synchronizer().add_approved(&requests).await.unwrap();
    assert_eq!(second.added_count, 0);
    assert!(second.is_clean());
    assert!(
        second
            .notes
            .contains(&"All requested tracks are already in the playlist".to_string())
    );

    assert_eq!(h.tracks(), vec!["t1"]);
}

#[tokio::test]
async fn requests_without_track_id_are_noted_not_added() {
    let h = connected().await;

    let result = h
        .synchronizer()
        .add_approved(&[
            request("Mystery", None),
            request("Link", Some("https://open.spotify.com/track/t9?si=abc")),
        ])
        .await
        .unwrap();

    assert_eq!(result.added_count, 1);
    assert!(result.notes.iter().any(|n| n.contains("Mystery")));
    assert_eq!(h.tracks(), vec!["t9"]);
}

#[tokio::test]
async fn existing_tracks_are_read_across_pages() {
    let h = connected().await;
    h.set_tracks(&["a", "b", "c", "d", "e"]);
    h.fake.lock().unwrap().page_cap = 2;

    let result = h
        .synchronizer()
        .add_approved(&[request("Late page", Some("e")), request("New", Some("f"))])
        .await
        .unwrap();

    assert_eq!(result.added_count, 1);
    assert_eq!(h.tracks(), vec!["a", "b", "c", "d", "e", "f"]);
    assert_eq!(h.fake.lock().unwrap().bearer_tokens.len(), 3);
}

#[tokio::test]
async fn large_syncs_are_batched_and_a_failed_batch_does_not_stop_the_rest() {
    let h = connected().await;
    h.fake.lock().unwrap().failing_adds = 1;

    let ids: Vec<String> = (0..150).map(|i| format!("n{}", i)).collect();
    let requests: Vec<_> = ids.iter().map(|id| request(id, Some(id.as_str()))).collect();

    let result = h.synchronizer().add_approved(&requests).await.unwrap();

    assert_eq!(result.added_count, 50);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Batch 1/2 (100 tracks) failed"));
    assert_eq!(h.fake.lock().unwrap().add_batches, vec![50]);
    assert_eq!(h.tracks().first().map(String::as_str), Some("n100"));
}

#[tokio::test]
async fn rate_limited_reads_are_retried() {
    let h = connected().await;
    h.set_tracks(&["t1"]);
    h.fake.lock().unwrap().rate_limited_reads = 1;

    let result = h
        .synchronizer()
        .add_approved(&[request("Two", Some("t2"))])
        .await
        .unwrap();

    assert_eq!(result.added_count, 1);
    assert!(result.errors.is_empty());
    assert_eq!(h.fake.lock().unwrap().bearer_tokens.len(), 2);
}

#[tokio::test]
async fn unreadable_playlist_adds_nothing() {
    let h = connected().await;
    let sync = PlaylistSynchronizer::new(Arc::clone(&h.client), "missing");

    let result = sync
        .add_approved(&[request("One", Some("t1"))])
        .await
        .unwrap();

    assert_eq!(result.added_count, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(h.fake.lock().unwrap().add_batches.is_empty());
}

#[tokio::test]
async fn missing_token_is_returned_as_unauthenticated() {
    let h = Harness::start().await;

    let err = h
        .synchronizer()
        .add_approved(&[request("One", Some("t1"))])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));

    let err = h
        .synchronizer()
        .remove_tracks(&["t1".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
}

#[tokio::test]
async fn removal_deletes_every_occurrence_highest_position_first() {
    let h = connected().await;
    h.set_tracks(&["a", "b", "x", "c", "d", "x"]);

    let result = h
        .synchronizer()
        .remove_tracks(&["x".to_string()])
        .await
        .unwrap();

    assert_eq!(result.removed_count, 2);
    assert!(result.is_clean());
    assert_eq!(h.tracks(), vec!["a", "b", "c", "d"]);

    let calls = h.fake.lock().unwrap().delete_calls.clone();
    assert_eq!(
        calls,
        vec![
            ("spotify:track:x".to_string(), vec![5]),
            ("spotify:track:x".to_string(), vec![2]),
        ]
    );
}

#[tokio::test]
async fn removal_of_several_ids_keeps_positions_valid() {
    let h = connected().await;
    h.set_tracks(&["a", "x", "b", "x", "keep"]);

    let result = h
        .synchronizer()
        .remove_tracks(&[
            "spotify:track:x".to_string(),
            "https://open.spotify.com/track/b".to_string(),
            "a".to_string(),
        ])
        .await
        .unwrap();

    assert_eq!(result.removed_count, 4);
    assert!(result.errors.is_empty());
    assert_eq!(h.tracks(), vec!["keep"]);

    let positions: Vec<usize> = h
        .fake
        .lock()
        .unwrap()
        .delete_calls
        .iter()
        .flat_map(|(_, p)| p.clone())
        .collect();
    assert_eq!(positions, vec![3, 2, 1, 0]);
}

#[tokio::test]
async fn removing_an_absent_track_is_a_noop_with_a_note() {
    let h = connected().await;
    h.set_tracks(&["a"]);

    let result = h
        .synchronizer()
        .remove_tracks(&["zzz".to_string()])
        .await
        .unwrap();

    assert_eq!(result.removed_count, 0);
    assert!(result.errors.is_empty());
    assert_eq!(
        result.notes,
        vec!["zzz is not in the playlist, nothing to remove".to_string()]
    );
    assert!(h.fake.lock().unwrap().delete_calls.is_empty());
    assert_eq!(h.tracks(), vec!["a"]);
}

#[tokio::test]
async fn a_failed_position_is_reported_and_the_rest_continue() {
    let h = connected().await;
    h.set_tracks(&["x", "a", "x"]);
    h.fake.lock().unwrap().failing_positions.insert(2);

    let result = h
        .synchronizer()
        .remove_tracks(&["x".to_string()])
        .await
        .unwrap();

    assert_eq!(result.removed_count, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("position 2"));
    assert_eq!(h.tracks(), vec!["a", "x"]);
}

#[tokio::test]
async fn synchronizer_follows_the_locked_playlist() {
    let h = connected().await;

    let err = PlaylistSynchronizer::for_selected(Arc::clone(&h.client), &h.selector)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::NoPlaylistSelected));

    h.selector
        .choose_playlist(&PlaylistSummary {
            id: PLAYLIST_ID.to_string(),
            name: "Wedding Party".to_string(),
            track_count: 0,
        })
        .await
        .unwrap();

    let sync = PlaylistSynchronizer::for_selected(Arc::clone(&h.client), &h.selector)
        .await
        .unwrap();
    assert_eq!(sync.playlist_id(), PLAYLIST_ID);
}

#[tokio::test]
async fn losing_the_token_mid_sync_keeps_earlier_batch_errors() {
    let h = connected().await;
    {
        let mut fake = h.fake.lock().unwrap();
        fake.failing_adds = 1;
        fake.revoke_on_failed_add = Some(h.token_store());
    }

    let ids: Vec<String> = (0..250).map(|i| format!("n{}", i)).collect();
    let requests: Vec<_> = ids.iter().map(|id| request(id, Some(id.as_str()))).collect();

    let result = h.synchronizer().add_approved(&requests).await.unwrap();

    assert_eq!(result.added_count, 0);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].starts_with("Batch 1/3 (100 tracks) failed"));
    assert!(result.errors[1].starts_with("Batch 2/3 (100 tracks) failed"));
    assert!(h.tracks().is_empty());
}
