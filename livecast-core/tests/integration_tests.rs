//! Integration tests for livecast-core engines
//!
//! These verify end-to-end behavior across service boundaries: credential
//! lifecycles, chat timing rules, reaction bursts, recording
//! reconciliation with the encoder and the persistence projection, and
//! viewer accounting.
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livecast_core::config::{AnalyticsConfig, VodConfig};
use livecast_core::models::{ChatMessageKind, ChatRoomSettings, Identity, ReactionType, RoomId};
use livecast_core::repository::{self, RecordingStore};
use livecast_core::service::egress::{EgressClient, EgressInfo, FileOutput};
use livecast_core::service::{AnalyticsEngine, ChatEngine, ContentFilter, VodCoordinator};
use livecast_core::Error;

struct NullEgress;

#[async_trait]
impl EgressClient for NullEgress {
    async fn start_room_composite(
        &self,
        room_name: &RoomId,
        _layout: &str,
        _outputs: &[FileOutput],
    ) -> livecast_core::Result<EgressInfo> {
        Ok(EgressInfo {
            egress_id: format!("eg-{room_name}"),
        })
    }

    async fn stop(&self, _egress_id: &str) -> livecast_core::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_chat_slow_mode_round_trip() {
    let chat = ChatEngine::new(ContentFilter::new(), 64);
    let room = RoomId::from("r2");
    chat.create_room(
        room.clone(),
        Some(ChatRoomSettings {
            slow_mode_delay_secs: 1,
            ..Default::default()
        }),
    )
    .unwrap();

    let bob = Identity::from("bob");
    chat.send(
        &room,
        bob.clone(),
        "hi".to_string(),
        ChatMessageKind::Text,
        vec![],
        None,
    )
    .unwrap();

    // An immediate second send trips slow mode
    let err = chat
        .send(
            &room,
            bob.clone(),
            "again".to_string(),
            ChatMessageKind::Text,
            vec![],
            None,
        )
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited(_)));

    // After the delay elapses, the next send goes through
    tokio::time::sleep(Duration::from_millis(1100)).await;
    chat.send(
        &room,
        bob,
        "later".to_string(),
        ChatMessageKind::Text,
        vec![],
        None,
    )
    .unwrap();
}

#[tokio::test]
async fn test_chat_rate_limit_round_trip() {
    let chat = ChatEngine::new(ContentFilter::new(), 64);
    let room = RoomId::from("r1");
    chat.create_room(
        room.clone(),
        Some(ChatRoomSettings {
            max_messages_per_min: 5,
            ..Default::default()
        }),
    )
    .unwrap();

    let bob = Identity::from("bob");
    for i in 0..5 {
        chat.send(
            &room,
            bob.clone(),
            format!("m{i}"),
            ChatMessageKind::Text,
            vec![],
            None,
        )
        .unwrap();
    }
    assert!(matches!(
        chat.send(
            &room,
            bob,
            "over".to_string(),
            ChatMessageKind::Text,
            vec![],
            None
        ),
        Err(Error::RateLimited(_))
    ));
}

#[tokio::test]
async fn test_vod_lifecycle_projects_to_store() {
    let db_path = std::env::temp_dir().join(format!(
        "livecast-test-{}.db",
        livecast_core::models::generate_id()
    ));
    let db_path_str = db_path.to_str().unwrap().to_string();

    let pool = repository::connect("", &db_path_str)
        .await
        .expect("sqlite fallback should open");
    let store = Arc::new(RecordingStore::new(pool));

    let coordinator = Arc::new(VodCoordinator::new(
        Arc::new(NullEgress),
        Some(Arc::clone(&store)),
        VodConfig {
            processing_delay_secs: 0,
            ..VodConfig::default()
        },
    ));

    let (recording, egress_id) = coordinator
        .start(
            RoomId::from("r1"),
            Identity::from("alice"),
            "Alice".to_string(),
            "My stream".to_string(),
        )
        .await
        .unwrap();
    assert!(!egress_id.is_empty());

    coordinator
        .stop(&recording.id, Some(&egress_id), 90.0, 2048)
        .unwrap();

    // Wait for post-processing, then for the projection to catch up
    let mut row = None;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Ok(Some(r)) = store.get(&recording.id).await {
            if r.status == "ready" {
                row = Some(r);
                break;
            }
        }
    }

    let row = row.expect("projection should reach ready");
    assert_eq!(row.room_name, "r1");
    assert_eq!(row.streamer_id, "alice");
    assert!(row.video_path.ends_with(".mp4"));
    assert!((row.duration - 90.0).abs() < f64::EPSILON);
    assert_eq!(row.file_size, 2048);

    let listed = store.list(10).await.unwrap();
    assert_eq!(listed.len(), 1);

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_analytics_tracks_chat_engine_activity() {
    let chat = ChatEngine::new(ContentFilter::new(), 64);
    let analytics = Arc::new(AnalyticsEngine::new(AnalyticsConfig::default()));
    let room = RoomId::from("r1");

    chat.create_room(room.clone(), None).unwrap();
    analytics
        .start(room.clone(), Identity::from("streamer"))
        .unwrap();

    analytics
        .viewer_join(
            &room,
            Identity::from("bob"),
            "web".to_string(),
            "desktop".to_string(),
            String::new(),
            String::new(),
        )
        .unwrap();

    // The dispatch layer forwards each accepted chat message to analytics
    for i in 0..3 {
        chat.send(
            &room,
            Identity::from("bob"),
            format!("m{i}"),
            ChatMessageKind::Text,
            vec![],
            None,
        )
        .unwrap();
        analytics.chat_message(&room, &Identity::from("bob")).unwrap();
    }

    analytics
        .reaction(&room, &Identity::from("bob"), ReactionType::Clap)
        .unwrap();

    let snapshot = analytics.snapshot(&room).unwrap();
    assert_eq!(snapshot.total_messages, 3);
    assert_eq!(snapshot.total_reactions, 1);
    assert_eq!(snapshot.unique_messagers, 1);

    let finalized = analytics.stop(&room).unwrap();
    assert!(finalized.end_time.is_some());
    assert!(finalized.current_viewers <= finalized.peak_viewers);
    assert!(finalized.total_viewers >= finalized.unique_viewers);
}
