mod common;

use std::time::Duration;

use alerting::AlertKind;
use camera_capture::CameraError;
use common::{test_config, Harness, BLUE, GREEN, RED};
use model_store::FsDocumentStore;
use object_detection::DetectedObject;
use posture::Label;
use session::{SessionConfig, SessionError, SessionState};
use tokio::time::sleep;

fn phone() -> DetectedObject {
    DetectedObject::new("cell phone", 0.91, [10.0, 10.0, 40.0, 80.0])
}

#[tokio::test(start_paused = true)]
async fn test_start_without_dataset_is_not_ready() {
    let h = Harness::new(test_config());
    h.show(RED);

    assert_eq!(h.session.start_test(1), Err(SessionError::NotReady));
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(!h.session.samplers_running());
    assert_eq!(h.player.play_count(AlertKind::TestStarted), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_duration_rejected() {
    let h = Harness::new(test_config());
    h.train_all().await;

    assert_eq!(h.session.start_test(0), Err(SessionError::InvalidDuration));
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_training_reports_progress_then_ready() {
    let h = Harness::new(test_config());
    h.show(RED);

    let session = h.session.clone();
    let training = tokio::spawn(async move { session.train(Label::NormalPosture).await });

    sleep(Duration::from_millis(25)).await;
    match h.session.state() {
        SessionState::Training { label, progress } => {
            assert_eq!(label, Label::NormalPosture);
            assert!(progress > 0 && progress < 5, "progress {}", progress);
        }
        other => panic!("expected training, got {:?}", other),
    }

    // absent is still missing
    assert_eq!(training.await.unwrap(), Ok(SessionState::Idle));
    assert_eq!(h.classifier.dataset().unwrap().example_count(Label::NormalPosture), 5);

    h.show(BLUE);
    assert_eq!(h.session.train(Label::Absent).await, Ok(SessionState::Ready));
    assert_eq!(h.session.snapshot().trained_labels, vec![Label::NormalPosture, Label::Absent]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_training() {
    let h = Harness::new(test_config());
    h.show(RED);

    let session = h.session.clone();
    let training = tokio::spawn(async move { session.train(Label::NormalPosture).await });

    sleep(Duration::from_millis(15)).await;
    h.session.reset();

    assert_eq!(training.await.unwrap(), Err(SessionError::Cancelled(Label::NormalPosture)));
    assert_eq!(h.session.state(), SessionState::Idle);
    // examples captured before the reset are kept
    let kept = h.classifier.dataset().unwrap().example_count(Label::NormalPosture);
    assert!(kept > 0 && kept < 5);
}

#[tokio::test(start_paused = true)]
async fn test_train_rejected_while_testing() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.session.start_test(1).unwrap();

    assert_eq!(
        h.session.train(Label::HeadRight).await,
        Err(SessionError::InvalidTransition {
            command: "train",
            state: "testing"
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_full_test_plays_start_and_end_once() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(RED);

    let id = h.session.start_test(1).unwrap();
    assert_eq!(h.session.state(), SessionState::Testing { remaining_seconds: 60 });
    assert_eq!(h.session.snapshot().session_id, Some(id));
    assert!(h.session.samplers_running());

    sleep(Duration::from_millis(30_500)).await;
    assert_eq!(h.session.state(), SessionState::Testing { remaining_seconds: 30 });

    sleep(Duration::from_secs(31)).await;
    assert_eq!(h.session.state(), SessionState::Finished);
    assert!(!h.session.samplers_running());
    assert_eq!(h.player.play_count(AlertKind::TestStarted), 1);
    assert_eq!(h.player.play_count(AlertKind::TestEnded), 1);

    // nothing keeps counting once finished
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.session.state(), SessionState::Finished);
    assert_eq!(h.player.play_count(AlertKind::TestEnded), 1);
}

#[tokio::test(start_paused = true)]
async fn test_head_turn_during_test_alerts() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(GREEN);

    h.session.start_test(5).unwrap();
    sleep(Duration::from_millis(300)).await;

    assert_eq!(h.player.play_count(AlertKind::NoCheatingAllowed), 1);
    assert_eq!(h.session.cooldown(AlertKind::NoCheatingAllowed).fire_count, 1);
    assert_eq!(h.session.display().current_behavior, Some(Label::HeadLeft));
}

#[tokio::test(start_paused = true)]
async fn test_preview_never_alerts() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(GREEN);
    h.detector.set_objects(vec![phone()]);

    h.session.set_preview(true).unwrap();
    sleep(Duration::from_secs(2)).await;

    assert_eq!(h.player.play_count(AlertKind::NoCheatingAllowed), 0);
    assert_eq!(h.player.play_count(AlertKind::PhoneDetected), 0);
    let display = h.session.display();
    assert_eq!(display.current_behavior, Some(Label::HeadLeft));
    assert_eq!(display.detections.len(), 1);
    assert!(!h.surface.behaviors.lock().unwrap().is_empty());

    h.session.set_preview(false).unwrap();
    assert!(!h.session.samplers_running());
}

#[tokio::test(start_paused = true)]
async fn test_reset_stops_alerts() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(GREEN);

    h.session.start_test(5).unwrap();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(h.player.play_count(AlertKind::NoCheatingAllowed), 1);

    h.session.reset();
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(!h.session.samplers_running());
    assert_eq!(h.session.cooldown(AlertKind::NoCheatingAllowed), Default::default());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.player.play_count(AlertKind::NoCheatingAllowed), 1);
    assert_eq!(h.player.play_count(AlertKind::TestEnded), 0);
    assert_eq!(h.session.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_late_detection_after_reset_discarded() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(RED);
    h.detector.set_objects(vec![phone()]);
    h.detector.set_delay(Duration::from_millis(400));

    h.session.start_test(5).unwrap();
    // first detection tick starts at 500ms and resolves at 900ms
    sleep(Duration::from_millis(600)).await;
    h.session.reset();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(h.player.play_count(AlertKind::PhoneDetected), 0);
    assert_eq!(h.session.cooldown(AlertKind::PhoneDetected), Default::default());
}

#[tokio::test(start_paused = true)]
async fn test_late_detection_leaves_display_untouched() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(RED);
    h.detector.set_objects(vec![phone()]);
    h.detector.set_delay(Duration::from_millis(400));

    h.session.start_test(5).unwrap();
    sleep(Duration::from_millis(600)).await;
    h.session.reset();
    sleep(Duration::from_secs(1)).await;

    let display = h.session.display();
    assert!(display.detections.is_empty());
    assert_eq!(display.frame_size, None);
    assert_eq!(*h.surface.frames_drawn.lock().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_ready_keeps_dataset() {
    let h = Harness::new(test_config());
    h.train_all().await;
    assert_eq!(h.session.state(), SessionState::Ready);

    h.session.reset();
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.classifier.has_dataset());

    h.show(RED);
    assert!(h.session.start_test(1).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_finished() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(RED);

    h.session.start_test(1).unwrap();
    sleep(Duration::from_secs(61)).await;
    assert_eq!(h.session.state(), SessionState::Finished);

    h.session.reset();
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.session.start_test(1).is_ok());
    assert_eq!(h.player.play_count(AlertKind::TestStarted), 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_announces_each_start() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(RED);

    h.session.start_test(5).unwrap();
    h.session.reset();
    // the first cue is still playing
    h.session.start_test(5).unwrap();

    assert_eq!(h.player.play_count(AlertKind::TestStarted), 2);
    assert_eq!(h.session.cooldown(AlertKind::TestStarted).fire_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_frame_skips_sampling() {
    let h = Harness::new(test_config());
    let state = h
        .session
        .restore_dataset(br#"{"normal_posture": [[1.0, 0.0, 0.0]], "absent": [[0.0, 0.0, 1.0]]}"#);
    assert_eq!(state, Ok(SessionState::Ready));

    h.session.start_test(1).unwrap();
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.session.state(), SessionState::Testing { remaining_seconds: 58 });

    let display = h.session.display();
    assert_eq!(display.last_posture, None);
    assert!(display.detections.is_empty());
    assert_eq!(display.updated_at, None);
    assert_eq!(*h.surface.frames_drawn.lock().unwrap(), 0);

    sleep(Duration::from_secs(58)).await;
    assert_eq!(h.session.state(), SessionState::Finished);
}

#[tokio::test(start_paused = true)]
async fn test_phone_alert_debounced_while_cue_plays() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(RED);
    h.detector.set_objects(vec![phone()]);

    h.session.start_test(5).unwrap();
    sleep(Duration::from_millis(2100)).await;

    assert_eq!(h.player.play_count(AlertKind::PhoneDetected), 1);
    let cooldown = h.session.cooldown(AlertKind::PhoneDetected);
    assert_eq!(cooldown.fire_count, 1);
    assert!(cooldown.suppressed_count >= 2);

    // the 3s cue is over before the detection at 4s
    sleep(Duration::from_millis(2000)).await;
    assert_eq!(h.player.play_count(AlertKind::PhoneDetected), 2);
}

#[tokio::test(start_paused = true)]
async fn test_inference_failure_keeps_countdown() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.show(GREEN);
    h.embedding.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    h.detector.fail.store(true, std::sync::atomic::Ordering::SeqCst);

    h.session.start_test(1).unwrap();
    sleep(Duration::from_secs(61)).await;

    assert_eq!(h.session.state(), SessionState::Finished);
    assert_eq!(h.player.play_count(AlertKind::TestEnded), 1);
    assert_eq!(h.player.play_count(AlertKind::NoCheatingAllowed), 0);
}

#[tokio::test(start_paused = true)]
async fn test_camera_unavailable() {
    let h = Harness::new(test_config());
    h.train_all().await;
    h.video.disconnect();

    assert!(matches!(
        h.session.start_test(1),
        Err(SessionError::CameraUnavailable(CameraError::Unavailable(_)))
    ));
    assert!(matches!(
        h.session.train(Label::HeadRight).await,
        Err(SessionError::CameraUnavailable(_))
    ));
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_survives_save_and_load() {
    let config = SessionConfig {
        training_examples: 50,
        ..test_config()
    };
    let h = Harness::new(config);
    h.train(Label::NormalPosture, RED).await;
    h.train(Label::Absent, BLUE).await;

    let dir = std::env::temp_dir().join(format!("proctor-session-{}", uuid::Uuid::new_v4()));
    let store = FsDocumentStore::new(&dir);
    let path = h.session.save_dataset_to(&store, "dataset.json").unwrap();

    h.classifier.clear().unwrap();
    assert!(!h.classifier.has_dataset());

    assert_eq!(h.session.load_dataset_from(&store, &path), Ok(SessionState::Ready));
    let dataset = h.classifier.dataset().unwrap();
    assert_eq!(dataset.example_count(Label::NormalPosture), 50);
    assert_eq!(dataset.example_count(Label::Absent), 50);

    let top = h.classifier.predict_embedding(&[0.05, 0.0, 0.9]).unwrap().top();
    assert_eq!(top.label, Label::Absent);
    assert!(top.confidence > 0.8);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_dataset_leaves_active_dataset() {
    let h = Harness::new(test_config());
    h.train_all().await;
    let before = h.classifier.dataset().unwrap();

    let result = h.session.restore_dataset(br#"{"normal_posture": [[1.0, 2.0], [3.0]]}"#);
    assert!(matches!(result, Err(SessionError::MalformedDataset(_))));

    let result = h.session.restore_dataset(b"{}");
    assert_eq!(result, Err(SessionError::EmptyDataset));

    assert_eq!(h.classifier.dataset().unwrap(), before);
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_for_other_embedder_rejected() {
    let h = Harness::new(test_config());
    h.train_all().await;
    let before = h.classifier.dataset().unwrap();

    let result = h
        .session
        .restore_dataset(br#"{"normal_posture": [[1.0, 0.0]], "absent": [[0.0, 1.0]]}"#);
    assert!(matches!(result, Err(SessionError::MalformedDataset(_))));

    assert_eq!(h.classifier.dataset().unwrap(), before);
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_export_empty_dataset() {
    let h = Harness::new(test_config());
    assert_eq!(h.session.export_dataset(), Err(SessionError::EmptyDataset));
}

#[tokio::test(start_paused = true)]
async fn test_restore_partial_dataset_is_idle() {
    let h = Harness::new(test_config());
    let state = h.session.restore_dataset(br#"{"normal_posture": [[1.0, 0.0, 0.0]]}"#);

    assert_eq!(state, Ok(SessionState::Idle));
    // a partial dataset is still enough to start
    h.show(RED);
    assert!(h.session.start_test(1).is_ok());
}
